#![cfg(unix)]

use core::ptr::NonNull;

use libc::{mmap, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use crate::error::ArenaError;

/// Reserves and commits `len` bytes of anonymous, zero-filled memory.
pub(super) fn map(len: usize) -> Result<NonNull<u8>, ArenaError> {
    let ptr = unsafe {
        mmap(
            core::ptr::null_mut(),
            len,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if ptr == MAP_FAILED {
        Err(ArenaError::OutOfMemory)
    } else {
        Ok(unsafe { NonNull::new_unchecked(ptr as *mut u8) })
    }
}

/// Releases a region previously obtained from [`map`].
///
/// # Safety
/// `ptr`/`len` must describe a region returned by a prior call to `map`.
pub(super) unsafe fn unmap(ptr: NonNull<u8>, len: usize) {
    munmap(ptr.as_ptr() as *mut libc::c_void, len);
}
