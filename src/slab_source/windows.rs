#![cfg(windows)]

use core::ptr::NonNull;

use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

use crate::error::ArenaError;

/// Reserves and commits `len` bytes of zero-filled memory.
pub(super) fn map(len: usize) -> Result<NonNull<u8>, ArenaError> {
    let ptr = unsafe {
        VirtualAlloc(
            core::ptr::null_mut(),
            len,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };

    if ptr.is_null() {
        Err(ArenaError::OutOfMemory)
    } else {
        Ok(unsafe { NonNull::new_unchecked(ptr as *mut u8) })
    }
}

/// Releases a region previously obtained from [`map`].
///
/// # Safety
/// `ptr` must be the base of a region returned by a prior call to `map`.
/// `VirtualFree(MEM_RELEASE)` always frees the whole reservation, so `len`
/// is accepted only to match the `unix` module's signature.
pub(super) unsafe fn unmap(ptr: NonNull<u8>, _len: usize) {
    VirtualFree(ptr.as_ptr() as *mut _, 0, MEM_RELEASE);
}
