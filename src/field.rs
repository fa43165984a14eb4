//! A field: one OS-obtained slab wrapping a bump frontier.
//!
//! The field header lives in-band at the front of its own slab (an intrusive
//! singly-linked list), so the arena never needs a side table of field
//! handles — it only ever holds a pointer to the head.

use core::ptr::NonNull;

use crate::error::ArenaError;
use crate::slab_source::SlabSource;

/// In-band header for one field. `base` (the start of the usable region) is
/// implicit: it is always the address right after this header.
#[repr(C)]
pub struct FieldHeader {
    /// Usable byte count, not counting this header.
    pub size: usize,
    /// Current bump cursor, an absolute address in `[base, base + size]`.
    pub top: usize,
    /// Older field in the stack, or `None` for the bottom of the stack.
    pub next: Option<NonNull<FieldHeader>>,
}

impl FieldHeader {
    /// Acquires a slab of `usable_len + size_of::<FieldHeader>()` bytes from
    /// `source`, writes the header in-band, and returns it with an empty
    /// cursor (`top == base`) and no successor.
    pub fn new<S: SlabSource>(source: &S, usable_len: usize) -> Result<NonNull<FieldHeader>, ArenaError> {
        let header_len = core::mem::size_of::<FieldHeader>();
        let total_len = header_len
            .checked_add(usable_len)
            .ok_or(ArenaError::InvalidArgument {
                reason: "requested field size overflows usize",
            })?;

        let region = source.acquire(total_len)?;
        let header_ptr = region.as_ptr() as *mut FieldHeader;
        let base = unsafe { region.as_ptr().add(header_len) } as usize;

        unsafe {
            header_ptr.write(FieldHeader {
                size: usable_len,
                top: base,
                next: None,
            });
            Ok(NonNull::new_unchecked(header_ptr))
        }
    }

    /// The address of the first usable byte, right after this header.
    #[inline]
    pub fn base(&self) -> usize {
        self as *const FieldHeader as usize + core::mem::size_of::<FieldHeader>()
    }

    /// One past the last usable byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.base() + self.size
    }

    /// Releases this field's whole slab (header + usable bytes) back to
    /// `source`.
    ///
    /// # Safety
    /// `field` must have been produced by [`FieldHeader::new`] on `source`
    /// and must not be used again afterward.
    pub unsafe fn destroy<S: SlabSource>(field: NonNull<FieldHeader>, source: &S) {
        let total_len = core::mem::size_of::<FieldHeader>() + field.as_ref().size;
        let region = NonNull::new_unchecked(field.as_ptr() as *mut u8);
        source.release(region, total_len);
    }
}
