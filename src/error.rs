use thiserror::Error;

/// Errors produced by the arena's public surface.
///
/// This replaces the source allocator's null-pointer-sentinel convention:
/// every fallible operation returns a `Result` instead of a raw pointer that
/// may or may not be null.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArenaError {
    /// A precondition on `alloc`/`set_min_field_size` was violated. No side
    /// effects occur before this is returned.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },

    /// The slab source refused to hand back a new region. If the arena had
    /// already served at least one allocation, its fields have been released
    /// and it is left empty (see the fail-closed policy in `Arena::alloc`).
    #[error("slab source is out of memory")]
    OutOfMemory,
}
