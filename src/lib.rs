//! A region-based ("arena") allocator.
//!
//! An [`Arena`] hands out bump-allocated memory from a chain of slabs
//! ("fields") obtained from an OS memory provider, reusing freed blocks
//! through a segregated free-list index before ever touching the bump
//! cursor. Fields grow by doubling, so a long-lived arena needs only a
//! handful of OS allocations regardless of how many individual `alloc`
//! calls it serves.
//!
//! ```
//! use field_arena::Arena;
//!
//! let mut arena = Arena::new();
//! let ptr = arena.alloc(64, 8).expect("allocation failed");
//! unsafe {
//!     ptr.as_ptr().write_bytes(0, 64);
//!     arena.free(Some(ptr));
//! }
//! ```
//!
//! # Concurrency
//! `Arena` is single-threaded by design: it is not `Send` or `Sync`, has no
//! internal locking, and two threads must never share one arena. Separate
//! arenas on separate threads are fine, since each is a self-contained
//! value with no shared state.

mod error;
mod field;
mod free_list;
mod header;
mod poison;
mod size_class;
mod slab_source;
mod util;

pub mod arena;

pub use arena::{Arena, ArenaStats};
pub use error::ArenaError;
pub use slab_source::{BoxSlabSource, SlabSource, SystemSlabSource};
