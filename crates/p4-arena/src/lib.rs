//! Memory foundation for the P4 front end: a page-backed arena
//! allocator over a single virtual reservation, and the segmented
//! vector used for token streams and the type table.
//!
//! Everything the compiler allocates lives until the owning arena is
//! freed; nothing is released individually.

mod arena;
mod segvec;

pub use arena::{Arena, MemoryPool, PageBlock};
pub use segvec::SegVec;
