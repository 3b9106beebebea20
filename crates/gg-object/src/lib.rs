//! Self-describing value tree and bump allocator shared by every core-bus
//! crate. No process-wide default allocator lives here — every operation
//! that can allocate takes an `&Arena` explicitly.

mod arena;
mod buffer;
mod error;
mod map;
mod object;

pub use arena::Arena;
pub use buffer::{buffer_equals, Buffer};
pub use error::ObjectError;
pub use map::map_get;
pub use object::{Object, MAX_DEPTH};
