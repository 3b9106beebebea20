use thiserror::Error;

/// Errors raised by the arena allocator and by object-tree construction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ObjectError {
    /// The arena has no room left for the requested allocation. The arena's
    /// state is left unchanged — no partial commit.
    #[error("arena out of memory")]
    OutOfMemory,
    /// An object tree (as built or as parsed) exceeded the maximum nesting
    /// depth of 15.
    #[error("object nesting exceeds maximum depth")]
    Nesting,
}
