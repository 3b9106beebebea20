use gg_object::ObjectError;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EventStreamError {
    #[error("prelude checksum mismatch")]
    BadPrelude,
    #[error("message truncated")]
    Truncated,
    #[error("message checksum mismatch")]
    BadChecksum,
    #[error("malformed header")]
    BadHeader,
    #[error("destination buffer too small")]
    NoSpace,
    #[error("object nesting exceeds maximum depth")]
    Nesting,
    #[error("arena out of memory")]
    OutOfMemory,
}

impl From<ObjectError> for EventStreamError {
    fn from(e: ObjectError) -> Self {
        match e {
            ObjectError::OutOfMemory => EventStreamError::OutOfMemory,
            ObjectError::Nesting => EventStreamError::Nesting,
        }
    }
}
