//! The wire-visible error taxonomy (spec'd error kinds) plus the internal
//! error type every fallible operation in this crate returns.

use gg_eventstream::EventStreamError;
use gg_ipc_auth::AuthError;
use gg_object::ObjectError;
use thiserror::Error;

/// The taxonomy carried on the wire in a `:error-code` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoMemory,
    MethodNotFound,
    InvalidArg,
    BadPrelude,
    BadHeader,
    BadChecksum,
    Truncated,
    NotAuthenticated,
    CapacityExceeded,
    Timeout,
    IoError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoMemory => "NoMemory",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::InvalidArg => "InvalidArg",
            ErrorKind::BadPrelude => "BadPrelude",
            ErrorKind::BadHeader => "BadHeader",
            ErrorKind::BadChecksum => "BadChecksum",
            ErrorKind::Truncated => "Truncated",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::CapacityExceeded => "CapacityExceeded",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::IoError => "IoError",
            ErrorKind::Internal => "Internal",
        }
    }

    /// Inverse of `as_str`, used by the client to reconstruct a kind from a
    /// received `:error-code` header. An unrecognised code (a future server
    /// version's new kind, say) maps to `Internal` rather than failing to
    /// parse the frame at all.
    pub fn parse(s: &str) -> ErrorKind {
        match s {
            "NoMemory" => ErrorKind::NoMemory,
            "MethodNotFound" => ErrorKind::MethodNotFound,
            "InvalidArg" => ErrorKind::InvalidArg,
            "BadPrelude" => ErrorKind::BadPrelude,
            "BadHeader" => ErrorKind::BadHeader,
            "BadChecksum" => ErrorKind::BadChecksum,
            "Truncated" => ErrorKind::Truncated,
            "NotAuthenticated" => ErrorKind::NotAuthenticated,
            "CapacityExceeded" => ErrorKind::CapacityExceeded,
            "Timeout" => ErrorKind::Timeout,
            "IoError" => ErrorKind::IoError,
            _ => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreBusError {
    #[error("framing error: {0}")]
    Framing(#[from] EventStreamError),
    #[error("frame exceeds the configured maximum size")]
    OversizeFrame,
    #[error("request payload did not decode as a map")]
    MalformedRequest,
    #[error("no method registered with that name")]
    MethodNotFound,
    #[error("send or receive deadline passed")]
    Timeout,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("peer is not authenticated")]
    NotAuthenticated,
    #[error("component table is full")]
    CapacityExceeded,
    #[error("handler invariant violated: {0}")]
    Internal(String),
    #[error("remote error {0:?}: {1}")]
    Remote(ErrorKind, String),
    #[error("object allocation failed: {0}")]
    Allocation(#[from] ObjectError),
}

impl From<AuthError> for CoreBusError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotAuthenticated => CoreBusError::NotAuthenticated,
            AuthError::CapacityExceeded => CoreBusError::CapacityExceeded,
            AuthError::NameTooLong | AuthError::NameNotAuthorised => {
                CoreBusError::NotAuthenticated
            }
            AuthError::EntropyUnavailable => CoreBusError::Internal(e.to_string()),
        }
    }
}

impl CoreBusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreBusError::Framing(e) => match e {
                EventStreamError::BadPrelude => ErrorKind::BadPrelude,
                EventStreamError::Truncated => ErrorKind::Truncated,
                EventStreamError::BadChecksum => ErrorKind::BadChecksum,
                EventStreamError::BadHeader => ErrorKind::BadHeader,
                EventStreamError::NoSpace => ErrorKind::InvalidArg,
                EventStreamError::Nesting | EventStreamError::OutOfMemory => ErrorKind::NoMemory,
            },
            CoreBusError::OversizeFrame => ErrorKind::Truncated,
            CoreBusError::MalformedRequest => ErrorKind::InvalidArg,
            CoreBusError::MethodNotFound => ErrorKind::MethodNotFound,
            CoreBusError::Timeout => ErrorKind::Timeout,
            CoreBusError::Io(_) => ErrorKind::IoError,
            CoreBusError::NotAuthenticated => ErrorKind::NotAuthenticated,
            CoreBusError::CapacityExceeded => ErrorKind::CapacityExceeded,
            CoreBusError::Internal(_) => ErrorKind::Internal,
            CoreBusError::Remote(kind, _) => *kind,
            CoreBusError::Allocation(e) => match e {
                ObjectError::OutOfMemory => ErrorKind::NoMemory,
                ObjectError::Nesting => ErrorKind::InvalidArg,
            },
        }
    }
}
