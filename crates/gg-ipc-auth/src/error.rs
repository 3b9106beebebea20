use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("component table is full")]
    CapacityExceeded,
    #[error("component name exceeds 128 bytes")]
    NameTooLong,
    #[error("svcuid not recognised")]
    NotAuthenticated,
    #[error("peer is not authorised to claim this name")]
    NameNotAuthorised,
    #[error("could not read system entropy source")]
    EntropyUnavailable,
}
