//! Process-lifetime component identity: binds connecting PIDs to component
//! names, issues opaque SVCUID tokens, and validates them on later calls.

mod auth;
mod error;
mod registry;
mod svcuid;

pub use auth::{AllowAll, NameResolver, PeerCredentials, ProcessContext};
pub use error::AuthError;
pub use registry::{ComponentRegistry, DEFAULT_CAPACITY, UNAUTHENTICATED};
pub use svcuid::{EntropySource, Svcuid};
