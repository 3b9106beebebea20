//! Ties the entropy source and the component registry into a single
//! process-context value, and defines the name-authorisation hook.

use crate::error::AuthError;
use crate::registry::ComponentRegistry;
use crate::svcuid::{EntropySource, Svcuid};
use std::sync::Mutex;

/// Credentials read from the peer side of a Unix socket at `accept`/`connect`
/// time (`SO_PEERCRED` on Linux, surfaced by `UnixStream::peer_cred`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub pid: u32,
    pub uid: u32,
}

/// The embedder's policy for which name a PID is allowed to claim. The core
/// only defines the hook; cross-referencing a deployment manifest or
/// `/proc/<pid>/...` is the embedder's job, not this crate's.
pub trait NameResolver: Send + Sync {
    /// The name this PID is expected to claim, if the embedder has an
    /// opinion. `None` leaves the claim unchecked.
    fn expected_name(&self, pid: u32) -> Option<Vec<u8>>;
}

/// A resolver with no opinions — every claimed name is accepted. Useful for
/// tests and for embedders that authorise out of band.
pub struct AllowAll;

impl NameResolver for AllowAll {
    fn expected_name(&self, _pid: u32) -> Option<Vec<u8>> {
        None
    }
}

/// The single bundled value replacing what would otherwise be process
/// globals: the entropy file handle and the component table. Created once at
/// startup and passed by reference to every operation that needs it.
pub struct ProcessContext {
    entropy: Mutex<EntropySource>,
    pub registry: ComponentRegistry,
    resolver: Box<dyn NameResolver>,
}

impl ProcessContext {
    pub fn new(resolver: Box<dyn NameResolver>) -> Result<Self, AuthError> {
        Self::with_capacity(crate::registry::DEFAULT_CAPACITY, resolver)
    }

    pub fn with_capacity(
        capacity: usize,
        resolver: Box<dyn NameResolver>,
    ) -> Result<Self, AuthError> {
        Ok(ProcessContext {
            entropy: Mutex::new(EntropySource::open()?),
            registry: ComponentRegistry::new(capacity),
            resolver,
        })
    }

    /// Checks that `pid` is authorised to claim `claimed_name`. The policy
    /// itself lives in the injected `NameResolver`; this just applies it.
    pub fn validate_name(&self, pid: u32, claimed_name: &[u8]) -> Result<(), AuthError> {
        match self.resolver.expected_name(pid) {
            Some(expected) if expected == claimed_name => Ok(()),
            Some(_) => Err(AuthError::NameNotAuthorised),
            None => Ok(()),
        }
    }

    /// Register `claimed_name`, drawing fresh entropy only if it is new.
    pub fn register(&self, claimed_name: &[u8]) -> Result<(u16, Svcuid), AuthError> {
        self.registry.register_or_get(claimed_name, || {
            let mut entropy = self.entropy.lock().unwrap_or_else(|e| e.into_inner());
            entropy.next_svcuid()
        })
    }

    pub fn lookup_handle(&self, svcuid: &Svcuid) -> Result<u16, AuthError> {
        self.registry.lookup_handle(svcuid)
    }

    pub fn name_of(&self, handle: u16) -> Option<&'static [u8]> {
        self.registry.name_of(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Expects(Vec<u8>);
    impl NameResolver for Expects {
        fn expected_name(&self, _pid: u32) -> Option<Vec<u8>> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn allow_all_accepts_any_claim() {
        let ctx = ProcessContext::new(Box::new(AllowAll));
        // /dev/random may be unavailable in some sandboxes; skip rather than
        // fail the whole suite if so.
        let Ok(ctx) = ctx else { return };
        assert!(ctx.validate_name(123, b"anything").is_ok());
    }

    #[test]
    fn resolver_rejects_mismatched_claim() {
        let ctx =
            ProcessContext::with_capacity(4, Box::new(Expects(b"com.example.A".to_vec())));
        let Ok(ctx) = ctx else { return };
        assert!(ctx.validate_name(1, b"com.example.A").is_ok());
        assert_eq!(
            ctx.validate_name(1, b"com.example.B"),
            Err(AuthError::NameNotAuthorised)
        );
    }
}
