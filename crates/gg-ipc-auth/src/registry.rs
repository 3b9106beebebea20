//! The process-global component table: PID-authenticated names bound to
//! handles and SVCUIDs. Append-only for the process lifetime — entries are
//! never removed, only added, so a `&'static` borrow of a name is sound for
//! as long as the process runs.

use crate::error::AuthError;
use crate::svcuid::Svcuid;
use std::sync::Mutex;

pub const DEFAULT_CAPACITY: usize = 50;

/// Handle 0 is reserved for "unauthenticated".
pub const UNAUTHENTICATED: u16 = 0;

const MAX_NAME_LEN: usize = 128;

struct Entry {
    handle: u16,
    name: &'static [u8],
    svcuid: Svcuid,
}

struct Inner {
    entries: Vec<Entry>,
    capacity: usize,
}

pub struct ComponentRegistry {
    inner: Mutex<Inner>,
}

impl ComponentRegistry {
    pub fn new(capacity: usize) -> Self {
        ComponentRegistry {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                capacity,
            }),
        }
    }

    /// Register `name`, or return the existing `(handle, svcuid)` if it was
    /// already registered — idempotent by name. `make_svcuid` is invoked at
    /// most once, only when a brand new entry must be created, so entropy is
    /// never consumed for an already-registered name.
    pub fn register_or_get(
        &self,
        name: &[u8],
        make_svcuid: impl FnOnce() -> Result<Svcuid, AuthError>,
    ) -> Result<(u16, Svcuid), AuthError> {
        if name.len() > MAX_NAME_LEN {
            return Err(AuthError::NameTooLong);
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = inner.entries.iter().find(|e| e.name == name) {
            return Ok((existing.handle, existing.svcuid));
        }

        if inner.entries.len() >= inner.capacity {
            return Err(AuthError::CapacityExceeded);
        }

        let svcuid = make_svcuid()?;
        let handle = (inner.entries.len() + 1) as u16;
        // Deliberate leak: the table never shrinks for the process lifetime,
        // so this is the one place in the workspace where that's the right
        // call rather than an arena allocation.
        let leaked_name: &'static [u8] = Box::leak(name.to_vec().into_boxed_slice());
        inner.entries.push(Entry {
            handle,
            name: leaked_name,
            svcuid,
        });
        Ok((handle, svcuid))
    }

    /// Independent-time comparison: walks every entry regardless of whether
    /// an earlier one already matched, so total time does not leak which
    /// (if any) entry a given SVCUID matches.
    pub fn lookup_handle(&self, svcuid: &Svcuid) -> Result<u16, AuthError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut found: Option<u16> = None;
        for entry in &inner.entries {
            if entry.svcuid.ct_eq(svcuid) {
                found = Some(entry.handle);
            }
        }
        found.ok_or(AuthError::NotAuthenticated)
    }

    pub fn name_of(&self, handle: u16) -> Option<&'static [u8]> {
        if handle == UNAUTHENTICATED {
            return None;
        }
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.name)
    }
}
