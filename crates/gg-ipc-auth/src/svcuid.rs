//! The 16-byte opaque token handed to an authenticated component.

use crate::error::AuthError;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;

/// A 16-byte token, compared as raw bytes — never base64, never printed in
/// full (logged truncated/redacted, per the ambient logging convention).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Svcuid([u8; 16]);

impl Svcuid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Svcuid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Constant-time-independent comparison: never short-circuits, so two
    /// tokens differing in their first byte take exactly as long to compare
    /// as two differing in their last.
    pub fn ct_eq(&self, other: &Svcuid) -> bool {
        let mut diff = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl fmt::Debug for Svcuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Svcuid({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// The system entropy source, opened exactly once per process. Bundled into
/// `ProcessContext` rather than a global — see the Design Notes' rule
/// against ambient globals besides the log mutex.
pub struct EntropySource(File);

impl EntropySource {
    pub fn open() -> Result<Self, AuthError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc_cloexec())
            .open("/dev/random")
            .map_err(|_| AuthError::EntropyUnavailable)?;
        Ok(EntropySource(file))
    }

    pub fn next_svcuid(&mut self) -> Result<Svcuid, AuthError> {
        let mut bytes = [0u8; 16];
        self.0
            .read_exact(&mut bytes)
            .map_err(|_| AuthError::EntropyUnavailable)?;
        Ok(Svcuid::from_bytes(bytes))
    }
}

/// `O_CLOEXEC`, spelled out rather than pulling in `libc` for one constant.
fn libc_cloexec() -> i32 {
    0o2_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ct_eq_is_reflexive_and_distinguishes() {
        let a = Svcuid::from_bytes([1u8; 16]);
        let b = Svcuid::from_bytes([1u8; 16]);
        let mut c = [1u8; 16];
        c[15] = 2;
        let c = Svcuid::from_bytes(c);
        assert!(a.ct_eq(&b));
        assert!(!a.ct_eq(&c));
    }
}
