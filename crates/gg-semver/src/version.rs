//! `MAJOR.MINOR.PATCH[-PRE][+BUILD]` parsing and semver-§11 precedence.

use std::cmp::Ordering;

/// One dot-separated identifier of a pre-release tag: `alpha`, `1`, `rc.2`'s
/// `rc` and `2` are each one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PreIdent {
    Numeric(u64),
    Alpha(String),
}

impl PreIdent {
    fn parse(s: &str) -> Self {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse::<u64>() {
                return PreIdent::Numeric(n);
            }
        }
        PreIdent::Alpha(s.to_string())
    }
}

impl Ord for PreIdent {
    fn cmp(&self, other: &Self) -> Ordering {
        // semver 2.0 §11: numeric identifiers always have lower precedence
        // than alphanumeric identifiers; numerics compare numerically,
        // alphanumerics lexically (ASCII byte order).
        match (self, other) {
            (PreIdent::Numeric(a), PreIdent::Numeric(b)) => a.cmp(b),
            (PreIdent::Alpha(a), PreIdent::Alpha(b)) => a.cmp(b),
            (PreIdent::Numeric(_), PreIdent::Alpha(_)) => Ordering::Less,
            (PreIdent::Alpha(_), PreIdent::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for PreIdent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Vec<PreIdent>,
    // Build metadata is parsed (to validate the grammar) but never affects
    // precedence or equality, per semver §10/§11.
}

impl Version {
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Parse `MAJOR.MINOR.PATCH[-PRE][+BUILD]`. Returns `None` for anything
    /// malformed — the caller treats that as "does not satisfy any range".
    pub fn parse(input: &str) -> Option<Version> {
        let (core_and_pre, _build) = match input.split_once('+') {
            Some((a, b)) => (a, Some(b)),
            None => (input, None),
        };
        let (core, pre_str) = match core_and_pre.split_once('-') {
            Some((a, b)) => (a, Some(b)),
            None => (core_and_pre, None),
        };

        let mut parts = core.split('.');
        let major = parse_numeric_part(parts.next()?)?;
        let minor = parse_numeric_part(parts.next()?)?;
        let patch = parse_numeric_part(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        let pre = match pre_str {
            Some(s) if s.is_empty() => return None,
            Some(s) => {
                let mut idents = Vec::new();
                for ident in s.split('.') {
                    if ident.is_empty() {
                        return None;
                    }
                    idents.push(PreIdent::parse(ident));
                }
                idents
            }
            None => Vec::new(),
        };

        Some(Version {
            major,
            minor,
            patch,
            pre,
        })
    }
}

fn parse_numeric_part(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // No superfluous leading zeroes, per semver §2 ("0" is fine, "01" is not).
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                // A version without a pre-release has *higher* precedence
                // than one with, at equal major.minor.patch (semver §11).
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_core_version() {
        let v = Version::parse("1.4.2").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 4, 2));
        assert!(!v.is_prerelease());
    }

    #[test]
    fn parses_prerelease_and_build() {
        let v = Version::parse("1.0.0-alpha.1+build.5").unwrap();
        assert!(v.is_prerelease());
        assert_eq!(v, Version::parse("1.0.0-alpha.1+build.999").unwrap());
    }

    #[test]
    fn rejects_malformed_versions() {
        assert!(Version::parse("1.2").is_none());
        assert!(Version::parse("1.2.x").is_none());
        assert!(Version::parse("01.2.3").is_none());
        assert!(Version::parse("1.2.3-").is_none());
    }

    #[test]
    fn prerelease_precedence_matches_spec_example() {
        let a = Version::parse("1.0.0-alpha").unwrap();
        let b = Version::parse("1.0.0-alpha.1").unwrap();
        let c = Version::parse("1.0.0-beta").unwrap();
        let d = Version::parse("1.0.0").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
    }
}
