//! Requirement grammar: `||`-separated disjuncts of whitespace-separated
//! comparator terms, each `<op><version>`.

use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Tilde,
    Caret,
}

struct Comparator {
    op: Op,
    version: Version,
}

/// Does `version` satisfy `requirement`? Either malformed input makes this
/// `false` — including an unparseable `version`, since "reject anything
/// malformed with `false`" is the rule for the version side, and an
/// unparseable requirement can never be satisfied either.
pub fn is_in_range(version: &str, requirement: &str) -> bool {
    let Some(version) = Version::parse(version) else {
        return false;
    };

    let trimmed = requirement.trim();
    if trimmed.is_empty() {
        return true;
    }

    let Some(groups) = parse_requirement(trimmed) else {
        return false;
    };

    groups.iter().any(|group| group_matches(group, &version))
}

fn parse_requirement(requirement: &str) -> Option<Vec<Vec<Comparator>>> {
    let mut groups = Vec::new();
    for disjunct in requirement.split("||") {
        let disjunct = disjunct.trim();
        if disjunct.is_empty() {
            return None;
        }
        let mut comparators = Vec::new();
        for term in disjunct.split_whitespace() {
            comparators.push(parse_comparator(term)?);
        }
        groups.push(comparators);
    }
    Some(groups)
}

fn parse_comparator(term: &str) -> Option<Comparator> {
    let (op, rest) = if let Some(rest) = term.strip_prefix(">=") {
        (Op::Ge, rest)
    } else if let Some(rest) = term.strip_prefix("<=") {
        (Op::Le, rest)
    } else if let Some(rest) = term.strip_prefix("!=") {
        (Op::Ne, rest)
    } else if let Some(rest) = term.strip_prefix('>') {
        (Op::Gt, rest)
    } else if let Some(rest) = term.strip_prefix('<') {
        (Op::Lt, rest)
    } else if let Some(rest) = term.strip_prefix('=') {
        (Op::Eq, rest)
    } else if let Some(rest) = term.strip_prefix('~') {
        (Op::Tilde, rest)
    } else if let Some(rest) = term.strip_prefix('^') {
        (Op::Caret, rest)
    } else {
        return None;
    };
    let version = Version::parse(rest)?;
    Some(Comparator { op, version })
}

fn group_matches(group: &[Comparator], version: &Version) -> bool {
    if version.is_prerelease() {
        // node-semver rule: a pre-release only satisfies a range that
        // explicitly names a pre-release at the same (major, minor, patch).
        let explicitly_allowed = group.iter().any(|c| {
            c.version.major == version.major
                && c.version.minor == version.minor
                && c.version.patch == version.patch
                && c.version.is_prerelease()
        });
        if !explicitly_allowed {
            return false;
        }
    }
    group.iter().all(|c| comparator_matches(c, version))
}

fn comparator_matches(comparator: &Comparator, version: &Version) -> bool {
    match comparator.op {
        Op::Eq => *version == comparator.version,
        Op::Ne => *version != comparator.version,
        Op::Lt => *version < comparator.version,
        Op::Le => *version <= comparator.version,
        Op::Gt => *version > comparator.version,
        Op::Ge => *version >= comparator.version,
        Op::Tilde => {
            let (lower, upper) = tilde_bounds(&comparator.version);
            *version >= lower && *version < upper
        }
        Op::Caret => {
            let (lower, upper) = caret_bounds(&comparator.version);
            *version >= lower && *version < upper
        }
    }
}

/// `~1.2.3 := >=1.2.3 <1.3.0`; `~1.2 := >=1.2.0 <1.3.0`; `~1 := >=1.0.0 <2.0.0`.
/// Every parsed version here always carries all three components, so only
/// the first form applies, but the bound is computed the general way
/// regardless.
fn tilde_bounds(v: &Version) -> (Version, Version) {
    let lower = v.clone();
    // `saturating_add`: a component already at `u64::MAX` has no successor
    // version to bound against, so clamping gives a correct (if unreachable)
    // open upper bound instead of panicking on valid input.
    let upper = bare(v.major, v.minor.saturating_add(1), 0);
    (lower, upper)
}

/// `^1.2.3 := >=1.2.3 <2.0.0`; `^0.2.3 := >=0.2.3 <0.3.0`;
/// `^0.0.3 := >=0.0.3 <0.0.4` — the node-semver zero-major/zero-minor
/// special cases.
fn caret_bounds(v: &Version) -> (Version, Version) {
    let lower = v.clone();
    let upper = if v.major > 0 {
        bare(v.major.saturating_add(1), 0, 0)
    } else if v.minor > 0 {
        bare(0, v.minor.saturating_add(1), 0)
    } else {
        bare(0, 0, v.patch.saturating_add(1))
    };
    (lower, upper)
}

fn bare(major: u64, minor: u64, patch: u64) -> Version {
    Version::parse(&format!("{major}.{minor}.{patch}")).expect("well-formed bare version")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjunction_of_ranges_and_exact_pins() {
        let req = ">=1.2.0 <2.0.0 || =3.0.0";
        assert!(is_in_range("1.4.2", req));
        assert!(!is_in_range("2.0.0", req));
        assert!(is_in_range("3.0.0", req));
        assert!(!is_in_range("1.4.2-beta", ">=1.2.0 <2.0.0"));
        assert!(is_in_range(
            "1.4.2-beta",
            ">=1.4.2-alpha <1.4.2"
        ));
    }

    #[test]
    fn empty_requirement_matches_any_parseable_version() {
        assert!(is_in_range("1.0.0", ""));
        assert!(is_in_range("1.0.0", "   "));
        assert!(!is_in_range("not-a-version", ""));
    }

    #[test]
    fn tilde_allows_patch_bumps_only() {
        assert!(is_in_range("1.2.9", "~1.2.3"));
        assert!(!is_in_range("1.3.0", "~1.2.3"));
    }

    #[test]
    fn caret_zero_major_is_minor_locked() {
        assert!(is_in_range("0.2.9", "^0.2.3"));
        assert!(!is_in_range("0.3.0", "^0.2.3"));
    }

    #[test]
    fn caret_zero_major_zero_minor_is_patch_locked() {
        assert!(!is_in_range("0.0.4", "^0.0.3"));
        assert!(is_in_range("0.0.3", "^0.0.3"));
    }

    #[test]
    fn monotonicity_property() {
        // If a < b, then is_in_range(a, ">"+a) is false and
        // is_in_range(b, ">"+a) is true.
        assert!(!is_in_range("1.4.2", ">1.4.2"));
        assert!(is_in_range("1.4.3", ">1.4.2"));
    }
}
