//! Version string predicates and ordering
//!
//! Canonical versions are `v`-prefixed semantic versions. Pseudo-versions
//! are canonical versions synthesized for revisions without a semver tag,
//! encoding a commit timestamp and 12-hex short hash.

use semver::Version;
use std::cmp::Ordering;

/// Length of the short commit hash carried by a pseudo-version
pub const SHORT_HASH_LEN: usize = 12;

fn parse(v: &str) -> Option<Version> {
    Version::parse(v.strip_prefix('v')?).ok()
}

/// Whether `v` is a canonical version (`v` followed by a valid semantic
/// version)
pub fn is_canonical(v: &str) -> bool {
    parse(v).is_some()
}

/// Whether `s` consists entirely of lowercase hexadecimal digits
pub fn all_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Whether `v` is a pseudo-version:
/// `v<MAJOR>.<MINOR>.<PATCH>-<14-digit timestamp>-<12 hex>`
pub fn is_pseudo(v: &str) -> bool {
    let mut parts = v.rsplitn(3, '-');
    let (Some(hash), Some(stamp), Some(base)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    hash.len() == SHORT_HASH_LEN
        && all_hex(hash)
        && stamp.len() == 14
        && stamp.bytes().all(|b| b.is_ascii_digit())
        && !base.contains('-')
        && is_canonical(base)
}

/// Order two version strings by semantic-version precedence
///
/// An invalid version sorts below any valid one; two invalid versions
/// compare equal, leaving the tie to the caller.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
