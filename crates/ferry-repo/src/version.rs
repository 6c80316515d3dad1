//! Version ordering for component listings.
//!
//! Component versions are usually semantic versions, often with a leading
//! `v`. Anything that does not parse sorts after all semantic versions, in
//! lexical order.

use std::cmp::Ordering;

use ferry_core::NameVersion;

/// A parsed semantic version.
pub type Version = semver::Version;

/// Parse a version string like "1.2.3" or "v1.2.3".
pub fn parse_version(s: &str) -> Option<Version> {
    let trimmed = s.strip_prefix('v').unwrap_or(s);
    Version::parse(trimmed).ok()
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sort component versions by name, then by version.
pub fn sort_name_versions(list: &mut [NameVersion]) {
    list.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| compare_versions(a.version(), b.version()))
    });
}
