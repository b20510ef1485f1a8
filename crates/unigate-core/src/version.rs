//! Firmware version handling.
//!
//! Controllers report versions with build suffixes and prefixes
//! (`"v9.0.114-beta.2"`, `"UniFi OS 4.0.6"`). Gating works on the first
//! `MAJOR.MINOR.PATCH` triple found, compared as dotted integers.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version regex"));

/// Extract the first `MAJOR.MINOR.PATCH` in `raw`, or return `raw` unchanged.
pub fn normalize_version(raw: &str) -> String {
    SEMVER
        .find(raw)
        .map_or_else(|| raw.trim().to_owned(), |m| m.as_str().to_owned())
}

/// Component-wise dotted-integer comparison. Missing trailing components
/// count as zero; a component's leading digits are its value.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = components(a);
    let b = components(b);
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// `current >= required`. Equal versions satisfy.
pub fn is_at_least(current: &str, required: &str) -> bool {
    compare_versions(current, required) != Ordering::Less
}

fn components(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
