//! Version ordering and suite version tagging.
//!
//! Release artifacts and glibc compatibility tags use delimiter-separated
//! numeric versions (`3.0.1`, `2_31`). Ordering is natural per token, so
//! `1_9` sorts below `1_10`, matching standard version-sort semantics.

use core::cmp::Ordering;
use core::fmt;

/// Log target for version handling
const LOG_TARGET: &str = "   version";

fn tokens(version: &str) -> impl Iterator<Item = &str> {
    version.split(['.', '_', '-']).filter(|t| !t.is_empty())
}

/// Compare two delimiter-separated version strings token by token.
///
/// Returns `None` when either side contains a non-numeric token; callers
/// must treat that as an incomparable pair, never as an error.
#[must_use]
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let mut left = tokens(a);
    let mut right = tokens(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Some(Ordering::Equal),
            (None, Some(_)) => return Some(Ordering::Less),
            (Some(_), None) => return Some(Ordering::Greater),
            (Some(l), Some(r)) => {
                let l: u64 = l.parse().ok()?;
                let r: u64 = r.parse().ok()?;
                match l.cmp(&r) {
                    Ordering::Equal => {}
                    other => return Some(other),
                }
            }
        }
    }
}

/// `true` when `a` sorts at or below `b` under natural version ordering.
///
/// Malformed input reads as "not less-or-equal".
#[must_use]
pub fn is_less_or_equal(a: &str, b: &str) -> bool {
    matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))
}

/// Lowest suite major version that ships the monitoring plugin framework.
const MIN_PLUGIN_MAJOR: u64 = 3;

/// A suite version pin as given by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteVersion {
    /// Track the newest published release.
    Latest,

    /// The rolling QA build.
    Qa,

    /// A concrete version string such as `3.0.1` or the legacy `v2.2` form.
    Pinned(String),
}

impl SuiteVersion {
    /// Classify a raw version string from the command line or settings file.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "latest" => Self::Latest,
            "qa" => Self::Qa,
            other => Self::Pinned(other.to_string()),
        }
    }

    /// The version string as the operator wrote it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Qa => "qa",
            Self::Pinned(v) => v,
        }
    }

    /// Legacy releases (a leading `v`) predate the glibc-tagged wheel naming.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Pinned(v) if v.starts_with('v'))
    }

    /// Whether this suite version ships the monitoring plugin framework.
    ///
    /// QA and latest builds always do; pinned versions need a major
    /// version of at least 3. Versions whose major part cannot be read
    /// (legacy `v…` pins included) report `false`.
    #[must_use]
    pub fn supports_plugins(&self) -> bool {
        match self {
            Self::Latest | Self::Qa => true,
            Self::Pinned(v) => major_of(v).is_some_and(|major| major >= MIN_PLUGIN_MAJOR),
        }
    }
}

impl fmt::Display for SuiteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn major_of(version: &str) -> Option<u64> {
    let digits: String = version.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        log::debug!(target: LOG_TARGET, "version '{version}' has no numeric major part");
        return None;
    }

    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_ordering_beats_lexicographic() {
        assert!(is_less_or_equal("1_9", "1_10"));
        assert!(!is_less_or_equal("1_10", "1_9"));
        assert!(is_less_or_equal("2.9", "2.31"));
    }

    #[test]
    fn equal_versions_compare_equal() {
        assert_eq!(compare("2_31", "2_31"), Some(Ordering::Equal));
        assert!(is_less_or_equal("3.0.1", "3.0.1"));
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        assert!(is_less_or_equal("2", "2.0"));
        assert!(!is_less_or_equal("2.0", "2"));
    }

    #[test]
    fn mixed_delimiters_compare_by_token() {
        assert_eq!(compare("2_31", "2.31"), Some(Ordering::Equal));
        assert!(is_less_or_equal("2-17", "2_28"));
    }

    #[test]
    fn total_order_over_well_formed_input() {
        let versions = ["1", "1.0", "1_9", "1.10", "2_17", "2_28", "2_31", "3.0.1"];
        for a in versions {
            for b in versions {
                let forward = compare(a, b).expect("well-formed versions must compare");
                let backward = compare(b, a).expect("well-formed versions must compare");
                assert_eq!(forward, backward.reverse(), "comparing {a} and {b}");
            }
        }
    }

    #[test]
    fn malformed_input_is_never_less_or_equal() {
        assert!(!is_less_or_equal("2_x", "2_31"));
        assert!(!is_less_or_equal("2_31", "2_x"));
        assert_eq!(compare("abc", "2.0"), None);
    }

    #[test]
    fn plugin_gate_by_major_version() {
        assert!(SuiteVersion::parse("3.0").supports_plugins());
        assert!(SuiteVersion::parse("3.1").supports_plugins());
        assert!(SuiteVersion::parse("10.1").supports_plugins());
        assert!(SuiteVersion::parse("latest").supports_plugins());
        assert!(SuiteVersion::parse("qa").supports_plugins());
        assert!(!SuiteVersion::parse("2.9").supports_plugins());
        assert!(!SuiteVersion::parse("v2.2").supports_plugins());
        assert!(!SuiteVersion::parse("BMK-1642").supports_plugins());
    }

    #[test]
    fn legacy_versions_are_flagged() {
        assert!(SuiteVersion::parse("v2.2").is_legacy());
        assert!(!SuiteVersion::parse("3.0.1").is_legacy());
        assert!(!SuiteVersion::parse("latest").is_legacy());
    }
}
