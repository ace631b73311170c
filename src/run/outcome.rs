//! Log-based run triage.
//!
//! The suite's exit code is unreliable: runs have been observed exiting
//! zero after failing workloads. The captured run log is the canonical
//! signal: a run succeeded exactly when no error marker appears in it.

use regex::Regex;
use std::sync::LazyLock;

/// A line carrying this marker means the run failed, whatever the
/// process exit code said.
static ERROR_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bERROR\b").expect("error marker regex must compile"));

/// The reported benchmark score, when the suite printed one.
static SCORE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)score:\s*(?P<value>[0-9]+(?:\.[0-9]+)?)").expect("score regex must compile"));

/// What actually happened during a run, as told by its log.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No error marker in the log; `score` is filled when the suite
    /// reported one.
    Success { score: Option<f64> },

    /// An error marker appeared; `marker` is the first offending line.
    Failure { marker: String },
}

impl RunOutcome {
    /// Triage a captured run log.
    #[must_use]
    pub fn from_log(log_text: &str) -> Self {
        for line in log_text.lines() {
            if ERROR_MARKER.is_match(line) {
                return Self::Failure {
                    marker: line.trim().to_string(),
                };
            }
        }

        let score = SCORE_LINE
            .captures(log_text)
            .and_then(|captures| captures.name("value"))
            .and_then(|value| value.as_str().parse().ok());

        Self::Success { score }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
