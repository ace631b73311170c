use serde::{Deserialize, Serialize};

/// A single shell-command-based metric collector.
///
/// The extraction regex must capture a named group `value`; the suite's
/// command executor reads the sampled number out of that group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Shell command executed on each sampling tick.
    pub command: String,

    /// Regex applied to the command output, with a named `value` group.
    pub regex: String,

    /// Unit attached to the sampled value.
    pub unit: String,

    /// Sampling period in minutes.
    pub interval_mins: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
