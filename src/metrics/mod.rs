//! Monitoring plugin metrics for the generated suite configuration.
//!
//! The suite can sample host metrics while benchmarks run. Each metric is
//! a shell command plus an extraction regex, registered in a static
//! [`catalog`] keyed by single-letter plugin selectors. The [`builder`]
//! turns an operator's requested key set into the ordered
//! [`MetricsDocument`] fragment that lands in the final config file.

mod builder;
mod catalog;
mod document;
mod metric_spec;
mod plugin_key;

pub use builder::{PluginRequest, build};
pub use catalog::{CatalogMetric, GpuTemplate, metric_for};
pub use document::MetricsDocument;
pub use metric_spec::MetricSpec;
pub use plugin_key::{PluginKey, PluginSelection};
