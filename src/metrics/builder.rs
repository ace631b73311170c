//! Turns a plugin request into the ordered metrics document.

use super::catalog::{CatalogMetric, metric_for};
use super::{MetricsDocument, PluginKey, PluginSelection};
use crate::version::SuiteVersion;
use strum::IntoEnumIterator;

/// Log target for plugin configuration
const LOG_TARGET: &str = "   plugins";

/// Keys enabled when the operator does not ask for anything specific.
/// GPU keys are deliberately absent from the default set.
const DEFAULT_KEYS: &[PluginKey] = &[
    PluginKey::CpuFrequency,
    PluginKey::Load,
    PluginKey::MemoryUsage,
    PluginKey::SwapUsage,
    PluginKey::PowerConsumption,
];

/// Everything the builder needs to decide which metrics to emit.
#[derive(Debug, Clone)]
pub struct PluginRequest {
    pub selection: PluginSelection,
    pub suite_version: SuiteVersion,
    pub gpu_count: u32,
}

/// Build the metrics document for a plugin request.
///
/// Suite versions without the plugin framework yield an empty document
/// no matter what was requested; that is a quiet no-op, not an error.
/// GPU keys requested without any GPU available are dropped with a
/// warning. The returned document follows the canonical catalog order.
#[must_use]
pub fn build(request: &PluginRequest) -> MetricsDocument {
    if !request.suite_version.supports_plugins() {
        log::debug!(
            target: LOG_TARGET,
            "suite version '{}' predates the plugin framework, skipping metric configuration",
            request.suite_version
        );
        return MetricsDocument::default();
    }

    let requested: &[PluginKey] = match &request.selection {
        PluginSelection::Disabled => return MetricsDocument::default(),
        PluginSelection::Unset => DEFAULT_KEYS,
        PluginSelection::Keys(keys) => keys,
    };

    let mut document = MetricsDocument::default();
    for key in PluginKey::iter() {
        if !requested.contains(&key) {
            continue;
        }

        if key.is_gpu() && request.gpu_count == 0 {
            log::warn!(
                target: LOG_TARGET,
                "plugin key '{}' needs a GPU but none are available, dropping it",
                key.letter()
            );
            continue;
        }

        match metric_for(key) {
            CatalogMetric::Fixed { id, spec } => document.push(id.to_string(), spec),
            CatalogMetric::PerGpu(template) => {
                for index in 0..request.gpu_count {
                    let (id, spec) = template.expand(index);
                    document.push(id, spec);
                }
            }
        }
    }

    document
}
