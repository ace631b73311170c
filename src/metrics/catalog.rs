//! Static registry of the metrics each plugin key maps to.
//!
//! Host metrics are fixed command/regex pairs. GPU metrics are templates:
//! the GPU index is substituted into both the metric id and the
//! `nvidia-smi` query so that every GPU gets its own collector.

use super::{MetricSpec, PluginKey};

/// Sampling period for host metrics, in minutes.
const HOST_INTERVAL_MINS: f64 = 1.0;

/// Sampling period for GPU metrics, in minutes. GPU load shifts far
/// faster than host-level counters, hence the tighter interval.
const GPU_INTERVAL_MINS: f64 = 0.1;

struct HostMetricDef {
    key: PluginKey,
    id: &'static str,
    command: &'static str,
    regex: &'static str,
    unit: &'static str,
    description: Option<&'static str>,
}

struct GpuMetricDef {
    key: PluginKey,
    kind: &'static str,
    query: &'static str,
    unit: &'static str,
    description: Option<&'static str>,
}

macro_rules! host_metric {
    ($key:ident, $id:expr, $command:expr, $regex:expr, $unit:expr, $description:expr) => {
        HostMetricDef {
            key: PluginKey::$key,
            id: $id,
            command: $command,
            regex: $regex,
            unit: $unit,
            description: $description,
        }
    };
}

const HOST_METRICS: &[HostMetricDef] = &[
    host_metric!(
        CpuFrequency,
        "cpu-frequency",
        "lscpu",
        r"CPU MHz:\s+(?P<value>[0-9.]+)",
        "MHz",
        Some("Current CPU clock as reported by lscpu")
    ),
    host_metric!(Load, "load", "cat /proc/loadavg", r"^(?P<value>[0-9.]+)", "", Some("1-minute load average")),
    host_metric!(
        MemoryUsage,
        "memory-usage",
        "free -b",
        r"Mem:\s+\d+\s+(?P<value>\d+)",
        "B",
        None
    ),
    host_metric!(
        SwapUsage,
        "swap-usage",
        "free -b",
        r"Swap:\s+\d+\s+(?P<value>\d+)",
        "B",
        None
    ),
    host_metric!(
        PowerConsumption,
        "power-consumption",
        "ipmitool dcmi power reading",
        r"Instantaneous power reading:\s+(?P<value>[0-9.]+)",
        "Watts",
        Some("Chassis power draw via IPMI DCMI")
    ),
];

const GPU_METRICS: &[GpuMetricDef] = &[
    GpuMetricDef {
        key: PluginKey::GpuPower,
        kind: "gpu-power-consumption",
        query: "power.draw",
        unit: "W",
        description: None,
    },
    GpuMetricDef {
        key: PluginKey::GpuUsage,
        kind: "gpu-usage",
        query: "utilization.gpu",
        unit: "%",
        description: None,
    },
    GpuMetricDef {
        key: PluginKey::GpuMemory,
        kind: "gpu-memory",
        query: "memory.used",
        unit: "MiB",
        description: None,
    },
];

/// A catalog lookup result: either a ready-made host metric or a per-GPU
/// template that still needs an index.
#[derive(Debug)]
pub enum CatalogMetric {
    /// Host metric with a fixed id and spec.
    Fixed { id: &'static str, spec: MetricSpec },

    /// GPU metric template, one instantiation per GPU index.
    PerGpu(GpuTemplate),
}

/// Template for a GPU metric; [`expand`](Self::expand) substitutes the
/// GPU index into the id and the query command.
#[derive(Debug)]
pub struct GpuTemplate {
    kind: &'static str,
    query: &'static str,
    unit: &'static str,
    description: Option<&'static str>,
}

impl GpuTemplate {
    /// Instantiate the template for one GPU index.
    #[must_use]
    pub fn expand(&self, index: u32) -> (String, MetricSpec) {
        let id = format!("{}-{index}", self.kind);
        let spec = MetricSpec {
            command: format!("nvidia-smi -i {index} --query-gpu={} --format=csv,noheader,nounits", self.query),
            regex: r"(?P<value>[0-9.]+)".to_string(),
            unit: self.unit.to_string(),
            interval_mins: GPU_INTERVAL_MINS,
            description: self.description.map(str::to_string),
        };

        (id, spec)
    }
}

/// Look up the metric (or GPU template) registered for a plugin key.
#[must_use]
pub fn metric_for(key: PluginKey) -> CatalogMetric {
    if let Some(def) = HOST_METRICS.iter().find(|def| def.key == key) {
        return CatalogMetric::Fixed {
            id: def.id,
            spec: MetricSpec {
                command: def.command.to_string(),
                regex: def.regex.to_string(),
                unit: def.unit.to_string(),
                interval_mins: HOST_INTERVAL_MINS,
                description: def.description.map(str::to_string),
            },
        };
    }

    let def = GPU_METRICS
        .iter()
        .find(|def| def.key == key)
        .unwrap_or_else(|| unreachable!("every plugin key has a catalog entry"));

    CatalogMetric::PerGpu(GpuTemplate {
        kind: def.kind,
        query: def.query,
        unit: def.unit,
        description: def.description,
    })
}
