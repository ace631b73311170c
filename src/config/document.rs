//! The suite configuration document and its assembler.
//!
//! This is the YAML file the suite reads. Assembly is a pure merge of the
//! validated run plan with the metrics fragment; validation has already
//! happened by the time anything here runs.

use super::validate::RunPlan;
use crate::Result;
use crate::metrics::MetricsDocument;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Message broker endpoint results are published to.
const ACTIVEMQ_SERVER: &str = "dashb-mb.cern.ch";
const ACTIVEMQ_TOPIC: &str = "/topic/vm.spec";
const ACTIVEMQ_PORT: u16 = 61123;

/// Seconds of idle metric sampling captured before and after the run.
const STAGE_DURATION_SECS: u32 = 10;

/// Top-level suite configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub activemq: ActiveMq,
    pub global: Global,
    pub hepscore: HepScore,

    /// Omitted entirely when no metrics were configured; the suite treats
    /// an empty plugins stanza as malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Plugins>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMq {
    pub server: String,
    pub topic: String,
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Utf8PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub benchmarks: Vec<String>,
    pub mode: String,
    pub publish: bool,
    pub rundir: Utf8PathBuf,
    pub show: bool,
    pub tags: Tags,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_requirements: Option<HwRequirements>,

    pub sw_requirements: SwRequirements,

    #[serde(rename = "pre-stage-duration")]
    pub pre_stage_duration: u32,

    #[serde(rename = "post-stage-duration")]
    pub post_stage_duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tags {
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HwRequirements {
    pub gpus: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwRequirements {
    pub container_runtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HepScore {
    pub version: String,
    pub config: String,
    pub options: HepScoreOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HepScoreOptions {
    pub userns: bool,
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    #[serde(rename = "CommandExecutor")]
    pub command_executor: CommandExecutor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandExecutor {
    pub metrics: MetricsDocument,
}

/// Assemble the suite configuration document from a validated plan.
///
/// `resolved_version` is the concrete suite version (a `latest` pin has
/// already been resolved by the release resolver, best-effort).
#[must_use]
pub fn assemble(plan: &RunPlan, resolved_version: &str, metrics: MetricsDocument) -> SuiteConfig {
    let (key, cert) = plan
        .credentials
        .as_ref()
        .map_or((None, None), |c| (Some(c.key.clone()), Some(c.cert.clone())));

    let plugins = if metrics.is_empty() {
        None
    } else {
        Some(Plugins {
            command_executor: CommandExecutor { metrics },
        })
    };

    SuiteConfig {
        activemq: ActiveMq {
            server: ACTIVEMQ_SERVER.to_string(),
            topic: ACTIVEMQ_TOPIC.to_string(),
            port: ACTIVEMQ_PORT,
            key,
            cert,
        },
        global: Global {
            benchmarks: vec!["hepscore".to_string()],
            mode: plan.executor.to_string(),
            publish: plan.publish,
            rundir: plan.rundir.clone(),
            show: true,
            tags: Tags { site: plan.site.clone() },
            hw_requirements: (plan.gpu_count > 0).then(|| HwRequirements { gpus: plan.gpu_count }),
            sw_requirements: SwRequirements {
                container_runtime: plan.executor.to_string(),
            },
            pre_stage_duration: STAGE_DURATION_SECS,
            post_stage_duration: STAGE_DURATION_SECS,
        },
        hepscore: HepScore {
            version: resolved_version.to_string(),
            config: "default".to_string(),
            options: HepScoreOptions { userns: true, clean: true },
        },
        plugins,
    }
}

impl SuiteConfig {
    /// Write the document as YAML.
    pub fn write_to(&self, path: &Utf8Path) -> Result<()> {
        let text = serde_yaml::to_string(self).into_app_err("serializing the suite configuration")?;
        fs::write(path, text).into_app_err_with(|| format!("writing the suite configuration to {path}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, Executor};
    use crate::metrics::{PluginRequest, PluginSelection, build};
    use crate::version::SuiteVersion;

    fn plan(publish: bool, gpu_count: u32) -> RunPlan {
        RunPlan {
            site: "CERN-T0".to_string(),
            executor: Executor::Singularity,
            publish,
            credentials: publish.then(|| Credentials {
                cert: Utf8PathBuf::from("/etc/grid/cert.pem"),
                key: Utf8PathBuf::from("/etc/grid/key.pem"),
            }),
            workdir: Utf8PathBuf::from("/tmp/bmk"),
            rundir: Utf8PathBuf::from("/tmp/bmk/runs"),
            suite_version: SuiteVersion::Latest,
            plugin_selection: PluginSelection::Unset,
            gpu_count,
            prebuilt: true,
        }
    }

    fn metrics(raw_keys: Option<&str>, gpu_count: u32) -> MetricsDocument {
        build(&PluginRequest {
            selection: PluginSelection::parse(raw_keys),
            suite_version: SuiteVersion::Latest,
            gpu_count,
        })
    }

    #[test]
    fn empty_metrics_omit_the_plugins_stanza() {
        let config = assemble(&plan(false, 0), "3.1", MetricsDocument::default());
        let yaml = serde_yaml::to_string(&config).expect("config must serialize");
        assert!(config.plugins.is_none());
        assert!(!yaml.contains("plugins"));
        assert!(!yaml.contains("CommandExecutor"));
    }

    #[test]
    fn credentials_only_present_when_publishing() {
        let unpublished = assemble(&plan(false, 0), "3.1", MetricsDocument::default());
        assert!(unpublished.activemq.cert.is_none());

        let published = assemble(&plan(true, 0), "3.1", MetricsDocument::default());
        assert_eq!(
            published.activemq.cert.as_deref(),
            Some(Utf8Path::new("/etc/grid/cert.pem"))
        );
    }

    #[test]
    fn hw_requirements_follow_gpu_count() {
        let without = assemble(&plan(false, 0), "3.1", MetricsDocument::default());
        assert!(without.global.hw_requirements.is_none());

        let with = assemble(&plan(false, 2), "3.1", MetricsDocument::default());
        assert_eq!(with.global.hw_requirements, Some(HwRequirements { gpus: 2 }));
    }

    #[test]
    fn resolved_version_lands_in_the_hepscore_section() {
        let config = assemble(&plan(false, 0), "3.0.1", MetricsDocument::default());
        assert_eq!(config.hepscore.version, "3.0.1");
    }

    #[test]
    fn round_trip_recovers_metric_ids_and_specs() {
        let document = metrics(Some("f,g"), 2);
        let config = assemble(&plan(false, 2), "3.1", document.clone());

        let yaml = serde_yaml::to_string(&config).expect("config must serialize");
        let parsed: SuiteConfig = serde_yaml::from_str(&yaml).expect("config must parse back");

        let parsed_metrics = parsed.plugins.expect("plugins stanza present").command_executor.metrics;
        assert_eq!(parsed_metrics, document);
        let ids: Vec<_> = parsed_metrics.metric_ids().collect();
        assert_eq!(ids, vec!["cpu-frequency", "gpu-power-consumption-0", "gpu-power-consumption-1"]);
    }

    #[test]
    fn document_shape_matches_the_suite_contract() {
        let config = assemble(&plan(true, 1), "3.1", metrics(None, 0));
        let yaml = serde_yaml::to_string(&config).expect("config must serialize");
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("yaml must parse");

        for section in ["activemq", "global", "hepscore", "plugins"] {
            assert!(value.get(section).is_some(), "missing section {section}");
        }
        assert!(
            value["global"].get("pre-stage-duration").is_some(),
            "stage durations use the dashed key form"
        );
        assert_eq!(value["global"]["tags"]["site"].as_str(), Some("CERN-T0"));
    }
}
