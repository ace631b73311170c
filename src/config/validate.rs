//! Pre-run validation gate.
//!
//! The checks run in a fixed order (site, publish credentials, executor,
//! GPU availability) and each failing check halts the pipeline before any
//! side effect. The GPU check is the one exception: it degrades by
//! clamping or zeroing the requested count instead of failing.

use super::settings::{PLACEHOLDER_CERT, PLACEHOLDER_KEY, Settings};
use crate::Result;
use crate::metrics::PluginSelection;
use crate::version::SuiteVersion;
use camino::Utf8PathBuf;
use core::str::FromStr;
use ohno::bail;
use std::process::Command;
use strum::{Display, EnumString};

/// Log target for validation
const LOG_TARGET: &str = "  validate";

/// Container executor the suite runs workloads with. Each maps to the
/// workload registry the suite pulls images from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Executor {
    Singularity,
    Docker,
}

impl Executor {
    /// The workload image registry this executor pulls from.
    #[must_use]
    pub const fn registry(self) -> &'static str {
        match self {
            Self::Singularity => "oras://gitlab-registry.cern.ch/hep-benchmarks/hep-workloads-sif",
            Self::Docker => "docker://gitlab-registry.cern.ch/hep-benchmarks/hep-workloads",
        }
    }
}

/// Credential pair used when publishing results.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub cert: Utf8PathBuf,
    pub key: Utf8PathBuf,
}

/// Detects how many GPUs the monitoring tooling can actually see.
pub trait GpuProbe {
    /// Number of visible GPUs, or `None` when the probing tool is
    /// unavailable on this host.
    fn detect(&self) -> Option<u32>;
}

/// Probes GPUs by listing them through `nvidia-smi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NvidiaSmiProbe;

impl GpuProbe for NvidiaSmiProbe {
    fn detect(&self) -> Option<u32> {
        let output = Command::new("nvidia-smi").arg("-L").output().ok()?;
        if !output.status.success() {
            return None;
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let count = listing.lines().filter(|line| line.starts_with("GPU ")).count();
        u32::try_from(count).ok()
    }
}

/// A fully validated run: everything downstream consumes this, never the
/// raw settings.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub site: String,
    pub executor: Executor,
    pub publish: bool,
    pub credentials: Option<Credentials>,
    pub workdir: Utf8PathBuf,
    pub rundir: Utf8PathBuf,
    pub suite_version: SuiteVersion,
    pub plugin_selection: PluginSelection,
    pub gpu_count: u32,
    pub prebuilt: bool,
}

/// Run the validation gate over the merged settings.
///
/// `gpu_request` must already be a sanitized non-negative count; the
/// command-line adapter owns turning raw flag values into that.
pub fn validate(settings: &Settings, gpu_request: u32, probe: &dyn GpuProbe) -> Result<RunPlan> {
    let site = settings.site.trim();
    if site.is_empty() {
        bail!("a site name is required (use --site or set `site` in the settings file)");
    }

    let credentials = check_credentials(settings)?;
    let executor = check_executor(&settings.executor)?;
    let gpu_count = check_gpus(gpu_request, probe);

    let workdir = settings.workdir_or_default()?;
    let rundir = workdir.join("runs");

    log::debug!(target: LOG_TARGET, "executor '{executor}' pulls workloads from {}", executor.registry());

    Ok(RunPlan {
        site: site.to_string(),
        executor,
        publish: settings.publish,
        credentials,
        workdir,
        rundir,
        suite_version: SuiteVersion::parse(&settings.suite_version),
        plugin_selection: PluginSelection::parse(settings.plugins.as_deref()),
        gpu_count,
        prebuilt: settings.prebuilt,
    })
}

fn check_credentials(settings: &Settings) -> Result<Option<Credentials>> {
    if !settings.publish {
        return Ok(None);
    }

    if settings.cert.as_str() == PLACEHOLDER_CERT || settings.key.as_str() == PLACEHOLDER_KEY {
        bail!("publishing requires a real certificate and key (--cert / --key)");
    }

    Ok(Some(Credentials {
        cert: settings.cert.clone(),
        key: settings.key.clone(),
    }))
}

fn check_executor(name: &str) -> Result<Executor> {
    match Executor::from_str(&name.to_lowercase()) {
        Ok(executor) => Ok(executor),
        Err(_) => bail!("unknown executor '{name}' (expected 'singularity' or 'docker')"),
    }
}

/// Degrading check: never fails, only clamps or zeroes the request.
fn check_gpus(requested: u32, probe: &dyn GpuProbe) -> u32 {
    if requested == 0 {
        return 0;
    }

    match probe.detect() {
        None => {
            log::warn!(target: LOG_TARGET, "{requested} GPU(s) requested but no probing tool is available, disabling GPU benchmarking");
            0
        }
        Some(detected) if requested > detected => {
            log::warn!(target: LOG_TARGET, "{requested} GPU(s) requested but only {detected} detected, clamping");
            detected
        }
        Some(_) => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Option<u32>);

    impl GpuProbe for FixedProbe {
        fn detect(&self) -> Option<u32> {
            self.0
        }
    }

    fn valid_settings() -> Settings {
        Settings {
            site: "CERN-T0".to_string(),
            workdir: Some(Utf8PathBuf::from("/tmp/bmk")),
            ..Settings::default()
        }
    }

    #[test]
    fn empty_site_is_fatal() {
        let mut settings = valid_settings();
        settings.site = "  ".to_string();
        let _ = validate(&settings, 0, &FixedProbe(None)).unwrap_err();
    }

    #[test]
    fn publish_with_placeholder_credentials_is_fatal() {
        let mut settings = valid_settings();
        settings.publish = true;
        let _ = validate(&settings, 0, &FixedProbe(None)).unwrap_err();
    }

    #[test]
    fn publish_with_real_credentials_passes() {
        let mut settings = valid_settings();
        settings.publish = true;
        settings.cert = Utf8PathBuf::from("/etc/grid/cert.pem");
        settings.key = Utf8PathBuf::from("/etc/grid/key.pem");

        let plan = validate(&settings, 0, &FixedProbe(None)).expect("validation must pass");
        let credentials = plan.credentials.expect("credentials must be present when publishing");
        assert_eq!(credentials.cert.as_str(), "/etc/grid/cert.pem");
    }

    #[test]
    fn unknown_executor_is_fatal() {
        let mut settings = valid_settings();
        settings.executor = "podman".to_string();
        let _ = validate(&settings, 0, &FixedProbe(None)).unwrap_err();
    }

    #[test]
    fn executor_parsing_is_case_insensitive() {
        let mut settings = valid_settings();
        settings.executor = "Docker".to_string();
        let plan = validate(&settings, 0, &FixedProbe(None)).expect("validation must pass");
        assert_eq!(plan.executor, Executor::Docker);
    }

    #[test]
    fn over_requested_gpus_clamp_to_detected() {
        let plan = validate(&valid_settings(), 8, &FixedProbe(Some(2))).expect("validation must pass");
        assert_eq!(plan.gpu_count, 2);
    }

    #[test]
    fn gpus_without_probe_tool_degrade_to_zero() {
        let plan = validate(&valid_settings(), 4, &FixedProbe(None)).expect("validation must pass");
        assert_eq!(plan.gpu_count, 0);
    }

    #[test]
    fn satisfiable_gpu_request_is_kept() {
        let plan = validate(&valid_settings(), 2, &FixedProbe(Some(4))).expect("validation must pass");
        assert_eq!(plan.gpu_count, 2);
    }

    #[test]
    fn executor_registry_mapping() {
        assert!(Executor::Singularity.registry().starts_with("oras://"));
        assert!(Executor::Docker.registry().starts_with("docker://"));
    }
}
