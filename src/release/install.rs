//! Downloads and installs the suite into the working directory.
//!
//! Pre-built installs extract the wheel bundle and install it into a
//! fresh virtual environment with `pip --no-index`; source installs pull
//! the pinned tag straight from the upstream repository instead.

use super::python_tag::interpreter_tag;
use super::resolver::{ReleaseQuery, ReleaseResolver};
use crate::Result;
use crate::config::RunPlan;
use camino::Utf8Path;
use ohno::{IntoAppError, bail};
use regex::Regex;
use std::fs::File;
use std::process::Stdio;
use std::sync::LazyLock;
use tar::Archive;
use tokio::process::Command;

/// Log target for installation
const LOG_TARGET: &str = "   install";

/// Upstream source repository used for non-prebuilt installs.
const SOURCE_REPO_URL: &str = "https://gitlab.cern.ch/hep-benchmarks/hep-benchmark-suite.git";

/// Package installed out of the wheel bundle.
const SUITE_PACKAGE: &str = "hep-benchmark-suite";

/// Virtual environment directory inside the workdir.
const VENV_DIR: &str = "env_bmk";

static GLIBC_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("glibc version regex must compile"));

/// The local glibc version in tag form (`2_31`), read from
/// `ldd --version`. `None` when it cannot be determined.
#[must_use]
pub fn detect_glibc() -> Option<String> {
    let output = std::process::Command::new("ldd").arg("--version").output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let first_line = text.lines().next()?;
    let captures = GLIBC_VERSION.captures(first_line)?;
    Some(format!("{}_{}", &captures[1], &captures[2]))
}

/// Install the suite at the resolved version into the plan's workdir.
pub async fn install(plan: &RunPlan, resolver: &ReleaseResolver, version: &str) -> Result<()> {
    std::fs::create_dir_all(&plan.workdir).into_app_err_with(|| format!("creating working directory {}", plan.workdir))?;

    create_venv(&plan.workdir).await?;

    if plan.prebuilt {
        install_prebuilt(plan, resolver, version).await
    } else {
        install_from_source(&plan.workdir, version).await
    }
}

async fn install_prebuilt(plan: &RunPlan, resolver: &ReleaseResolver, version: &str) -> Result<()> {
    let local_glibc = detect_glibc().unwrap_or_else(|| {
        log::warn!(target: LOG_TARGET, "unable to detect the local glibc version");
        "unknown".to_string()
    });

    let query = ReleaseQuery {
        suite_version: version.to_string(),
        python_tag: interpreter_tag(),
        arch: std::env::consts::ARCH.to_string(),
        local_glibc,
    };

    let artifact = resolver.resolve_artifact(&query).await?;
    let bundle = resolver.download(&artifact, &plan.workdir.join("downloads")).await?;

    let wheels_dir = plan.workdir.join("wheels");
    extract_bundle(&bundle, &wheels_dir)?;

    log::info!(target: LOG_TARGET, "installing {SUITE_PACKAGE} {version} from {wheels_dir}");
    run_pip(
        &plan.workdir,
        &["install", "--no-index", "--find-links", wheels_dir.as_str(), SUITE_PACKAGE],
    )
    .await
}

async fn install_from_source(workdir: &Utf8Path, version: &str) -> Result<()> {
    log::info!(target: LOG_TARGET, "installing {SUITE_PACKAGE} {version} from source");
    let spec = format!("git+{SOURCE_REPO_URL}@{version}");
    run_pip(workdir, &["install", &spec]).await
}

fn extract_bundle(bundle: &Utf8Path, wheels_dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(wheels_dir).into_app_err_with(|| format!("creating {wheels_dir}"))?;
    let file = File::open(bundle).into_app_err_with(|| format!("opening the wheel bundle at {bundle}"))?;
    let mut archive = Archive::new(file);
    archive
        .unpack(wheels_dir)
        .into_app_err_with(|| format!("extracting {bundle} into {wheels_dir}"))?;

    log::debug!(target: LOG_TARGET, "extracted {bundle} into {wheels_dir}");
    Ok(())
}

async fn create_venv(workdir: &Utf8Path) -> Result<()> {
    let venv = workdir.join(VENV_DIR);
    if venv.join("bin/pip").exists() {
        log::debug!(target: LOG_TARGET, "reusing the virtual environment at {venv}");
        return Ok(());
    }

    let status = Command::new("python3")
        .args(["-m", "venv", venv.as_str()])
        .stdout(Stdio::null())
        .status()
        .await
        .into_app_err("launching python3 to create the virtual environment")?;
    if !status.success() {
        bail!("python3 -m venv failed with {status}");
    }

    Ok(())
}

async fn run_pip(workdir: &Utf8Path, args: &[&str]) -> Result<()> {
    let pip = workdir.join(VENV_DIR).join("bin/pip");
    let status = Command::new(pip.as_str())
        .args(args)
        .status()
        .await
        .into_app_err_with(|| format!("launching {pip}"))?;
    if !status.success() {
        bail!("pip {} failed with {status}", args.join(" "));
    }

    Ok(())
}
