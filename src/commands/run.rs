//! End-to-end pipeline: validate, configure, install, run, triage.

use super::common::{RunnerArgs, init_logging, merge_settings, sanitize_gpu_count};
use camino::Utf8PathBuf;
use hepscore_runner::Result;
use hepscore_runner::config::{self, NvidiaSmiProbe, RunPlan, Settings};
use hepscore_runner::metrics::{self, PluginRequest};
use hepscore_runner::misc::ColorMode;
use hepscore_runner::release::{self, ReleaseResolver};
use hepscore_runner::run::{RunOutcome, acquire_run_lock, package_results};
use hepscore_runner::{run as suite_run, version::SuiteVersion};
use ohno::{IntoAppError, app_err, bail};
use owo_colors::OwoColorize;

/// Log target for the pipeline
const LOG_TARGET: &str = "  pipeline";

/// Name of the generated suite configuration file inside the workdir.
const CONFIG_FILENAME: &str = "bmkrun_config.yml";

/// Run the whole pipeline for one invocation.
pub async fn execute(args: &RunnerArgs) -> Result<()> {
    init_logging(args.log_level);

    if args.install_only && args.run_only {
        bail!("--install-only and --run-only are mutually exclusive");
    }

    let cwd = Utf8PathBuf::from_path_buf(std::env::current_dir().into_app_err("determining the current directory")?)
        .map_err(|path| app_err!("current directory path is not UTF-8: {}", path.display()))?;
    let settings = Settings::load(&cwd, args.settings.as_ref())?;
    let settings = merge_settings(settings, args);
    let gpu_request = sanitize_gpu_count(settings.gpus.as_deref());

    let plan = config::validate(&settings, gpu_request, &NvidiaSmiProbe)?;

    let mut resolver = ReleaseResolver::new(None)?;
    let resolved_version = match resolver.resolve_version(&plan.suite_version).await {
        Ok(version) => Some(version),
        Err(e) => {
            log::warn!(target: LOG_TARGET, "unable to resolve the suite version: {e:#}");
            None
        }
    };

    // The configuration document never depends on the network being up;
    // a failed resolution degrades to the literal pin.
    let config_version = resolved_version
        .clone()
        .unwrap_or_else(|| plan.suite_version.as_str().to_string());
    let config_path = write_config(&plan, &config_version)?;

    if !args.run_only {
        let Some(version) = &resolved_version else {
            bail!("cannot install: the suite version could not be resolved");
        };
        release::install(&plan, &resolver, version).await?;
        if args.install_only {
            log::info!(target: LOG_TARGET, "installation finished, exiting without running");
            return Ok(());
        }
    }

    run_suite(&plan, &config_version, &config_path, args.color).await
}

fn write_config(plan: &RunPlan, version: &str) -> Result<Utf8PathBuf> {
    let request = PluginRequest {
        selection: plan.plugin_selection.clone(),
        suite_version: plan.suite_version.clone(),
        gpu_count: plan.gpu_count,
    };
    let document = metrics::build(&request);
    log::info!(target: LOG_TARGET, "configured {} metric collector(s)", document.len());

    let config = config::assemble(plan, version, document);
    std::fs::create_dir_all(&plan.workdir).into_app_err_with(|| format!("creating working directory {}", plan.workdir))?;
    let config_path = plan.workdir.join(CONFIG_FILENAME);
    config.write_to(&config_path)?;
    log::info!(target: LOG_TARGET, "wrote the suite configuration to {config_path}");

    Ok(config_path)
}

async fn run_suite(plan: &RunPlan, version: &str, config_path: &Utf8PathBuf, color: ColorMode) -> Result<()> {
    let _lock = acquire_run_lock(&plan.workdir)?;

    let outcome = suite_run::execute(plan, config_path).await?;
    let archive = package_results(&plan.workdir, &plan.rundir)?;
    report(plan, version, &outcome, &archive, color);

    if let RunOutcome::Failure { marker } = outcome {
        bail!("benchmark run failed: {marker}");
    }

    Ok(())
}

fn report(plan: &RunPlan, version: &str, outcome: &RunOutcome, archive: &Utf8PathBuf, color: ColorMode) {
    let version_label = match &plan.suite_version {
        SuiteVersion::Latest => format!("{version} (latest)"),
        other => other.to_string(),
    };

    println!("Site    : {}", plan.site);
    println!("Version : {version_label}");
    println!("Results : {archive}");
    match outcome {
        RunOutcome::Success { score: Some(score) } => println!("Score   : {score}"),
        RunOutcome::Success { score: None } => {}
        RunOutcome::Failure { marker } => println!("Cause   : {marker}"),
    }

    let label = if outcome.is_success() { "SUCCESS" } else { "FAILED" };
    if color.enabled() {
        if outcome.is_success() {
            println!("Outcome : {}", label.green());
        } else {
            println!("Outcome : {}", label.red());
        }
    } else {
        println!("Outcome : {label}");
    }
}
