//! Shared argument handling and logging setup.

use camino::Utf8PathBuf;
use clap::ValueEnum;
use hepscore_runner::config::Settings;
use hepscore_runner::misc::ColorMode;

/// Log target for argument handling
const LOG_TARGET: &str = "       cli";

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

/// The operator surface, one flat command.
#[derive(clap::Args, Debug)]
pub struct RunnerArgs {
    /// Site name reported with published results
    #[arg(long, short = 's', value_name = "NAME")]
    pub site: Option<String>,

    /// Container executor the suite runs workloads with
    #[arg(long, short = 'e', value_name = "NAME")]
    pub executor: Option<String>,

    /// Publish results to the message broker
    #[arg(long)]
    pub publish: bool,

    /// Client certificate used when publishing
    #[arg(long, value_name = "PATH")]
    pub cert: Option<Utf8PathBuf>,

    /// Client key used when publishing
    #[arg(long, value_name = "PATH")]
    pub key: Option<Utf8PathBuf>,

    /// Install the suite and exit without running benchmarks
    #[arg(long)]
    pub install_only: bool,

    /// Run with the existing installation, skip installing
    #[arg(long)]
    pub run_only: bool,

    /// Install from pre-built wheel bundles instead of the git source
    #[arg(long)]
    pub prebuilt: bool,

    /// Working directory [default: platform cache directory]
    #[arg(long, short = 'w', value_name = "PATH")]
    pub workdir: Option<Utf8PathBuf>,

    /// Monitoring plugin keys (comma-separated letters, or 'none')
    #[arg(long, short = 'b', value_name = "KEYS")]
    pub plugins: Option<String>,

    /// Suite version pin: latest, qa, or a concrete version
    #[arg(long, short = 'v', value_name = "VERSION")]
    pub suite_version: Option<String>,

    /// Number of GPUs to benchmark
    #[arg(long, short = 'g', value_name = "COUNT", allow_hyphen_values = true)]
    pub gpus: Option<String>,

    /// Path to settings file [default: one of hepscore.[toml|yml|yaml|json] ]
    #[arg(long, short = 'c', value_name = "PATH")]
    pub settings: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,
}

/// Initialize logger based on log level
pub(crate) fn init_logging(log_level: LogLevel) {
    if log_level == LogLevel::None {
        return;
    }

    let level = match log_level {
        LogLevel::None => return, // Already checked above, but being explicit
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug) || matches!(log_level, LogLevel::Trace))
        .init();
}

/// Command-line flags override whatever the settings file provided.
pub(crate) fn merge_settings(mut settings: Settings, args: &RunnerArgs) -> Settings {
    if let Some(site) = &args.site {
        settings.site = site.clone();
    }
    if let Some(executor) = &args.executor {
        settings.executor = executor.clone();
    }
    if let Some(cert) = &args.cert {
        settings.cert = cert.clone();
    }
    if let Some(key) = &args.key {
        settings.key = key.clone();
    }
    if let Some(workdir) = &args.workdir {
        settings.workdir = Some(workdir.clone());
    }
    if let Some(plugins) = &args.plugins {
        settings.plugins = Some(plugins.clone());
    }
    if let Some(suite_version) = &args.suite_version {
        settings.suite_version = suite_version.clone();
    }
    if let Some(gpus) = &args.gpus {
        settings.gpus = Some(gpus.clone());
    }
    if args.publish {
        settings.publish = true;
    }
    if args.prebuilt {
        settings.prebuilt = true;
    }

    settings
}

/// Turn the raw `--gpus` value into a non-negative count.
///
/// A value that looks like another flag means the operator forgot the
/// count; that reads as "no GPUs", never as a parse error. The core only
/// ever sees the sanitized number.
pub(crate) fn sanitize_gpu_count(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 0;
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }

    if raw.starts_with('-') {
        log::warn!(target: LOG_TARGET, "--gpus value '{raw}' looks like another flag, assuming no GPUs");
        return 0;
    }

    raw.parse().unwrap_or_else(|_| {
        log::warn!(target: LOG_TARGET, "--gpus value '{raw}' is not a non-negative integer, assuming no GPUs");
        0
    })
}
