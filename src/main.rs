//! A tool to install, configure, and run the HEPscore benchmark suite.
//!
//! # Overview
//!
//! `hepscore-runner` wraps the HEP Benchmark Suite for operators: it
//! turns a handful of flags (site, executor, GPU count, monitoring
//! plugins, version pin) into the suite's YAML configuration, installs a
//! compatible pre-built release for the local platform, runs the suite,
//! and triages the result from the captured run log.
//!
//! # Quick Start
//!
//! Install and run with the default monitoring plugins:
//!
//! ```bash
//! hepscore-runner --site MY-SITE
//! ```
//!
//! # Basic Usage
//!
//! **Install only, pinned version, pre-built wheels:**
//! ```bash
//! hepscore-runner --site MY-SITE --install-only --prebuilt -v 3.0.1
//! ```
//!
//! **Run against an existing installation with GPU metrics:**
//! ```bash
//! hepscore-runner --site MY-SITE --run-only -b f,l,m,s,p,g,u,v -g 2
//! ```
//!
//! **Publish results (requires real credentials):**
//! ```bash
//! hepscore-runner --site MY-SITE --publish \
//!   --cert /etc/grid/cert.pem --key /etc/grid/key.pem
//! ```
//!
//! # Monitoring Plugins
//!
//! The `-b` flag takes comma-separated single-letter keys:
//!
//! | key | metric              | key | metric            |
//! |-----|---------------------|-----|-------------------|
//! | `f` | CPU frequency       | `g` | GPU power draw    |
//! | `l` | load average        | `u` | GPU utilization   |
//! | `m` | memory usage        | `v` | GPU memory usage  |
//! | `s` | swap usage          |     |                   |
//! | `p` | power consumption   |     |                   |
//!
//! Without `-b` the host keys `f,l,m,s,p` are enabled; `-b none`
//! disables metric collection entirely. GPU keys need `-g` with a count
//! and only apply to suite versions 3.0 and newer (or `qa`/`latest`).
//!
//! # Settings File
//!
//! All flags can also come from `hepscore.[toml|yml|yaml|json]` in the
//! current directory (or `--settings PATH`); flags win over the file:
//!
//! ```toml
//! site = "MY-SITE"
//! executor = "singularity"
//! plugins = "f,l,m"
//! suite_version = "latest"
//! ```

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use hepscore_runner::Result;

mod commands;

use crate::commands::{RunnerArgs, execute};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "hepscore-runner", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    args: RunnerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(&cli.args).await
}
