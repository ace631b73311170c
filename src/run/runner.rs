//! Spawns the installed suite and captures its output.

use super::outcome::RunOutcome;
use crate::Result;
use crate::config::RunPlan;
use camino::Utf8Path;
use ohno::{IntoAppError, bail};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Log target for suite execution
const LOG_TARGET: &str = "     suite";

/// Suite entry point inside the virtual environment.
const BMKRUN: &str = "env_bmk/bin/bmkrun";

/// Run the suite against a written configuration file.
///
/// Output is teed: every line goes to the console log and into
/// `run.log` under the run directory. The returned outcome comes from
/// the log, not the exit code; the two disagree often enough that the
/// exit code is only worth a warning.
pub async fn execute(plan: &RunPlan, config_path: &Utf8Path) -> Result<RunOutcome> {
    let bmkrun = plan.workdir.join(BMKRUN);
    if !bmkrun.exists() {
        bail!("suite entry point not found at {bmkrun}; install first (drop --run-only)");
    }

    std::fs::create_dir_all(&plan.rundir).into_app_err_with(|| format!("creating run directory {}", plan.rundir))?;

    log::info!(target: LOG_TARGET, "starting {bmkrun} with config {config_path}");
    let mut child = Command::new(bmkrun.as_str())
        .arg("-c")
        .arg(config_path.as_str())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .into_app_err_with(|| format!("spawning {bmkrun}"))?;

    let captured = Arc::new(Mutex::new(String::new()));
    let stdout = child.stdout.take().into_app_err("child stdout must be piped")?;
    let stderr = child.stderr.take().into_app_err("child stderr must be piped")?;

    let (status, (), ()) = tokio::join!(
        child.wait(),
        pump(stdout, Arc::clone(&captured)),
        pump(stderr, Arc::clone(&captured)),
    );
    let status = status.into_app_err("waiting for the suite to finish")?;

    let log_text = captured.lock().await.clone();
    let log_path = plan.rundir.join("run.log");
    std::fs::write(&log_path, &log_text).into_app_err_with(|| format!("writing the run log to {log_path}"))?;

    let outcome = RunOutcome::from_log(&log_text);
    match (&outcome, status.success()) {
        (RunOutcome::Success { .. }, false) => {
            log::warn!(target: LOG_TARGET, "suite exited with {status} but the log shows no error, trusting the log");
        }
        (RunOutcome::Failure { marker }, true) => {
            log::warn!(target: LOG_TARGET, "suite exited cleanly but the log says otherwise: {marker}");
        }
        _ => {}
    }

    write_marker(&plan.rundir, &outcome)?;
    Ok(outcome)
}

async fn pump(stream: impl AsyncRead + Unpin, captured: Arc<Mutex<String>>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::info!(target: LOG_TARGET, "{line}");
        let mut captured = captured.lock().await;
        captured.push_str(&line);
        captured.push('\n');
    }
}

/// Marker files let later invocations (and operators) see the last
/// outcome without re-reading the log.
fn write_marker(rundir: &Utf8Path, outcome: &RunOutcome) -> Result<()> {
    let name = if outcome.is_success() { "SUCCESS" } else { "FAILED" };

    // Stale markers from a previous run must not survive
    for stale in ["SUCCESS", "FAILED"] {
        match std::fs::remove_file(rundir.join(stale)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).into_app_err_with(|| format!("removing the stale {stale} marker")),
        }
    }

    std::fs::write(rundir.join(name), "").into_app_err_with(|| format!("writing the {name} marker in {rundir}"))?;
    Ok(())
}
