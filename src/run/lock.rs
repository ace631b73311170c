use crate::Result;
use camino::Utf8Path;
use fs4::fs_std::FileExt;
use ohno::{IntoAppError, bail};
use std::fs::{File, OpenOptions};

/// Log target for the run lock
const LOG_TARGET: &str = "       run";

/// Guard that releases the run lock when dropped
#[derive(Debug)]
pub struct RunLock(File);

impl Drop for RunLock {
    fn drop(&mut self) {
        // Lock is automatically released when the file is closed
        // Log if unlock fails (shouldn't happen in normal operation)
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not release the run lock: {e:#}");
        }
    }
}

/// Take the single-invocation lock for a working directory.
///
/// A second concurrent invocation is a blocking condition: the call fails
/// immediately instead of queueing behind the running one.
pub fn acquire_run_lock(workdir: &Utf8Path) -> Result<RunLock> {
    std::fs::create_dir_all(workdir).into_app_err_with(|| format!("creating working directory {workdir}"))?;
    let lock_path = workdir.join("suite.lock");

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening run lock file at '{lock_path}'"))?;

    let locked = file
        .try_lock_exclusive()
        .into_app_err_with(|| format!("acquiring exclusive lock at '{lock_path}'"))?;
    if !locked {
        bail!("the suite is already running in {workdir} (lock held at '{lock_path}')");
    }

    log::debug!(target: LOG_TARGET, "Acquired run lock at '{lock_path}'");
    Ok(RunLock(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_the_lock_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let workdir = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");

        let lock_path = workdir.join("suite.lock");
        assert!(!lock_path.exists());

        let guard = acquire_run_lock(workdir);
        assert!(guard.is_ok());
        assert!(lock_path.exists());

        drop(guard);
    }

    #[test]
    fn second_holder_is_rejected_not_queued() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let workdir = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");

        let guard = acquire_run_lock(workdir).expect("first acquisition must succeed");
        let second = acquire_run_lock(workdir);
        let _ = second.unwrap_err();

        drop(guard);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let workdir = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");

        let guard = acquire_run_lock(workdir).expect("first acquisition must succeed");
        drop(guard);

        let again = acquire_run_lock(workdir).expect("re-acquisition after release must succeed");
        drop(again);
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let workdir = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8").join("nested/workdir");

        let guard = acquire_run_lock(&workdir).expect("nested acquisition must succeed");
        drop(guard);
    }
}
