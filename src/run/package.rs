//! Packs a finished run directory into a timestamped results archive.

use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use ohno::IntoAppError;
use std::fs::File;

/// Log target for results packaging
const LOG_TARGET: &str = "       run";

/// Pack `rundir` into `{workdir}/hep-benchmark-suite-results-{stamp}.tar.gz`
/// and return the archive path.
pub fn package_results(workdir: &Utf8Path, rundir: &Utf8Path) -> Result<Utf8PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let archive_path = workdir.join(format!("hep-benchmark-suite-results-{stamp}.tar.gz"));

    let file = File::create(&archive_path).into_app_err_with(|| format!("creating the results archive at {archive_path}"))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all("runs", rundir)
        .into_app_err_with(|| format!("packing {rundir} into the results archive"))?;
    let encoder = builder.into_inner().into_app_err("finalizing the results archive")?;
    let _ = encoder.finish().into_app_err("flushing the results archive")?;

    log::info!(target: LOG_TARGET, "packed results into {archive_path}");
    Ok(archive_path)
}
