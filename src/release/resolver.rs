//! Picks the wheel bundle to install for a given suite version.
//!
//! Modern releases are published under `{version}/` (or `dev/{version}/`
//! for named development builds) with one bundle per glibc tag. The
//! resolver scrapes the directory listing, extracts the glibc tags, and
//! selects the greatest tag that does not exceed the local glibc. When no
//! tag qualifies it falls back to the first discovered candidate.

use crate::Result;
use crate::version::{self, SuiteVersion};
use ohno::{IntoAppError, bail};
use regex::Regex;
use url::Url;

/// Log target for release resolution
const LOG_TARGET: &str = "   release";

/// Where suite releases are published.
pub const RELEASES_BASE_URL: &str = "https://hep-benchmarks.web.cern.ch/hep-benchmark-suite/releases/";

/// Bare-version pointer file naming the newest release.
const LATEST_POINTER_FILE: &str = "latest_version.txt";

const WHEELS_STEM: &str = "hep-benchmark-suite-wheels";

/// Everything needed to pick one artifact from the listing.
#[derive(Debug, Clone)]
pub struct ReleaseQuery {
    /// Concrete suite version; `latest` has already been resolved.
    pub suite_version: String,

    /// Wheel tag of the local interpreter (e.g. `py39`).
    pub python_tag: String,

    /// CPU architecture (e.g. `x86_64`).
    pub arch: String,

    /// Local glibc version in tag form (e.g. `2_31`); an undetectable
    /// glibc compares with nothing and triggers the first-candidate
    /// fallback.
    pub local_glibc: String,
}

/// The artifact the resolver settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub filename: String,
    pub download_url: Url,
}

#[derive(Debug)]
pub struct ReleaseResolver {
    client: reqwest::Client,
    base_url: Url,
    resolved_latest: Option<String>,
}

impl ReleaseResolver {
    /// Create a resolver against [`RELEASES_BASE_URL`], or against an
    /// override (tests point this at a local mock server).
    pub fn new(base_url_override: Option<&str>) -> Result<Self> {
        let raw = base_url_override.unwrap_or(RELEASES_BASE_URL);
        let mut base = raw.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base_url = Url::parse(&base).into_app_err_with(|| format!("invalid release base URL '{raw}'"))?;
        let client = reqwest::Client::builder()
            .user_agent("hepscore-runner")
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            resolved_latest: None,
        })
    }

    /// Resolve a version pin to a concrete version string.
    ///
    /// `latest` is looked up through the pointer endpoint exactly once;
    /// later calls reuse the first answer. Everything else passes through
    /// unchanged.
    pub async fn resolve_version(&mut self, version: &SuiteVersion) -> Result<String> {
        if !matches!(version, SuiteVersion::Latest) {
            return Ok(version.as_str().to_string());
        }

        if let Some(resolved) = &self.resolved_latest {
            return Ok(resolved.clone());
        }

        let url = self
            .base_url
            .join(LATEST_POINTER_FILE)
            .into_app_err("constructing the latest-version pointer URL")?;
        let resolved = self.get_text(&url).await?.trim().to_string();
        if resolved.is_empty() {
            bail!("the latest-version pointer at {url} is empty");
        }

        log::info!(target: LOG_TARGET, "'latest' resolves to suite version {resolved}");
        self.resolved_latest = Some(resolved.clone());
        Ok(resolved)
    }

    /// Pick the wheel bundle for a query.
    ///
    /// Legacy versions (leading `v`) predate glibc-tagged naming and get
    /// a deterministic filename without any remote lookup. For modern
    /// versions an unreachable or empty listing is an error: fabricating
    /// a filename that may not exist remotely would only turn into a
    /// confusing download failure later.
    pub async fn resolve_artifact(&self, query: &ReleaseQuery) -> Result<ResolvedArtifact> {
        let version = query.suite_version.as_str();

        if version.starts_with('v') {
            let filename = format!("{WHEELS_STEM}-{version}-{}.tar", query.python_tag);
            let download_url = self
                .base_url
                .join(&format!("{version}/{filename}"))
                .into_app_err("constructing the legacy artifact URL")?;
            return Ok(ResolvedArtifact { filename, download_url });
        }

        let listing_url = self
            .base_url
            .join(&format!("{}{version}/", listing_prefix(version)))
            .into_app_err("constructing the release listing URL")?;
        let listing = self
            .get_text(&listing_url)
            .await
            .into_app_err_with(|| format!("fetching the release listing at {listing_url}"))?;

        let candidates = glibc_tags(&listing, version, &query.python_tag, &query.arch);
        if candidates.is_empty() {
            bail!(
                "no wheel bundles for suite {version}, python tag {}, arch {} found at {listing_url}",
                query.python_tag,
                query.arch
            );
        }

        let chosen = best_glibc_tag(&candidates, &query.local_glibc)
            .unwrap_or_else(|| unreachable!("non-empty candidate list always yields a tag"));
        if !version::is_less_or_equal(chosen, &query.local_glibc) {
            log::warn!(
                target: LOG_TARGET,
                "no bundle with glibc <= {} available, falling back to the first candidate (glibc {chosen})",
                query.local_glibc
            );
        }

        let filename = format!(
            "{WHEELS_STEM}-{version}-{}-none-linux_{chosen}_{}.tar",
            query.python_tag, query.arch
        );
        let download_url = listing_url
            .join(&filename)
            .into_app_err("constructing the artifact download URL")?;

        log::info!(target: LOG_TARGET, "selected wheel bundle {filename}");
        Ok(ResolvedArtifact { filename, download_url })
    }

    /// Stream an artifact to `dest_dir`, with a progress bar for large
    /// downloads. Returns the downloaded file path.
    pub async fn download(&self, artifact: &ResolvedArtifact, dest_dir: &camino::Utf8Path) -> Result<camino::Utf8PathBuf> {
        use futures_util::StreamExt;
        use std::io::Write;

        let response = self
            .client
            .get(artifact.download_url.clone())
            .send()
            .await
            .into_app_err_with(|| format!("starting download of {}", artifact.download_url))?;
        if !response.status().is_success() {
            bail!("unable to download {}: HTTP {}", artifact.download_url, response.status());
        }

        std::fs::create_dir_all(dest_dir).into_app_err_with(|| format!("creating download directory {dest_dir}"))?;
        let dest = dest_dir.join(&artifact.filename);
        let mut file = std::fs::File::create(&dest).into_app_err_with(|| format!("creating {dest}"))?;

        let bar = download_bar(response.content_length());
        bar.set_message(artifact.filename.clone());

        let mut stream = response.bytes_stream();
        let mut downloaded = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk.into_app_err_with(|| format!("download of {} failed mid-stream", artifact.filename))?;
            downloaded += chunk.len() as u64;
            bar.set_position(downloaded);
            file.write_all(&chunk).into_app_err_with(|| format!("writing {dest}"))?;
        }

        bar.finish_and_clear();
        log::info!(target: LOG_TARGET, "downloaded {} ({downloaded} bytes)", artifact.filename);
        Ok(dest)
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .into_app_err_with(|| format!("requesting {url}"))?;
        if !response.status().is_success() {
            bail!("request to {url} failed: HTTP {}", response.status());
        }

        response.text().await.into_app_err_with(|| format!("reading the response body from {url}"))
    }
}

fn download_bar(content_length: Option<u64>) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    content_length.map_or_else(ProgressBar::new_spinner, |total| {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:>12} [{bar:25}] {bytes}/{total_bytes} {msg}")
                .expect("could not create progress bar style")
                .progress_chars("=> "),
        );
        bar.set_prefix("Downloading");
        bar
    })
}

/// Named development builds live under `dev/`; anything starting with a
/// digit or `v` is a regular release.
fn listing_prefix(version: &str) -> &'static str {
    match version.chars().next() {
        Some(c) if c.is_ascii_digit() || c == 'v' => "",
        _ => "dev/",
    }
}

/// Extract the glibc tags of all bundles in a listing that match the
/// version, python tag, and architecture. Discovery order is preserved;
/// duplicate links (listings often repeat names) collapse.
fn glibc_tags(listing: &str, version: &str, python_tag: &str, arch: &str) -> Vec<String> {
    let pattern = format!(
        r"{WHEELS_STEM}-{}-{}-none-linux_(\d+)_(\d+)_{}\.tar",
        regex::escape(version),
        regex::escape(python_tag),
        regex::escape(arch)
    );
    let regex = Regex::new(&pattern).unwrap_or_else(|_| unreachable!("escaped listing pattern always compiles"));

    let mut tags = Vec::new();
    for captures in regex.captures_iter(listing) {
        let tag = format!("{}_{}", &captures[1], &captures[2]);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    tags
}

/// The greatest candidate tag not exceeding the local glibc, or the
/// first discovered candidate when none qualify.
fn best_glibc_tag<'a>(candidates: &'a [String], local_glibc: &str) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for candidate in candidates {
        if !version::is_less_or_equal(candidate, local_glibc) {
            continue;
        }

        best = match best {
            Some(current) if version::is_less_or_equal(candidate, current) => Some(current),
            _ => Some(candidate),
        };
    }

    best.or_else(|| candidates.first().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn exact_glibc_match_is_selected() {
        let candidates = tags(&["2_17", "2_28", "2_31", "2_34"]);
        assert_eq!(best_glibc_tag(&candidates, "2_31"), Some("2_31"));
    }

    #[test]
    fn greatest_tag_not_exceeding_local_wins() {
        let candidates = tags(&["2_17", "2_28", "2_34"]);
        assert_eq!(best_glibc_tag(&candidates, "2_30"), Some("2_28"));
    }

    #[test]
    fn selection_is_order_independent() {
        let candidates = tags(&["2_34", "2_17", "2_28"]);
        assert_eq!(best_glibc_tag(&candidates, "2_30"), Some("2_28"));
    }

    #[test]
    fn no_qualifying_tag_falls_back_to_first_candidate() {
        let candidates = tags(&["2_34", "2_35"]);
        assert_eq!(best_glibc_tag(&candidates, "2_17"), Some("2_34"));
    }

    #[test]
    fn undetectable_local_glibc_falls_back_to_first_candidate() {
        let candidates = tags(&["2_28", "2_31"]);
        assert_eq!(best_glibc_tag(&candidates, "unknown"), Some("2_28"));
    }

    #[test]
    fn empty_candidate_list_yields_nothing() {
        assert_eq!(best_glibc_tag(&[], "2_31"), None);
    }

    #[test]
    fn natural_ordering_of_glibc_minors() {
        // 2_9 must lose against 2_10 despite lexicographic order
        let candidates = tags(&["2_9", "2_10"]);
        assert_eq!(best_glibc_tag(&candidates, "2_31"), Some("2_10"));
    }

    #[test]
    fn listing_scrape_extracts_tags_in_discovery_order() {
        let listing = r#"
            <a href="hep-benchmark-suite-wheels-3.0.1-py39-none-linux_2_17_x86_64.tar">old</a>
            <a href="hep-benchmark-suite-wheels-3.0.1-py39-none-linux_2_31_x86_64.tar">new</a>
            <a href="hep-benchmark-suite-wheels-3.0.1-py39-none-linux_2_17_x86_64.tar">old again</a>
            <a href="hep-benchmark-suite-wheels-3.0.1-py3.11-none-linux_2_34_x86_64.tar">other tag</a>
            <a href="hep-benchmark-suite-wheels-3.0.1-py39-none-linux_2_28_aarch64.tar">other arch</a>
        "#;

        let found = glibc_tags(listing, "3.0.1", "py39", "x86_64");
        assert_eq!(found, tags(&["2_17", "2_31"]));
    }

    #[test]
    fn listing_scrape_escapes_the_python_tag_dot() {
        let listing = "hep-benchmark-suite-wheels-3.0.1-py3x11-none-linux_2_28_x86_64.tar";
        assert!(glibc_tags(listing, "3.0.1", "py3.11", "x86_64").is_empty());
    }

    #[test]
    fn dev_builds_get_the_dev_prefix() {
        assert_eq!(listing_prefix("3.0.1"), "");
        assert_eq!(listing_prefix("v2.2"), "");
        assert_eq!(listing_prefix("qa"), "dev/");
        assert_eq!(listing_prefix("BMK-1642"), "dev/");
    }
}
