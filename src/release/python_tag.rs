use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

/// Log target for release resolution
const LOG_TARGET: &str = "   release";

/// Python tags wheel bundles are published for. The two tag spellings are
/// what the release pipeline actually produces.
pub const SUPPORTED_PYTHON_TAGS: &[&str] = &["py36", "py38", "py39", "py3.11", "py3.12"];

/// Fallback tag when the local interpreter is not covered by the
/// published bundles.
pub const DEFAULT_PYTHON_TAG: &str = "py39";

static PYTHON_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Python (\d+)\.(\d+)").expect("python version regex must compile"));

/// The wheel tag for the local `python3` interpreter.
///
/// Unsupported or undetectable interpreters fall back to
/// [`DEFAULT_PYTHON_TAG`] with a warning; this never fails.
#[must_use]
pub fn interpreter_tag() -> String {
    let Some((major, minor)) = detect_interpreter() else {
        log::warn!(target: LOG_TARGET, "unable to detect the local python3 interpreter, assuming {DEFAULT_PYTHON_TAG}");
        return DEFAULT_PYTHON_TAG.to_string();
    };

    let tag = tag_for(major, minor);
    if SUPPORTED_PYTHON_TAGS.contains(&tag.as_str()) {
        tag
    } else {
        log::warn!(target: LOG_TARGET, "python tag '{tag}' has no published wheel bundles, falling back to {DEFAULT_PYTHON_TAG}");
        DEFAULT_PYTHON_TAG.to_string()
    }
}

/// Tag spelling: `py39` up to minor 9, `py3.11` from 3.10 on, matching
/// the release pipeline's naming.
pub(crate) fn tag_for(major: u32, minor: u32) -> String {
    if minor <= 9 {
        format!("py{major}{minor}")
    } else {
        format!("py{major}.{minor}")
    }
}

fn detect_interpreter() -> Option<(u32, u32)> {
    let output = Command::new("python3").arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    // Old interpreters print the version on stderr
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stdout.trim().is_empty() { stderr } else { stdout };

    let captures = PYTHON_VERSION.captures(&text)?;
    let major = captures.get(1)?.as_str().parse().ok()?;
    let minor = captures.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}
