use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// Placeholder credential paths. Publishing requires pointing both at
/// real files; the validation gate rejects the placeholders.
pub const PLACEHOLDER_CERT: &str = "usercert.pem";
pub const PLACEHOLDER_KEY: &str = "userkey.pem";

fn default_executor() -> String {
    "singularity".to_string()
}

fn default_cert() -> Utf8PathBuf {
    Utf8PathBuf::from(PLACEHOLDER_CERT)
}

fn default_key() -> Utf8PathBuf {
    Utf8PathBuf::from(PLACEHOLDER_KEY)
}

fn default_suite_version() -> String {
    "latest".to_string()
}

/// Operator settings, file layer.
///
/// All fields are optional in the file; command-line flags override file
/// values and defaults fill whatever remains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Site name reported with published results.
    #[serde(default)]
    pub site: String,

    /// Container executor used by the suite (`singularity` or `docker`).
    #[serde(default = "default_executor")]
    pub executor: String,

    /// Whether results are published to the message broker.
    #[serde(default)]
    pub publish: bool,

    /// Client certificate for publishing.
    #[serde(default = "default_cert")]
    pub cert: Utf8PathBuf,

    /// Client key for publishing.
    #[serde(default = "default_key")]
    pub key: Utf8PathBuf,

    /// Working directory; defaults to the platform cache directory.
    #[serde(default)]
    pub workdir: Option<Utf8PathBuf>,

    /// Raw plugin key list (`f,l,m,s,p,g,u,v`), or the `none` sentinel.
    #[serde(default)]
    pub plugins: Option<String>,

    /// Suite version pin: `latest`, `qa`, or a concrete version.
    #[serde(default = "default_suite_version")]
    pub suite_version: String,

    /// Raw GPU count as given by the operator; sanitized before use.
    #[serde(default)]
    pub gpus: Option<String>,

    /// Install from pre-built wheel bundles instead of the git source.
    #[serde(default)]
    pub prebuilt: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site: String::new(),
            executor: default_executor(),
            publish: false,
            cert: default_cert(),
            key: default_key(),
            workdir: None,
            plugins: None,
            suite_version: default_suite_version(),
            gpus: None,
            prebuilt: false,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or from the first of
    /// `hepscore.[toml|yml|yaml|json]` found under `base`. No file at all
    /// is fine and yields the defaults.
    pub fn load(base: &Utf8Path, settings_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = settings_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading settings from {path}"))?;
            (path.clone(), text)
        } else {
            let candidates = [
                base.join("hepscore.toml"),
                base.join("hepscore.yml"),
                base.join("hepscore.yaml"),
                base.join("hepscore.json"),
            ];

            let mut found = None;
            for path in &candidates {
                match fs::read_to_string(path) {
                    Ok(text) => {
                        found = Some((path.clone(), text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading settings from {path}")),
                }
            }

            let Some(result) = found else {
                return Ok(Self::default());
            };
            result
        };

        let extension = final_path.extension().unwrap_or_default();
        let settings: Self = match extension {
            "toml" => toml::from_str(&text).into_app_err_with(|| format!("parsing TOML settings from {final_path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing YAML settings from {final_path}"))?,
            "json" => serde_json::from_str(&text).into_app_err_with(|| format!("parsing JSON settings from {final_path}"))?,
            _ => return Err(app_err!("unsupported settings file extension: {extension}")),
        };

        Ok(settings)
    }

    /// The working directory to use: the configured one, or the platform
    /// cache directory.
    pub fn workdir_or_default(&self) -> Result<Utf8PathBuf> {
        if let Some(workdir) = &self.workdir {
            return Ok(workdir.clone());
        }

        let base_dirs = BaseDirs::new().into_app_err("unable to determine the platform cache directory")?;
        let default = base_dirs.cache_dir().join("hepscore-runner");
        Utf8PathBuf::from_path_buf(default).map_err(|path| app_err!("cache directory path is not UTF-8: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    #[test]
    fn defaults_when_no_file_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let base = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");

        let settings = Settings::load(base, None).expect("loading without a file must succeed");
        assert_eq!(settings.executor, "singularity");
        assert_eq!(settings.suite_version, "latest");
        assert_eq!(settings.cert.as_str(), PLACEHOLDER_CERT);
        assert!(!settings.publish);
    }

    #[test]
    fn loads_toml_settings() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let base = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");
        std::fs::write(
            base.join("hepscore.toml"),
            "site = \"CERN-T0\"\nexecutor = \"docker\"\nplugins = \"f,g\"\nsuite_version = \"3.1\"\n",
        )
        .expect("writing settings file must succeed");

        let settings = Settings::load(base, None).expect("loading settings must succeed");
        assert_eq!(settings.site, "CERN-T0");
        assert_eq!(settings.executor, "docker");
        assert_eq!(settings.plugins.as_deref(), Some("f,g"));
        assert_eq!(settings.suite_version, "3.1");
    }

    #[test]
    fn loads_yaml_settings_by_extension() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let base = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");
        let path = base.join("hepscore.yml");
        std::fs::write(&path, "site: GridKa\npublish: true\n").expect("writing settings file must succeed");

        let settings = Settings::load(base, Some(&path)).expect("loading settings must succeed");
        assert_eq!(settings.site, "GridKa");
        assert!(settings.publish);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let base = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");
        let path = base.join("hepscore.toml");
        std::fs::write(&path, "no_such_field = 1\n").expect("writing settings file must succeed");

        let result = Settings::load(base, Some(&path));
        let _ = result.unwrap_err();
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let base = Utf8Path::from_path(temp_dir.path()).expect("temp path must be UTF-8");
        let path = base.join("hepscore.ini");
        std::fs::write(&path, "[General]\n").expect("writing settings file must succeed");

        let result = Settings::load(base, Some(&path));
        let _ = result.unwrap_err();
    }

    #[test]
    fn explicit_workdir_wins_over_default() {
        let settings = Settings {
            workdir: Some(Utf8PathBuf::from("/scratch/bmk")),
            ..Settings::default()
        };
        assert_eq!(
            settings.workdir_or_default().expect("workdir must resolve"),
            Utf8PathBuf::from("/scratch/bmk")
        );
    }
}
