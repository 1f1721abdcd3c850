//! Runner configuration file.
//!
//! The controller drops a small JSON file on the node describing where to
//! report and how to sign requests:
//!
//! ```json
//! {
//!   "url": "http://controller:5240/MAAS/metadata/latest/",
//!   "credentials": "consumer_key:token_key:token_secret",
//!   "timeout_secs": 30
//! }
//! ```

use crate::fetcher::DEFAULT_BUNDLE_PATH;
use crate::signing::Credentials;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_bundle_path() -> String {
    DEFAULT_BUNDLE_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Controller metadata URL; signals are posted here
    pub url: String,

    /// `consumer_key:token_key:token_secret`
    pub credentials: String,

    /// Bundle location, relative to `url` or absolute
    #[serde(default = "default_bundle_path")]
    pub bundle_path: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extraction directory; a fresh temporary one when unset
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,

    /// Output capture directory; a fresh temporary one when unset
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn new(url: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: credentials.into(),
            bundle_path: default_bundle_path(),
            timeout_secs: default_timeout_secs(),
            scripts_dir: None,
            out_dir: None,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            anyhow::bail!("Controller url must be specified");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("Controller url must use http or https: {}", url);
        }

        self.parsed_credentials()?;

        if self.bundle_path.trim().is_empty() {
            anyhow::bail!("Bundle path must not be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("Timeout must be at least one second");
        }
        if let (Some(scripts), Some(out)) = (&self.scripts_dir, &self.out_dir) {
            if scripts == out {
                anyhow::bail!(
                    "Scripts and output directories must differ: {}",
                    scripts.display()
                );
            }
        }
        Ok(())
    }

    pub fn parsed_credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.parse::<Credentials>()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.json");
        fs::write(
            &path,
            r#"{"url": "http://maas:5240/MAAS/metadata/", "credentials": "a:b:c"}"#,
        )
        .unwrap();

        let config = RunnerConfig::load_from_file(&path).unwrap();

        assert_eq!(config.bundle_path, "maas-scripts/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.scripts_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunnerConfig::new("", "a:b:c").validate().is_err());
        assert!(RunnerConfig::new("ftp://maas/", "a:b:c").validate().is_err());
        assert!(RunnerConfig::new("http://maas/", "a:b").validate().is_err());

        let mut config = RunnerConfig::new("http://maas/", "a:b:c");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shared_run_directory() {
        let mut config = RunnerConfig::new("http://maas/", "a:b:c");
        config.scripts_dir = Some(PathBuf::from("/var/tmp/run"));
        config.out_dir = Some(PathBuf::from("/var/tmp/run/"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));

        config.out_dir = Some(PathBuf::from("/var/tmp/run/out"));
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = RunnerConfig::load_from_file("/nonexistent/runner.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration"));
    }
}
