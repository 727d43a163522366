//! Configuration loading and ruleset access for Gutter.
//!
//! The plugin reads one TOML file under the user config dir:
//!
//! ```toml
//! [ruleset]
//! url = "file:///home/dev/team/ruleset.xml"
//!
//! [audit]
//! timeout_secs = 10
//! ```
//!
//! Raw TOML structs (with `Option` fields) stay private; [`GutterConfig`]
//! is the resolved form handed to the rest of the plugin. Ruleset *content*
//! is re-read from the configured URL on every audit — the ruleset file may
//! change between runs and the overlay deliberately does not cache it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gutter_audit::RulesetProvider;
use serde::Deserialize;
use url::Url;

/// Default bound on a single audit run.
const DEFAULT_AUDIT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid ruleset url `{value}`: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported ruleset url scheme `{scheme}` (only `file` is supported)")]
    UnsupportedScheme { scheme: String },
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    ruleset: RawRulesetSection,
    #[serde(default)]
    audit: RawAuditSection,
}

#[derive(Debug, Default, Deserialize)]
struct RawRulesetSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuditSection {
    timeout_secs: Option<u64>,
}

/// Resolved plugin configuration.
#[derive(Debug, Clone)]
pub struct GutterConfig {
    ruleset_url: Option<Url>,
    audit_timeout: Duration,
}

impl Default for GutterConfig {
    fn default() -> Self {
        Self {
            ruleset_url: None,
            audit_timeout: Duration::from_secs(DEFAULT_AUDIT_TIMEOUT_SECS),
        }
    }
}

impl GutterConfig {
    /// Load from the default location; a missing file yields the defaults
    /// (no ruleset configured, so audits run with the engine default).
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&text)?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self, ConfigError> {
        let ruleset_url = match raw.ruleset.url {
            None => None,
            Some(value) => {
                let url = Url::parse(&value).map_err(|source| ConfigError::InvalidUrl {
                    value: value.clone(),
                    source,
                })?;
                if url.scheme() != "file" {
                    return Err(ConfigError::UnsupportedScheme {
                        scheme: url.scheme().to_string(),
                    });
                }
                Some(url)
            }
        };

        let audit_timeout = Duration::from_secs(
            raw.audit.timeout_secs.unwrap_or(DEFAULT_AUDIT_TIMEOUT_SECS),
        );

        Ok(Self {
            ruleset_url,
            audit_timeout,
        })
    }

    #[must_use]
    pub fn ruleset_url(&self) -> Option<&Url> {
        self.ruleset_url.as_ref()
    }

    #[must_use]
    pub fn audit_timeout(&self) -> Duration {
        self.audit_timeout
    }
}

/// Location of the plugin config file, when a user config dir exists.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gutter").join("config.toml"))
}

/// File-backed [`RulesetProvider`].
///
/// Re-reads the configured ruleset file on every call so edits take effect
/// on the next audit. Unreadable content is logged and reported as absent,
/// which downgrades the audit to the engine default ruleset rather than
/// failing it.
pub struct FileRulesetProvider {
    config: Arc<GutterConfig>,
}

impl FileRulesetProvider {
    #[must_use]
    pub fn new(config: Arc<GutterConfig>) -> Self {
        Self { config }
    }
}

impl RulesetProvider for FileRulesetProvider {
    fn current_ruleset_url(&self) -> Option<Url> {
        self.config.ruleset_url().cloned()
    }

    fn current_ruleset_content(&self) -> Option<String> {
        let url = self.config.ruleset_url()?;
        let path = match url.to_file_path() {
            Ok(path) => path,
            Err(()) => {
                tracing::warn!(url = url.as_str(), "ruleset url is not a usable file path");
                return None;
            }
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot read ruleset file; falling back to engine default"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gutter_audit::RulesetProvider as _;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");
        let config = GutterConfig::load_from(&path).unwrap();
        assert!(config.ruleset_url().is_none());
        assert_eq!(config.audit_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn full_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[ruleset]\nurl = \"file:///team/ruleset.xml\"\n\n[audit]\ntimeout_secs = 3\n",
        );
        let config = GutterConfig::load_from(&path).unwrap();
        assert_eq!(
            config.ruleset_url().unwrap().as_str(),
            "file:///team/ruleset.xml"
        );
        assert_eq!(config.audit_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[ruleset\nurl=3");
        assert!(matches!(
            GutterConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_unparsable_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[ruleset]\nurl = \"not a url\"\n");
        assert!(matches!(
            GutterConfig::load_from(&path),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn rejects_non_file_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[ruleset]\nurl = \"https://example.com/rules.xml\"\n");
        match GutterConfig::load_from(&path) {
            Err(ConfigError::UnsupportedScheme { scheme }) => assert_eq!(scheme, "https"),
            other => panic!("expected UnsupportedScheme, got {other:?}"),
        }
    }

    #[test]
    fn missing_config_file_reports_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            GutterConfig::load_from(&path),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn provider_reads_ruleset_content() {
        let dir = tempfile::tempdir().unwrap();
        let ruleset_path = dir.path().join("ruleset.xml");
        std::fs::write(&ruleset_path, "<ruleset name=\"t\"/>").unwrap();
        let url = Url::from_file_path(&ruleset_path).unwrap();

        let config_path = write_config(&dir, &format!("[ruleset]\nurl = \"{url}\"\n"));
        let config = Arc::new(GutterConfig::load_from(&config_path).unwrap());
        let provider = FileRulesetProvider::new(config);

        assert_eq!(provider.current_ruleset_url().unwrap(), url);
        let source = provider.current_source().unwrap();
        assert_eq!(source.content, "<ruleset name=\"t\"/>");
        assert_eq!(source.url.unwrap(), url);
    }

    #[test]
    fn provider_treats_unreadable_ruleset_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.xml");
        let url = Url::from_file_path(&missing).unwrap();

        let config_path = write_config(&dir, &format!("[ruleset]\nurl = \"{url}\"\n"));
        let config = Arc::new(GutterConfig::load_from(&config_path).unwrap());
        let provider = FileRulesetProvider::new(config);

        assert!(provider.current_ruleset_content().is_none());
        assert!(provider.current_source().is_none());
    }

    #[test]
    fn provider_without_configured_url_is_absent() {
        let provider = FileRulesetProvider::new(Arc::new(GutterConfig::default()));
        assert!(provider.current_ruleset_url().is_none());
        assert!(provider.current_source().is_none());
    }
}
