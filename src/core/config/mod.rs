//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment tokens (`GITHUB_API_TOKEN`, `GITLAB_API_TOKEN`), only for
//!    tokens the file leaves unset
//!
//! # Config Locations
//!
//! Searched in order by [`ScmConfig::load_default`]:
//! 1. `$SCMKIT_CONFIG` if set
//! 2. `<config_dir>/scmkit/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use scmkit::core::config::ScmConfig;
//!
//! let config = ScmConfig::load_default().unwrap();
//! println!("GitHub API: {}", config.github_api_base());
//! ```

pub mod schema;

pub use schema::{PlatformConfig, ResolveConfig, ScmConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::forge::ResolveOrder;
use schema::{DEFAULT_GITHUB_API_BASE, DEFAULT_GITLAB_API_BASE};

/// Environment variable holding the fallback GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_API_TOKEN";

/// Environment variable holding the fallback GitLab token.
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_API_TOKEN";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SCMKIT_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl ScmConfig {
    /// Defaults plus environment tokens.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.overlay_env_with(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML document. Environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for malformed TOML and `InvalidValue` for
    /// values that fail validation.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ScmConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file and overlay environment tokens.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::read_config(path)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.overlay_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from the first standard location that exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::from_env()),
        }
    }

    /// First candidate config path, if any can be determined.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("scmkit/config.toml"))
    }

    fn read_config(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: ScmConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fill unset tokens from an environment lookup.
    pub fn overlay_env_with(&mut self, get: impl Fn(&str) -> Option<String>) {
        if self.github.token.is_none() {
            self.github.token = get(GITHUB_TOKEN_ENV).filter(|t| !t.is_empty());
        }
        if self.gitlab.token.is_none() {
            self.gitlab.token = get(GITLAB_TOKEN_ENV).filter(|t| !t.is_empty());
        }
    }

    pub fn github_api_base(&self) -> String {
        self.github.api_base_or(DEFAULT_GITHUB_API_BASE)
    }

    pub fn gitlab_api_base(&self) -> String {
        self.gitlab.api_base_or(DEFAULT_GITLAB_API_BASE)
    }

    /// How the resolver settles ambiguous refs.
    pub fn resolve_order(&self) -> ResolveOrder {
        match &self.resolve.priority {
            Some(priority) => ResolveOrder::Priority(priority.clone()),
            None => ResolveOrder::Race,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ReferenceKind;
    use std::io::Write;

    #[test]
    fn parses_full_document() {
        let config = ScmConfig::from_toml_str(
            r#"
            [github]
            api_base = "https://github.example.com/api/v3/"
            token = "ghp_abc"

            [gitlab]
            token = "glpat-xyz"

            [resolve]
            priority = ["commit", "tag", "branch"]
            "#,
        )
        .unwrap();

        assert_eq!(config.github_api_base(), "https://github.example.com/api/v3");
        assert_eq!(config.gitlab_api_base(), DEFAULT_GITLAB_API_BASE);
        assert_eq!(config.github.token.as_deref(), Some("ghp_abc"));
        assert_eq!(
            config.resolve_order(),
            ResolveOrder::Priority(vec![
                ReferenceKind::Commit,
                ReferenceKind::Tag,
                ReferenceKind::Branch
            ])
        );
    }

    #[test]
    fn priority_accepts_uppercase_kinds() {
        let config = ScmConfig::from_toml_str(
            r#"
            [resolve]
            priority = ["TAG", "branch", "COMMIT"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.resolve_order(),
            ResolveOrder::Priority(vec![
                ReferenceKind::Tag,
                ReferenceKind::Branch,
                ReferenceKind::Commit
            ])
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = ScmConfig::from_toml_str("bogus = 1");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn default_resolve_order_is_race() {
        assert_eq!(ScmConfig::default().resolve_order(), ResolveOrder::Race);
    }

    #[test]
    fn env_overlay_fills_only_unset_tokens() {
        let mut config = ScmConfig::default();
        config.github.token = Some("from-file".into());
        config.overlay_env_with(|key| match key {
            GITHUB_TOKEN_ENV => Some("from-env-gh".into()),
            GITLAB_TOKEN_ENV => Some("from-env-gl".into()),
            _ => None,
        });

        assert_eq!(config.github.token.as_deref(), Some("from-file"));
        assert_eq!(config.gitlab.token.as_deref(), Some("from-env-gl"));
    }

    #[test]
    fn env_overlay_ignores_empty_values() {
        let mut config = ScmConfig::default();
        config.overlay_env_with(|_| Some(String::new()));
        assert!(config.github.token.is_none());
        assert!(config.gitlab.token.is_none());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gitlab]\napi_base = \"http://localhost:9999/api/v4\"").unwrap();

        let config = ScmConfig::load(file.path()).unwrap();
        assert_eq!(config.gitlab_api_base(), "http://localhost:9999/api/v4");
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScmConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.github_api_base(), DEFAULT_GITHUB_API_BASE);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[github\n").unwrap();

        match ScmConfig::load(file.path()) {
            Err(ConfigError::ParseError { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
