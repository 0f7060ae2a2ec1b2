//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [github]
//! api_base = "https://github.example.com/api/v3"
//!
//! [gitlab]
//! token = "glpat-xxx"
//!
//! [resolve]
//! priority = ["commit", "tag", "branch"]
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::ReferenceKind;

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Default GitLab REST API base URL.
pub const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScmConfig {
    pub github: PlatformConfig,
    pub gitlab: PlatformConfig,
    pub resolve: ResolveConfig,
}

/// Per-platform endpoint and fallback credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// API base URL override
    pub api_base: Option<String>,

    /// Token used for requests when the caller supplies none
    pub token: Option<String>,
}

/// Reference resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Explicit kind priority. Unset means the first lookup to succeed wins.
    pub priority: Option<Vec<ReferenceKind>>,
}

impl ScmConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, platform) in [("github", &self.github), ("gitlab", &self.gitlab)] {
            if let Some(base) = &platform.api_base {
                let lower = base.to_ascii_lowercase();
                if !lower.starts_with("http://") && !lower.starts_with("https://") {
                    return Err(ConfigError::InvalidValue(format!(
                        "{name}.api_base must be an http(s) URL, got '{base}'"
                    )));
                }
            }
        }

        if let Some(priority) = &self.resolve.priority {
            let mut seen = Vec::with_capacity(3);
            for kind in priority {
                if seen.contains(kind) {
                    return Err(ConfigError::InvalidValue(format!(
                        "resolve.priority lists '{kind}' more than once"
                    )));
                }
                seen.push(*kind);
            }
            if seen.len() != 3 {
                return Err(ConfigError::InvalidValue(
                    "resolve.priority must list branch, commit and tag".into(),
                ));
            }
        }

        Ok(())
    }
}

impl PlatformConfig {
    /// API base with any trailing slash removed.
    pub fn api_base_or(&self, default: &str) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ScmConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_api_base() {
        let mut config = ScmConfig::default();
        config.github.api_base = Some("ftp://example.com".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn rejects_duplicate_priority() {
        let mut config = ScmConfig::default();
        config.resolve.priority = Some(vec![
            ReferenceKind::Commit,
            ReferenceKind::Commit,
            ReferenceKind::Tag,
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_incomplete_priority() {
        let mut config = ScmConfig::default();
        config.resolve.priority = Some(vec![ReferenceKind::Commit]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_base_or_strips_trailing_slash() {
        let platform = PlatformConfig {
            api_base: Some("http://localhost:1234/".into()),
            token: None,
        };
        assert_eq!(
            platform.api_base_or(DEFAULT_GITHUB_API_BASE),
            "http://localhost:1234"
        );
        assert_eq!(
            PlatformConfig::default().api_base_or(DEFAULT_GITLAB_API_BASE),
            DEFAULT_GITLAB_API_BASE
        );
    }
}
