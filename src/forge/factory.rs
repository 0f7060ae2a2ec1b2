//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Provider Detection
//!
//! Detection is a pure prefix match against the public hosts only:
//! - `https://github.com/` → `GitHubForge`
//! - `https://gitlab.com/` → `GitLabForge`
//!
//! Anything else (self-hosted instances included) selects no platform,
//! which [`create_forge`] turns into the [`StubForge`]. Self-hosted
//! instances are reached by passing the kind explicitly.
//!
//! # Example
//!
//! ```
//! use scmkit::forge::{scm_kind_from_url, ScmKind};
//!
//! assert_eq!(
//!     scm_kind_from_url(Some("https://GitHub.com/facebook/react")),
//!     Some(ScmKind::GitHub)
//! );
//! assert_eq!(scm_kind_from_url(Some("https://github.example.com/o/r")), None);
//! ```

use serde::{Deserialize, Serialize};

use super::github::GitHubForge;
use super::gitlab::GitLabForge;
use super::stub::StubForge;
use super::traits::Forge;
use crate::core::config::ScmConfig;

const GITHUB_PREFIX: &str = "https://github.com/";
const GITLAB_PREFIX: &str = "https://gitlab.com/";

/// Supported hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScmKind {
    GitHub,
    GitLab,
}

impl ScmKind {
    /// Get all supported platforms.
    pub fn all() -> &'static [ScmKind] {
        &[ScmKind::GitHub, ScmKind::GitLab]
    }

    /// Get the platform name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            ScmKind::GitHub => "github",
            ScmKind::GitLab => "gitlab",
        }
    }

    /// Parse a platform from a string, ignoring case.
    ///
    /// ```
    /// use scmkit::forge::ScmKind;
    ///
    /// assert_eq!(ScmKind::parse("GITLAB"), Some(ScmKind::GitLab));
    /// assert_eq!(ScmKind::parse("bitbucket"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(ScmKind::GitHub),
            "gitlab" => Some(ScmKind::GitLab),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the platform from a repository URL.
///
/// `None` for a missing URL or any host other than the public
/// github.com / gitlab.com.
pub fn scm_kind_from_url(url: Option<&str>) -> Option<ScmKind> {
    let url = url?.to_lowercase();
    if url.starts_with(GITLAB_PREFIX) {
        return Some(ScmKind::GitLab);
    }
    if url.starts_with(GITHUB_PREFIX) {
        return Some(ScmKind::GitHub);
    }
    None
}

/// Create the forge for `kind`, or the stub when no platform is known.
///
/// No network access happens here; see [`Forge::validate_params`].
pub fn create_forge(
    kind: Option<ScmKind>,
    url: Option<String>,
    token: Option<String>,
    config: &ScmConfig,
) -> Box<dyn Forge> {
    match kind {
        Some(ScmKind::GitHub) => Box::new(GitHubForge::from_config(url, token, config)),
        Some(ScmKind::GitLab) => Box::new(GitLabForge::from_config(url, token, config)),
        None => Box::new(StubForge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod scm_kind {
        use super::*;

        #[test]
        fn all_lists_both() {
            assert_eq!(ScmKind::all(), &[ScmKind::GitHub, ScmKind::GitLab]);
        }

        #[test]
        fn parse_ignores_case() {
            assert_eq!(ScmKind::parse("GitHub"), Some(ScmKind::GitHub));
            assert_eq!(ScmKind::parse("gitlab"), Some(ScmKind::GitLab));
            assert_eq!(ScmKind::parse(""), None);
        }

        #[test]
        fn display() {
            assert_eq!(ScmKind::GitLab.to_string(), "gitlab");
        }

        #[test]
        fn serde_uses_uppercase() {
            assert_eq!(serde_json::to_string(&ScmKind::GitHub).unwrap(), "\"GITHUB\"");
            let kind: ScmKind = serde_json::from_str("\"GITLAB\"").unwrap();
            assert_eq!(kind, ScmKind::GitLab);
        }
    }

    mod scm_kind_from_url {
        use super::*;

        #[test]
        fn public_hosts() {
            assert_eq!(
                scm_kind_from_url(Some("https://github.com/o/r")),
                Some(ScmKind::GitHub)
            );
            assert_eq!(
                scm_kind_from_url(Some("https://gitlab.com/g/p")),
                Some(ScmKind::GitLab)
            );
        }

        #[test]
        fn case_insensitive() {
            assert_eq!(
                scm_kind_from_url(Some("HTTPS://GITLAB.COM/g/p")),
                Some(ScmKind::GitLab)
            );
        }

        #[test]
        fn requires_exact_prefix() {
            assert_eq!(scm_kind_from_url(Some("http://github.com/o/r")), None);
            assert_eq!(scm_kind_from_url(Some("https://github.com")), None);
            assert_eq!(scm_kind_from_url(Some("https://gitlab.example.com/g/p")), None);
            assert_eq!(scm_kind_from_url(Some("https://bitbucket.org/o/r")), None);
        }

        #[test]
        fn missing_url() {
            assert_eq!(scm_kind_from_url(None), None);
            assert_eq!(scm_kind_from_url(Some("")), None);
        }
    }

    mod create_forge {
        use super::*;

        #[test]
        fn selects_by_kind() {
            let config = ScmConfig::default();
            assert_eq!(
                create_forge(Some(ScmKind::GitHub), None, None, &config).name(),
                "github"
            );
            assert_eq!(
                create_forge(Some(ScmKind::GitLab), None, None, &config).name(),
                "gitlab"
            );
            assert_eq!(create_forge(None, None, None, &config).name(), "stub");
        }
    }
}
