//! forge::url
//!
//! Repository URL parsing.
//!
//! Accepted shape: `http[s]://host/owner/repo[.git][/]`. Exactly one
//! trailing slash is stripped before matching, so `repo//` is malformed.
//! Scheme and `.git` suffix match case-insensitively; owner and repo keep
//! their case. No network access happens here.

use crate::core::types::RepoLocator;

use super::traits::ForgeError;

/// Parse a repository URL into its owner/repo pair.
///
/// # Errors
///
/// `InvalidUrlPattern` unless the path is exactly two non-empty segments.
///
/// # Example
///
/// ```
/// use scmkit::forge::parse_locator;
///
/// let locator = parse_locator("https://github.com/facebook/react/").unwrap();
/// assert_eq!(locator.owner, "facebook");
/// assert_eq!(locator.repo, "react");
///
/// assert!(parse_locator("https://invalid.com/facebook").is_err());
/// ```
pub fn parse_locator(url: &str) -> Result<RepoLocator, ForgeError> {
    match repo_path_segments(url).as_deref() {
        Some([owner, repo]) => Ok(RepoLocator {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => Err(invalid_pattern(url)),
    }
}

/// Parse a GitLab project URL, allowing nested groups.
///
/// All segments but the last form the namespace (`owner`).
///
/// ```
/// use scmkit::forge::parse_gitlab_locator;
///
/// let locator = parse_gitlab_locator("https://gitlab.com/group/subgroup/project.git").unwrap();
/// assert_eq!(locator.owner, "group/subgroup");
/// assert_eq!(locator.repo, "project");
/// ```
pub fn parse_gitlab_locator(url: &str) -> Result<RepoLocator, ForgeError> {
    match repo_path_segments(url).as_deref() {
        Some([namespace @ .., project]) if !namespace.is_empty() => Ok(RepoLocator {
            owner: namespace.join("/"),
            repo: project.to_string(),
        }),
        _ => Err(invalid_pattern(url)),
    }
}

fn invalid_pattern(url: &str) -> ForgeError {
    ForgeError::InvalidUrlPattern(format!("invalid repo Url {}", url.trim()))
}

/// Split the path of an http(s) URL into validated segments.
fn repo_path_segments(url: &str) -> Option<Vec<&str>> {
    let trimmed = url.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let rest = strip_http_scheme(trimmed)?;
    let (host, path) = rest.split_once('/')?;
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }

    let path = strip_git_suffix(path);
    let segments: Vec<&str> = path.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || s.chars().any(char::is_whitespace))
    {
        return None;
    }
    Some(segments)
}

/// Strip `http://` or `https://`, ignoring case.
pub(crate) fn strip_http_scheme(url: &str) -> Option<&str> {
    ["https://", "http://"].iter().find_map(|scheme| {
        url.get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .map(|_| &url[scheme.len()..])
    })
}

fn strip_git_suffix(path: &str) -> &str {
    let cut = path.len().saturating_sub(4);
    match path.get(cut..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(".git") => &path[..cut],
        _ => path,
    }
}
