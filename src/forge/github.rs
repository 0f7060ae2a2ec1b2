//! forge::github
//!
//! GitHub forge implementation using the REST and GraphQL APIs.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub. It uses:
//! - REST API for identity, repository, branch, ref, and pull request calls
//! - GraphQL API for blame ranges (REST has no blame endpoint)
//!
//! # Authentication
//!
//! The caller-supplied token drives both authentication and the local
//! preconditions (operations that need a token fail without one). A
//! fallback token from configuration authenticates requests when the
//! caller supplied none but never satisfies a precondition.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `ForgeError::RateLimited` when they are hit and never retries.
//!
//! # Example
//!
//! ```ignore
//! use scmkit::forge::github::GitHubForge;
//! use scmkit::forge::Forge;
//!
//! let forge = GitHubForge::new(
//!     Some("https://github.com/facebook/react".to_string()),
//!     Some("ghp_xxx".to_string()),
//! );
//! forge.validate_params().await?;
//! let head = forge.reference_data("main").await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::resolve::{resolve_reference, RefLookup, RefTarget, ResolveOrder};
use super::traits::{parse_submit_request_id, precondition, Forge, ForgeError};
use super::url::parse_locator;
use crate::core::config::schema::DEFAULT_GITHUB_API_BASE;
use crate::core::config::ScmConfig;
use crate::core::types::{
    BlameRange, ReferenceDescriptor, RepoLocator, RepoSummary, SubmitRequest, SubmitRequestStatus,
};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "scmkit";

const NO_TOKEN: &str = "no access token";
const NO_TOKEN_OR_URL: &str = "no access token or no url";
const NO_URL: &str = "no url";

/// Page size for the single repository listing page (GitHub maximum).
const REPO_PAGE_SIZE: &str = "100";

/// Page size for the single branch listing page.
const BRANCH_PAGE_SIZE: &str = "1000";

const BLAME_QUERY: &str = r#"
query GetBlame($owner: String!, $repo: String!, $ref: String!, $path: String!) {
  repository(name: $repo, owner: $owner) {
    object(expression: $ref) {
      ... on Commit {
        blame(path: $path) {
          ranges {
            startingLine
            endingLine
            commit {
              author {
                name
                email
                user {
                  name
                  login
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Repository URL as given by the caller, if any
    url: Option<String>,
    /// Caller-supplied token
    token: Option<String>,
    /// Token used for requests when the caller supplied none
    fallback_token: Option<String>,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    order: ResolveOrder,
}

// Custom Debug to avoid exposing tokens
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("url", &self.url)
            .field("has_token", &self.token.is_some())
            .field("has_fallback_token", &self.fallback_token.is_some())
            .field("api_base", &self.api_base)
            .field("order", &self.order)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge against the public API.
    ///
    /// Empty tokens are treated as absent.
    pub fn new(url: Option<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            token: token.filter(|t| !t.is_empty()),
            fallback_token: None,
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            order: ResolveOrder::default(),
        }
    }

    /// Create a GitHub forge whose endpoint, fallback token, and resolve
    /// order come from `config`.
    pub fn from_config(url: Option<String>, token: Option<String>, config: &ScmConfig) -> Self {
        let mut forge = Self::new(url, token).with_api_base(config.github_api_base());
        forge.fallback_token = config.github.token.clone().filter(|t| !t.is_empty());
        forge.order = config.resolve_order();
        forge
    }

    /// Use a custom API base URL (e.g., `https://github.example.com/api/v3`).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Settle ambiguous refs with `order` instead of the race.
    pub fn with_resolve_order(mut self, order: ResolveOrder) -> Self {
        self.order = order;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn request_token(&self) -> Option<&str> {
        self.token.as_deref().or(self.fallback_token.as_deref())
    }

    fn require_token(&self, operation: &str) -> Result<(), ForgeError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(precondition(operation, NO_TOKEN)),
        }
    }

    fn require_url(&self, operation: &str) -> Result<RepoLocator, ForgeError> {
        match &self.url {
            Some(url) => parse_locator(url),
            None => Err(precondition(operation, NO_URL)),
        }
    }

    fn require_token_and_url(&self, operation: &str) -> Result<RepoLocator, ForgeError> {
        match (&self.token, &self.url) {
            (Some(_), Some(url)) => parse_locator(url),
            _ => Err(precondition(operation, NO_TOKEN_OR_URL)),
        }
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = self.auth_headers()?;
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// API URL from raw segments; each segment is percent-encoded whole.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ForgeError> {
        let invalid = || ForgeError::Precondition(format!("invalid api base {}", self.api_base));
        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, locator: &RepoLocator, rest: &[&str]) -> Result<Url, ForgeError> {
        let mut segments = vec!["repos", locator.owner.as_str(), locator.repo.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    /// Build URL for a repository endpoint ending in a ref name.
    ///
    /// Slashes in `name` stay path separators (`feature/x` is two
    /// segments); every other reserved character is encoded.
    fn ref_url(&self, locator: &RepoLocator, kind: &[&str], name: &str) -> Result<Url, ForgeError> {
        let mut rest = kind.to_vec();
        rest.extend(name.split('/'));
        self.repo_url(locator, &rest)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, ForgeError> {
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .headers(self.headers()?)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };
        ForgeError::from_status(status, message)
    }

    async fn fetch_blame(
        &self,
        locator: &RepoLocator,
        reference: &str,
        path: &str,
    ) -> Result<Vec<BlameRange>, ForgeError> {
        let url = self.endpoint(&["graphql"])?;
        let body = serde_json::json!({
            "query": BLAME_QUERY,
            "variables": {
                "owner": locator.owner,
                "repo": locator.repo,
                "ref": reference,
                "path": path,
            }
        });

        tracing::debug!(url = %url, reference, path, "POST blame query");
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = self.error_from_response(response, status).await;
            tracing::warn!(error = %err, "blame query failed, reporting no ranges");
            return Ok(Vec::new());
        }

        let result: GraphQlResponse<BlameData> =
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse GraphQL response: {}", e),
            })?;

        let ranges = result
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.object)
            .and_then(|o| o.blame)
            .and_then(|b| b.ranges);

        Ok(ranges
            .unwrap_or_default()
            .into_iter()
            .map(BlameRange::from)
            .collect())
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    fn auth_headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.request_token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ForgeError::InvalidAccessToken("token is not a valid header value".into())
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn download_url(&self, sha: &str) -> Result<String, ForgeError> {
        match &self.url {
            Some(url) => Ok(format!("{}/zipball/{}", url, sha)),
            None => Err(precondition("download_url", NO_URL)),
        }
    }

    async fn username_for_auth_url(&self) -> Result<String, ForgeError> {
        self.username().await
    }

    async fn validate_params(&self) -> Result<(), ForgeError> {
        let outcome = async {
            if self.token.is_some() {
                self.get_json::<GitHubUser>(self.endpoint(&["user"])?, &[])
                    .await?;
            }
            if let Some(url) = &self.url {
                let locator = parse_locator(url)?;
                self.get_json::<GitHubRepo>(self.repo_url(&locator, &[])?, &[])
                    .await?;
            }
            Ok::<(), ForgeError>(())
        }
        .await;

        outcome.map_err(|e| e.into_validation_error("github", self.url.as_deref()))
    }

    async fn username(&self) -> Result<String, ForgeError> {
        self.require_token("username")?;
        let user: GitHubUser = self.get_json(self.endpoint(&["user"])?, &[]).await?;
        Ok(user.login)
    }

    async fn is_user_collaborator(&self, username: &str) -> Result<bool, ForgeError> {
        let locator = self.require_url("is_user_collaborator")?;

        let outcome = async {
            let url = self.repo_url(&locator, &["collaborators", username])?;
            tracing::debug!(url = %url, "GET");
            let response = self.client.get(url).headers(self.headers()?).send().await?;
            Ok::<_, ForgeError>(response.status())
        }
        .await;

        match outcome {
            Ok(status) => Ok(status == StatusCode::NO_CONTENT),
            Err(err) => {
                tracing::warn!(username, error = %err, "collaborator check failed");
                Ok(false)
            }
        }
    }

    async fn user_has_access_to_repo(&self) -> Result<bool, ForgeError> {
        self.require_token_and_url("user_has_access_to_repo")?;
        let username = self.username().await?;
        self.is_user_collaborator(&username).await
    }

    async fn is_remote_branch(&self, branch: &str) -> Result<bool, ForgeError> {
        let locator = self.require_token_and_url("is_remote_branch")?;
        let fetched = match self.ref_url(&locator, &["branches"], branch) {
            Ok(url) => self.get_json::<GitHubBranch>(url, &[]).await,
            Err(err) => Err(err),
        };

        match fetched {
            Ok(found) => Ok(found.name == branch),
            Err(err) => {
                tracing::warn!(branch, error = %err, "branch lookup failed");
                Ok(false)
            }
        }
    }

    async fn repo_list(&self) -> Result<Vec<RepoSummary>, ForgeError> {
        self.require_token("repo_list")?;
        let url = self.endpoint(&["user", "repos"])?;
        let query = [("sort", "updated"), ("per_page", REPO_PAGE_SIZE)];

        match self.get_json::<Vec<GitHubRepoListItem>>(url, &query).await {
            Ok(repos) => Ok(repos.into_iter().map(RepoSummary::from).collect()),
            Err(err) if err.is_unauthorized_or_missing() => {
                tracing::warn!(error = %err, "repository listing rejected, reporting none");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn branch_list(&self) -> Result<Vec<String>, ForgeError> {
        let locator = self.require_token_and_url("branch_list")?;
        let url = self.repo_url(&locator, &["branches"])?;
        let branches: Vec<GitHubBranchListItem> = self
            .get_json(url, &[("per_page", BRANCH_PAGE_SIZE), ("page", "1")])
            .await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn submit_request_status(&self, id: &str) -> Result<SubmitRequestStatus, ForgeError> {
        let locator = self.require_token_and_url("submit_request_status")?;
        let number = parse_submit_request_id(id)?.to_string();
        let url = self.repo_url(&locator, &["pulls", number.as_str()])?;
        let pr: GitHubPullRequest = self.get_json(url, &[]).await?;
        pr.status()
    }

    async fn create_submit_request(&self, request: SubmitRequest) -> Result<String, ForgeError> {
        let locator = self.require_token_and_url("create_submit_request")?;
        let url = self.repo_url(&locator, &["pulls"])?;

        let body = CreatePrBody {
            title: &request.title,
            body: &request.body,
            head: &request.source_branch,
            base: &request.target_branch,
            draft: false,
            maintainer_can_modify: true,
        };

        tracing::debug!(url = %url, head = body.head, base = body.base, "POST pull request");
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let created: GitHubCreatedPull = self.handle_response(response).await?;
        Ok(created.number.to_string())
    }

    async fn blame_ranges(
        &self,
        reference: &str,
        path: &str,
    ) -> Result<Vec<BlameRange>, ForgeError> {
        let locator = self.require_url("blame_ranges")?;
        self.fetch_blame(&locator, reference, path).await
    }

    async fn reference_data(&self, reference: &str) -> Result<ReferenceDescriptor, ForgeError> {
        let locator = self.require_url("reference_data")?;
        let refs = RepoRefs {
            forge: self,
            locator,
        };
        resolve_reference(&refs, reference, &self.order).await
    }

    async fn default_branch(&self) -> Result<String, ForgeError> {
        let locator = self.require_url("default_branch")?;
        let repo: GitHubRepo = self.get_json(self.repo_url(&locator, &[])?, &[]).await?;
        Ok(repo.default_branch)
    }
}

/// Ref lookups against one repository.
struct RepoRefs<'a> {
    forge: &'a GitHubForge,
    locator: RepoLocator,
}

impl RepoRefs<'_> {
    async fn commit(&self, sha: &str) -> Result<RefTarget, ForgeError> {
        let url = self
            .forge
            .repo_url(&self.locator, &["git", "commits", sha])?;
        let commit: GitHubGitCommit = self.forge.get_json(url, &[]).await?;
        Ok(RefTarget {
            sha: commit.sha,
            date: commit.committer.and_then(|c| c.date),
        })
    }
}

#[async_trait]
impl RefLookup for RepoRefs<'_> {
    async fn lookup_branch(&self, name: &str) -> Result<RefTarget, ForgeError> {
        let url = self.forge.ref_url(&self.locator, &["branches"], name)?;
        let branch: GitHubBranch = self.forge.get_json(url, &[]).await?;
        Ok(RefTarget {
            sha: branch.commit.sha,
            date: branch.commit.commit.and_then(|c| c.committer).and_then(|c| c.date),
        })
    }

    async fn lookup_commit(&self, sha: &str) -> Result<RefTarget, ForgeError> {
        self.commit(sha).await
    }

    async fn lookup_tag(&self, name: &str) -> Result<RefTarget, ForgeError> {
        let url = self
            .forge
            .ref_url(&self.locator, &["git", "ref", "tags"], name)?;
        let tag_ref: GitHubGitRef = self.forge.get_json(url, &[]).await?;

        if tag_ref.object.kind == "commit" {
            return self.commit(&tag_ref.object.sha).await;
        }

        let url = self
            .forge
            .repo_url(&self.locator, &["git", "tags", tag_ref.object.sha.as_str()])?;
        let tag: GitHubGitTag = self.forge.get_json(url, &[]).await?;
        Ok(RefTarget {
            sha: tag.sha,
            date: tag.tagger.and_then(|t| t.date),
        })
    }
}

// =============================================================================
// GitHub API Types
// =============================================================================

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
    draft: bool,
    maintainer_can_modify: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Deserialize)]
struct GitHubRepo {
    default_branch: String,
}

#[derive(Deserialize)]
struct GitHubRepoListItem {
    name: String,
    html_url: String,
    owner: GitHubOwner,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Deserialize)]
struct GitHubOwner {
    login: String,
}

impl From<GitHubRepoListItem> for RepoSummary {
    fn from(repo: GitHubRepoListItem) -> Self {
        RepoSummary {
            repo_name: repo.name,
            repo_url: repo.html_url,
            repo_owner: repo.owner.login,
            repo_languages: repo.language.into_iter().collect(),
            repo_is_public: !repo.private,
            repo_updated_at: repo.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct GitHubBranchListItem {
    name: String,
}

/// Branch with its head commit.
#[derive(Deserialize)]
struct GitHubBranch {
    name: String,
    commit: GitHubBranchCommit,
}

#[derive(Deserialize)]
struct GitHubBranchCommit {
    sha: String,
    #[serde(default)]
    commit: Option<GitHubCommitDetail>,
}

#[derive(Deserialize)]
struct GitHubCommitDetail {
    #[serde(default)]
    committer: Option<GitHubSignature>,
}

/// Author, committer, or tagger stamp.
#[derive(Deserialize)]
struct GitHubSignature {
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

/// Git database commit object.
#[derive(Deserialize)]
struct GitHubGitCommit {
    sha: String,
    #[serde(default)]
    committer: Option<GitHubSignature>,
}

#[derive(Deserialize)]
struct GitHubGitRef {
    object: GitHubGitObject,
}

#[derive(Deserialize)]
struct GitHubGitObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Annotated tag object.
#[derive(Deserialize)]
struct GitHubGitTag {
    sha: String,
    #[serde(default)]
    tagger: Option<GitHubSignature>,
}

#[derive(Deserialize)]
struct GitHubPullRequest {
    state: String,
    #[serde(default)]
    draft: Option<bool>,
    #[serde(default)]
    merged: Option<bool>,
}

impl GitHubPullRequest {
    fn status(&self) -> Result<SubmitRequestStatus, ForgeError> {
        if self.merged == Some(true) {
            return Ok(SubmitRequestStatus::Merged);
        }
        if self.draft == Some(true) {
            return Ok(SubmitRequestStatus::Draft);
        }
        match self.state.as_str() {
            "open" => Ok(SubmitRequestStatus::Open),
            "closed" => Ok(SubmitRequestStatus::Closed),
            other => Err(ForgeError::UnknownState(other.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct GitHubCreatedPull {
    number: u64,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct BlameData {
    repository: Option<BlameRepository>,
}

#[derive(Deserialize)]
struct BlameRepository {
    object: Option<BlameObject>,
}

#[derive(Deserialize)]
struct BlameObject {
    #[serde(default)]
    blame: Option<Blame>,
}

#[derive(Deserialize)]
struct Blame {
    ranges: Option<Vec<GitHubBlameRange>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GitHubBlameRange {
    starting_line: u32,
    ending_line: u32,
    commit: Option<BlameCommit>,
}

#[derive(Deserialize)]
struct BlameCommit {
    author: Option<BlameAuthor>,
}

#[derive(Deserialize)]
struct BlameAuthor {
    name: Option<String>,
    email: Option<String>,
    user: Option<BlameUser>,
}

#[derive(Deserialize)]
struct BlameUser {
    name: Option<String>,
    login: Option<String>,
}

impl From<GitHubBlameRange> for BlameRange {
    fn from(range: GitHubBlameRange) -> Self {
        let author = range.commit.and_then(|c| c.author);
        let (author_name, email, user) = match author {
            Some(a) => (a.name, a.email, a.user),
            None => (None, None, None),
        };
        let (user_name, login) = match user {
            Some(u) => (u.name, u.login),
            None => (None, None),
        };

        BlameRange {
            starting_line: range.starting_line,
            ending_line: range.ending_line,
            name: user_name.or(author_name).unwrap_or_default(),
            login: login.unwrap_or_default(),
            email: email.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod forge_creation {
        use super::*;

        #[test]
        fn new_uses_public_api() {
            let forge = GitHubForge::new(None, None);
            assert_eq!(forge.api_base, "https://api.github.com");
            assert_eq!(forge.name(), "github");
        }

        #[test]
        fn empty_token_is_absent() {
            let forge = GitHubForge::new(None, Some(String::new()));
            assert!(forge.token.is_none());
        }

        #[test]
        fn with_api_base_trims_slash() {
            let forge =
                GitHubForge::new(None, None).with_api_base("https://ghe.example.com/api/v3/");
            assert_eq!(forge.api_base, "https://ghe.example.com/api/v3");
        }

        #[test]
        fn from_config_picks_up_fallback_token() {
            let mut config = ScmConfig::default();
            config.github.token = Some("fallback".into());
            let forge = GitHubForge::from_config(None, None, &config);
            assert!(forge.token.is_none());
            assert_eq!(forge.request_token(), Some("fallback"));
        }

        #[test]
        fn debug_redacts_tokens() {
            let forge = GitHubForge::new(None, Some("ghp_secret".into()));
            let debug = format!("{:?}", forge);
            assert!(!debug.contains("ghp_secret"));
            assert!(debug.contains("has_token: true"));
        }
    }

    mod urls {
        use super::*;

        #[test]
        fn repo_url_format() {
            let forge = GitHubForge::new(None, None);
            let locator = parse_locator("https://github.com/facebook/react").unwrap();
            assert_eq!(
                forge.repo_url(&locator, &["pulls"]).unwrap().as_str(),
                "https://api.github.com/repos/facebook/react/pulls"
            );
            assert_eq!(
                forge.repo_url(&locator, &[]).unwrap().as_str(),
                "https://api.github.com/repos/facebook/react"
            );
        }

        #[test]
        fn ref_names_are_encoded_per_segment() {
            let forge = GitHubForge::new(None, None).with_api_base("http://localhost:9000/api/v3/");
            let locator = parse_locator("https://github.com/o/r").unwrap();
            assert_eq!(
                forge.ref_url(&locator, &["branches"], "fix#1").unwrap().as_str(),
                "http://localhost:9000/api/v3/repos/o/r/branches/fix%231"
            );
            assert_eq!(
                forge
                    .ref_url(&locator, &["git", "ref", "tags"], "release/100%")
                    .unwrap()
                    .as_str(),
                "http://localhost:9000/api/v3/repos/o/r/git/ref/tags/release/100%25"
            );
        }

        #[test]
        fn whole_segments_encode_slashes_and_queries() {
            let forge = GitHubForge::new(None, None);
            let locator = parse_locator("https://github.com/o/r").unwrap();
            assert_eq!(
                forge
                    .repo_url(&locator, &["git", "commits", "a/b?c"])
                    .unwrap()
                    .as_str(),
                "https://api.github.com/repos/o/r/git/commits/a%2Fb%3Fc"
            );
        }

        #[test]
        fn download_url_uses_zipball() {
            let forge = GitHubForge::new(Some("https://github.com/o/r".into()), None);
            assert_eq!(
                forge.download_url("abc").unwrap(),
                "https://github.com/o/r/zipball/abc"
            );
        }

        #[test]
        fn download_url_requires_url() {
            let forge = GitHubForge::new(None, None);
            assert_eq!(
                forge.download_url("abc"),
                Err(ForgeError::Precondition("no url".into()))
            );
        }
    }

    mod auth_headers {
        use super::*;

        #[test]
        fn bearer_when_token_present() {
            let forge = GitHubForge::new(None, Some("tok".into()));
            let headers = forge.auth_headers().unwrap();
            assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        }

        #[test]
        fn empty_without_token() {
            let forge = GitHubForge::new(None, None);
            assert!(forge.auth_headers().unwrap().is_empty());
        }

        #[test]
        fn rejects_unprintable_token() {
            let forge = GitHubForge::new(None, Some("bad\ntoken".into()));
            assert!(matches!(
                forge.auth_headers(),
                Err(ForgeError::InvalidAccessToken(_))
            ));
        }
    }

    mod pull_request_status {
        use super::*;

        fn pr(state: &str, draft: Option<bool>, merged: Option<bool>) -> GitHubPullRequest {
            GitHubPullRequest {
                state: state.to_string(),
                draft,
                merged,
            }
        }

        #[test]
        fn merged_wins_over_everything() {
            assert_eq!(
                pr("closed", Some(true), Some(true)).status().unwrap(),
                SubmitRequestStatus::Merged
            );
        }

        #[test]
        fn draft_wins_over_state() {
            assert_eq!(
                pr("open", Some(true), Some(false)).status().unwrap(),
                SubmitRequestStatus::Draft
            );
        }

        #[test]
        fn plain_states() {
            assert_eq!(pr("open", None, None).status().unwrap(), SubmitRequestStatus::Open);
            assert_eq!(
                pr("closed", Some(false), Some(false)).status().unwrap(),
                SubmitRequestStatus::Closed
            );
        }

        #[test]
        fn unknown_state_fails() {
            assert_eq!(
                pr("locked", None, None).status(),
                Err(ForgeError::UnknownState("locked".into()))
            );
        }
    }

    mod conversions {
        use super::*;

        #[test]
        fn repo_summary_from_listing() {
            let item: GitHubRepoListItem = serde_json::from_value(serde_json::json!({
                "name": "react",
                "html_url": "https://github.com/facebook/react",
                "owner": { "login": "facebook" },
                "private": false,
                "language": "JavaScript",
                "updated_at": "2023-02-20T21:16:23Z"
            }))
            .unwrap();

            let summary = RepoSummary::from(item);
            assert_eq!(summary.repo_name, "react");
            assert_eq!(summary.repo_owner, "facebook");
            assert_eq!(summary.repo_languages, vec!["JavaScript"]);
            assert!(summary.repo_is_public);
        }

        #[test]
        fn repo_summary_without_language() {
            let item: GitHubRepoListItem = serde_json::from_value(serde_json::json!({
                "name": "dotfiles",
                "html_url": "https://github.com/me/dotfiles",
                "owner": { "login": "me" },
                "private": true,
                "language": null
            }))
            .unwrap();

            let summary = RepoSummary::from(item);
            assert!(summary.repo_languages.is_empty());
            assert!(!summary.repo_is_public);
            assert_eq!(summary.repo_updated_at, "");
        }

        #[test]
        fn blame_range_prefers_user_name() {
            let range: GitHubBlameRange = serde_json::from_value(serde_json::json!({
                "startingLine": 1,
                "endingLine": 4,
                "commit": { "author": {
                    "name": "git name",
                    "email": "dev@example.com",
                    "user": { "name": "Profile Name", "login": "dev" }
                }}
            }))
            .unwrap();

            let blame = BlameRange::from(range);
            assert_eq!((blame.starting_line, blame.ending_line), (1, 4));
            assert_eq!(blame.name, "Profile Name");
            assert_eq!(blame.login, "dev");
            assert_eq!(blame.email, "dev@example.com");
        }

        #[test]
        fn blame_range_without_linked_user() {
            let range: GitHubBlameRange = serde_json::from_value(serde_json::json!({
                "startingLine": 5,
                "endingLine": 5,
                "commit": { "author": { "name": "git name", "email": "x@y", "user": null } }
            }))
            .unwrap();

            let blame = BlameRange::from(range);
            assert_eq!(blame.name, "git name");
            assert_eq!(blame.login, "");
        }
    }
}
