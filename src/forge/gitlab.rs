//! forge::gitlab
//!
//! GitLab forge implementation using the REST v4 API.
//!
//! # Design
//!
//! Projects are addressed by their URL-encoded full path
//! (`group%2Fsubgroup%2Fproject`), so nested groups work without a
//! lookup of the numeric project id. Every path segment that carries
//! caller input (branch, tag, file path) is percent-encoded the same way.
//!
//! # Authentication
//!
//! Personal access tokens (`glpat-` prefix) are sent in the `PRIVATE-TOKEN`
//! header; any other token is sent as `Authorization: Bearer`. Clone URLs
//! use the username `oauth2` unless the token is a personal access token,
//! in which case the token owner's username is fetched.
//!
//! # Example
//!
//! ```ignore
//! use scmkit::forge::gitlab::GitLabForge;
//! use scmkit::forge::Forge;
//!
//! let forge = GitLabForge::new(
//!     Some("https://gitlab.com/group/project".to_string()),
//!     Some("glpat-xxx".to_string()),
//! );
//! let branches = forge.branch_list().await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::resolve::{resolve_reference, RefLookup, RefTarget, ResolveOrder};
use super::traits::{parse_submit_request_id, precondition, Forge, ForgeError};
use super::url::parse_gitlab_locator;
use crate::core::config::schema::DEFAULT_GITLAB_API_BASE;
use crate::core::config::ScmConfig;
use crate::core::types::{
    BlameRange, ReferenceDescriptor, RepoLocator, RepoSummary, SubmitRequest, SubmitRequestStatus,
};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "scmkit";

/// Prefix of GitLab personal access tokens.
const PERSONAL_TOKEN_PREFIX: &str = "glpat-";

const PRIVATE_TOKEN_HEADER: &str = "private-token";

/// Clone-URL username for OAuth and project tokens.
const OAUTH_USERNAME: &str = "oauth2";

const NO_TOKEN: &str = "no access token";
const NO_TOKEN_OR_URL: &str = "no access token or no url";
const NO_URL: &str = "no url";

const REPO_PAGE_SIZE: &str = "100";
const BRANCH_PAGE_SIZE: &str = "1000";

/// GitLab forge implementation.
pub struct GitLabForge {
    /// HTTP client for making requests
    client: Client,
    /// Project URL as given by the caller, if any
    url: Option<String>,
    /// Caller-supplied token
    token: Option<String>,
    /// Token used for requests when the caller supplied none
    fallback_token: Option<String>,
    /// API base URL (for self-hosted instances)
    api_base: String,
    order: ResolveOrder,
}

// Custom Debug to avoid exposing tokens
impl std::fmt::Debug for GitLabForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabForge")
            .field("url", &self.url)
            .field("has_token", &self.token.is_some())
            .field("has_fallback_token", &self.fallback_token.is_some())
            .field("api_base", &self.api_base)
            .field("order", &self.order)
            .finish()
    }
}

impl GitLabForge {
    /// Create a GitLab forge against gitlab.com.
    ///
    /// Empty tokens are treated as absent.
    pub fn new(url: Option<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            token: token.filter(|t| !t.is_empty()),
            fallback_token: None,
            api_base: DEFAULT_GITLAB_API_BASE.to_string(),
            order: ResolveOrder::default(),
        }
    }

    /// Create a GitLab forge whose endpoint, fallback token, and resolve
    /// order come from `config`.
    pub fn from_config(url: Option<String>, token: Option<String>, config: &ScmConfig) -> Self {
        let mut forge = Self::new(url, token).with_api_base(config.gitlab_api_base());
        forge.fallback_token = config.gitlab.token.clone().filter(|t| !t.is_empty());
        forge.order = config.resolve_order();
        forge
    }

    /// Use a custom API base URL (e.g., `https://gitlab.example.com/api/v4`).
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

    fn has_personal_token(&self) -> bool {
        self.token
            .as_deref()
            .is_some_and(|t| t.starts_with(PERSONAL_TOKEN_PREFIX))
    }

    fn require_token(&self, operation: &str) -> Result<(), ForgeError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(precondition(operation, NO_TOKEN)),
        }
    }

    fn require_url(&self, operation: &str) -> Result<RepoLocator, ForgeError> {
        match &self.url {
            Some(url) => parse_gitlab_locator(url),
            None => Err(precondition(operation, NO_URL)),
        }
    }

    fn require_token_and_url(&self, operation: &str) -> Result<RepoLocator, ForgeError> {
        match (&self.token, &self.url) {
            (Some(_), Some(url)) => parse_gitlab_locator(url),
            _ => Err(precondition(operation, NO_TOKEN_OR_URL)),
        }
    }

    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = self.auth_headers()?;
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
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

    /// Build URL for a project endpoint.
    fn project_url(&self, locator: &RepoLocator, rest: &[&str]) -> Result<Url, ForgeError> {
        let id = locator.full_path();
        let mut segments = vec!["projects", id.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
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

    /// GitLab reports errors as `{"message": ...}` or `{"error": ...}`,
    /// where `message` may itself be an object of field errors.
    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => match body.get("message").or_else(|| body.get("error")) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "Unknown error".to_string(),
            },
            Err(_) => "Unknown error".to_string(),
        };
        ForgeError::from_status(status, message)
    }

    /// Languages of a project ordered by share, most used first.
    async fn languages(&self, project_id: u64) -> Vec<String> {
        let id = project_id.to_string();
        let fetched = match self.endpoint(&["projects", id.as_str(), "languages"]) {
            Ok(url) => self.get_json::<HashMap<String, f64>>(url, &[]).await,
            Err(err) => Err(err),
        };

        match fetched {
            Ok(shares) => {
                let mut shares: Vec<(String, f64)> = shares.into_iter().collect();
                shares.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                shares.into_iter().map(|(name, _)| name).collect()
            }
            Err(err) => {
                tracing::warn!(project_id, error = %err, "language lookup failed");
                Vec::new()
            }
        }
    }

    async fn collaborator_check(
        &self,
        locator: &RepoLocator,
        username: &str,
    ) -> Result<bool, ForgeError> {
        let users: Vec<GitLabUserRef> = self
            .get_json(self.endpoint(&["users"])?, &[("username", username)])
            .await?;
        let Some(user) = users.first() else {
            return Ok(false);
        };

        let user_id = user.id.to_string();
        let url = self.project_url(locator, &["members", "all", user_id.as_str()])?;
        self.get_json::<GitLabMember>(url, &[]).await?;
        Ok(true)
    }
}

#[async_trait]
impl Forge for GitLabForge {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn auth_headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let Some(token) = self.request_token() else {
            return Ok(headers);
        };

        let invalid =
            |_| ForgeError::InvalidAccessToken("token is not a valid header value".into());
        if token.starts_with(PERSONAL_TOKEN_PREFIX) {
            headers.insert(
                PRIVATE_TOKEN_HEADER,
                HeaderValue::from_str(token).map_err(invalid)?,
            );
        } else {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid)?,
            );
        }
        Ok(headers)
    }

    fn download_url(&self, sha: &str) -> Result<String, ForgeError> {
        let Some(url) = &self.url else {
            return Err(precondition("download_url", NO_URL));
        };
        let name = url.rsplit('/').next().unwrap_or_default();
        Ok(format!("{}/-/archive/{}/{}-{}.zip", url, sha, name, sha))
    }

    async fn username_for_auth_url(&self) -> Result<String, ForgeError> {
        if self.has_personal_token() {
            self.username().await
        } else {
            Ok(OAUTH_USERNAME.to_string())
        }
    }

    async fn validate_params(&self) -> Result<(), ForgeError> {
        let outcome = async {
            if self.token.is_some() {
                self.get_json::<GitLabUser>(self.endpoint(&["user"])?, &[])
                    .await?;
            }
            if let Some(url) = &self.url {
                let locator = parse_gitlab_locator(url)?;
                self.get_json::<GitLabProject>(self.project_url(&locator, &[])?, &[])
                    .await?;
            }
            Ok::<(), ForgeError>(())
        }
        .await;

        outcome.map_err(|e| e.into_validation_error("gitlab", self.url.as_deref()))
    }

    async fn username(&self) -> Result<String, ForgeError> {
        self.require_token("username")?;
        let user: GitLabUser = self.get_json(self.endpoint(&["user"])?, &[]).await?;
        Ok(user.username)
    }

    async fn is_user_collaborator(&self, username: &str) -> Result<bool, ForgeError> {
        let locator = self.require_url("is_user_collaborator")?;
        match self.collaborator_check(&locator, username).await {
            Ok(found) => Ok(found),
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
        let fetched = match self.project_url(&locator, &["repository", "branches", branch]) {
            Ok(url) => self.get_json::<GitLabBranch>(url, &[]).await,
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
        let query = [
            ("membership", "true"),
            ("order_by", "last_activity_at"),
            ("per_page", REPO_PAGE_SIZE),
        ];

        let projects = match self
            .get_json::<Vec<GitLabProjectListItem>>(self.endpoint(&["projects"])?, &query)
            .await
        {
            Ok(projects) => projects,
            Err(err) if err.is_unauthorized_or_missing() => {
                tracing::warn!(error = %err, "project listing rejected, reporting none");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let languages = future::join_all(projects.iter().map(|p| self.languages(p.id))).await;

        Ok(projects
            .into_iter()
            .zip(languages)
            .map(|(project, languages)| project.into_summary(languages))
            .collect())
    }

    async fn branch_list(&self) -> Result<Vec<String>, ForgeError> {
        let locator = self.require_token_and_url("branch_list")?;
        let url = self.project_url(&locator, &["repository", "branches"])?;
        let branches: Vec<GitLabBranch> = self
            .get_json(url, &[("per_page", BRANCH_PAGE_SIZE), ("page", "1")])
            .await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn submit_request_status(&self, id: &str) -> Result<SubmitRequestStatus, ForgeError> {
        let locator = self.require_token_and_url("submit_request_status")?;
        let iid = parse_submit_request_id(id)?.to_string();
        let url = self.project_url(&locator, &["merge_requests", iid.as_str()])?;
        let mr: GitLabMergeRequest = self.get_json(url, &[]).await?;
        mr.status()
    }

    async fn create_submit_request(&self, request: SubmitRequest) -> Result<String, ForgeError> {
        let locator = self.require_token_and_url("create_submit_request")?;
        let url = self.project_url(&locator, &["merge_requests"])?;

        let body = CreateMrBody {
            source_branch: &request.source_branch,
            target_branch: &request.target_branch,
            title: &request.title,
            description: &request.body,
        };

        tracing::debug!(
            url = %url,
            source = body.source_branch,
            target = body.target_branch,
            "POST merge request"
        );
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let created: GitLabCreatedMr = self.handle_response(response).await?;
        Ok(created.iid.to_string())
    }

    async fn blame_ranges(
        &self,
        reference: &str,
        path: &str,
    ) -> Result<Vec<BlameRange>, ForgeError> {
        let locator = self.require_url("blame_ranges")?;
        let url = self.project_url(&locator, &["repository", "files", path, "blame"])?;

        match self
            .get_json::<Vec<GitLabBlameEntry>>(url, &[("ref", reference)])
            .await
        {
            Ok(entries) => Ok(blame_ranges_from_entries(entries)),
            Err(ForgeError::NotFound(message)) => {
                tracing::warn!(reference, path, %message, "no blame data");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn reference_data(&self, reference: &str) -> Result<ReferenceDescriptor, ForgeError> {
        let locator = self.require_url("reference_data")?;
        let refs = ProjectRefs {
            forge: self,
            locator,
        };
        resolve_reference(&refs, reference, &self.order).await
    }

    async fn default_branch(&self) -> Result<String, ForgeError> {
        let locator = self.require_url("default_branch")?;
        let project: GitLabProject = self
            .get_json(self.project_url(&locator, &[])?, &[])
            .await?;
        project.default_branch.ok_or_else(|| {
            ForgeError::NotFound(format!("{} has no default branch", locator.full_path()))
        })
    }
}

/// Turn GitLab's line-grouped blame into numbered ranges.
fn blame_ranges_from_entries(entries: Vec<GitLabBlameEntry>) -> Vec<BlameRange> {
    let mut next_line: u32 = 1;
    let mut ranges = Vec::with_capacity(entries.len());

    for entry in entries {
        let count = u32::try_from(entry.lines.len()).unwrap_or(u32::MAX);
        if count == 0 {
            continue;
        }
        let starting_line = next_line;
        next_line = next_line.saturating_add(count);

        ranges.push(BlameRange {
            starting_line,
            ending_line: next_line - 1,
            name: entry.commit.author_name.clone(),
            login: entry.commit.author_email.clone(),
            email: entry.commit.author_email,
        });
    }
    ranges
}

/// Ref lookups against one project.
struct ProjectRefs<'a> {
    forge: &'a GitLabForge,
    locator: RepoLocator,
}

#[async_trait]
impl RefLookup for ProjectRefs<'_> {
    async fn lookup_branch(&self, name: &str) -> Result<RefTarget, ForgeError> {
        let url = self
            .forge
            .project_url(&self.locator, &["repository", "branches", name])?;
        let branch: GitLabBranch = self.forge.get_json(url, &[]).await?;
        Ok(branch.commit.into())
    }

    async fn lookup_commit(&self, sha: &str) -> Result<RefTarget, ForgeError> {
        let url = self
            .forge
            .project_url(&self.locator, &["repository", "commits", sha])?;
        let commit: GitLabCommit = self.forge.get_json(url, &[]).await?;
        Ok(commit.into())
    }

    async fn lookup_tag(&self, name: &str) -> Result<RefTarget, ForgeError> {
        let url = self
            .forge
            .project_url(&self.locator, &["repository", "tags", name])?;
        let tag: GitLabTag = self.forge.get_json(url, &[]).await?;
        Ok(tag.into())
    }
}

// =============================================================================
// GitLab API Types
// =============================================================================

/// Request body for creating a merge request.
#[derive(Serialize)]
struct CreateMrBody<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Deserialize)]
struct GitLabUserRef {
    id: u64,
}

/// Project membership entry; presence is all that matters.
#[derive(Deserialize)]
struct GitLabMember {}

#[derive(Deserialize)]
struct GitLabProject {
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GitLabProjectListItem {
    id: u64,
    path: String,
    web_url: String,
    namespace: GitLabNamespace,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    last_activity_at: Option<String>,
}

#[derive(Deserialize)]
struct GitLabNamespace {
    full_path: String,
}

impl GitLabProjectListItem {
    fn into_summary(self, languages: Vec<String>) -> RepoSummary {
        RepoSummary {
            repo_name: self.path,
            repo_url: self.web_url,
            repo_owner: self.namespace.full_path,
            repo_languages: languages,
            repo_is_public: self.visibility.as_deref() == Some("public"),
            repo_updated_at: self.last_activity_at.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct GitLabBranch {
    name: String,
    commit: GitLabCommit,
}

#[derive(Deserialize)]
struct GitLabCommit {
    id: String,
    #[serde(default)]
    committed_date: Option<DateTime<Utc>>,
}

impl From<GitLabCommit> for RefTarget {
    fn from(commit: GitLabCommit) -> Self {
        RefTarget {
            sha: commit.id,
            date: commit.committed_date,
        }
    }
}

#[derive(Deserialize)]
struct GitLabTag {
    /// Tag object id for annotated tags, commit id for lightweight ones
    target: String,
    commit: GitLabCommit,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<GitLabTag> for RefTarget {
    fn from(tag: GitLabTag) -> Self {
        if tag.target != tag.commit.id {
            RefTarget {
                sha: tag.target,
                date: tag.created_at,
            }
        } else {
            tag.commit.into()
        }
    }
}

#[derive(Deserialize)]
struct GitLabMergeRequest {
    state: String,
}

impl GitLabMergeRequest {
    fn status(&self) -> Result<SubmitRequestStatus, ForgeError> {
        match self.state.as_str() {
            "merged" => Ok(SubmitRequestStatus::Merged),
            "opened" => Ok(SubmitRequestStatus::Open),
            "closed" => Ok(SubmitRequestStatus::Closed),
            other => Err(ForgeError::UnknownState(other.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct GitLabCreatedMr {
    iid: u64,
}

#[derive(Deserialize)]
struct GitLabBlameEntry {
    commit: GitLabBlameCommit,
    lines: Vec<String>,
}

#[derive(Deserialize)]
struct GitLabBlameCommit {
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    author_email: String,
}
