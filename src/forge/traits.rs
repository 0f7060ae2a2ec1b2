//! forge::traits
//!
//! Forge trait definition and the error taxonomy shared by every platform.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! Platform status codes are classified once by each implementation's
//! response handler and translated into [`ForgeError`] before they reach
//! the caller.
//!
//! Some operations are existence checks with a degraded-mode contract:
//! [`Forge::is_remote_branch`] and [`Forge::is_user_collaborator`] answer
//! `Ok(false)` for any upstream failure, and [`Forge::repo_list`] answers
//! an empty list for 401/404. They still fail on local preconditions
//! (missing token or URL) and on the stub.
//!
//! # Example
//!
//! ```ignore
//! use scmkit::forge::{Forge, ForgeError};
//!
//! async fn describe(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let default_branch = forge.default_branch().await?;
//!     let head = forge.reference_data(&default_branch).await?;
//!     println!("{} is a {} at {}", default_branch, head.kind, head.sha);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::core::types::{
    BlameRange, ReferenceDescriptor, RepoSummary, SubmitRequest, SubmitRequestStatus, TypeError,
};

/// Errors from forge operations.
///
/// The first group is the stable vocabulary callers match on. The
/// transport group carries upstream failures that no operation chose to
/// reinterpret.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// URL does not match the platform's owner/repo shape.
    #[error("invalid url pattern: {0}")]
    InvalidUrlPattern(String),

    /// URL is well formed but the platform reports the repository missing.
    #[error("invalid repo url: {0}")]
    InvalidRepoUrl(String),

    /// The platform rejected the supplied token.
    #[error("invalid access token: {0}")]
    InvalidAccessToken(String),

    /// The repository cannot be reached with the supplied credentials.
    #[error("no access to repo: {0}")]
    RepoNoTokenAccess(String),

    /// No branch, tag, or commit matched the ref.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// Malformed object id.
    #[error("bad sha: {0}")]
    BadSha(String),

    /// Caller misuse: an operation was invoked without what it requires.
    #[error("{0}")]
    Precondition(String),

    /// The operation is not supported by this forge.
    #[error("{0} not implemented")]
    NotImplemented(String),

    /// The platform reported a pull/merge request state outside the known set.
    #[error("unknown state {0}")]
    UnknownState(String),

    /// HTTP 401.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 403.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 429.
    #[error("rate limited")]
    RateLimited,

    /// Any other unsuccessful response, or an unparseable body.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<TypeError> for ForgeError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => ForgeError::BadSha(msg),
            TypeError::InvalidBranchName(msg) => ForgeError::Precondition(msg),
        }
    }
}

impl From<reqwest::Error> for ForgeError {
    fn from(err: reqwest::Error) -> Self {
        ForgeError::NetworkError(err.to_string())
    }
}

impl ForgeError {
    /// Classify an unsuccessful HTTP status.
    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed(message),
            StatusCode::FORBIDDEN => ForgeError::PermissionDenied(message),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Map the validation outcome of a platform check into the taxonomy.
    ///
    /// 401/403 become `InvalidAccessToken`, 404 becomes `InvalidRepoUrl`,
    /// everything else passes through unchanged.
    pub(crate) fn into_validation_error(self, platform: &str, url: Option<&str>) -> Self {
        match self {
            ForgeError::AuthFailed(_) | ForgeError::PermissionDenied(_) => {
                ForgeError::InvalidAccessToken(format!("invalid {platform} access token"))
            }
            ForgeError::NotFound(_) => ForgeError::InvalidRepoUrl(format!(
                "invalid {platform} repo Url {}",
                url.unwrap_or_default()
            )),
            other => other,
        }
    }

    /// True for the statuses `repo_list` degrades to an empty list on.
    pub(crate) fn is_unauthorized_or_missing(&self) -> bool {
        matches!(self, ForgeError::AuthFailed(_) | ForgeError::NotFound(_))
    }
}

/// The Forge trait for interacting with source hosting platforms.
///
/// One implementation per platform, plus the stub used when a URL matches
/// no known platform. Implementations are selected once and never
/// switched.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github", "gitlab").
    fn name(&self) -> &'static str;

    /// Headers that authenticate a raw request against this platform.
    fn auth_headers(&self) -> Result<HeaderMap, ForgeError>;

    /// Archive download URL for a commit.
    fn download_url(&self, sha: &str) -> Result<String, ForgeError>;

    /// Username to embed in a credential-bearing clone URL.
    async fn username_for_auth_url(&self) -> Result<String, ForgeError>;

    /// Check that the token and repository are usable.
    ///
    /// # Errors
    ///
    /// - `InvalidAccessToken` on 401/403
    /// - `InvalidRepoUrl` on 404
    /// - Any other failure unchanged
    async fn validate_params(&self) -> Result<(), ForgeError>;

    /// Login of the token's owner. Requires a token.
    async fn username(&self) -> Result<String, ForgeError>;

    /// Whether `username` collaborates on the repository.
    ///
    /// Never fails for upstream reasons: absence and access errors both
    /// answer `false`.
    async fn is_user_collaborator(&self, username: &str) -> Result<bool, ForgeError>;

    /// Whether the token's owner collaborates on the repository.
    async fn user_has_access_to_repo(&self) -> Result<bool, ForgeError>;

    /// Whether `branch` exists on the remote. Upstream failures answer `false`.
    async fn is_remote_branch(&self, branch: &str) -> Result<bool, ForgeError>;

    /// Repositories visible to the token. 401/404 answer an empty list.
    async fn repo_list(&self) -> Result<Vec<RepoSummary>, ForgeError>;

    /// Branch names from a single bounded page.
    async fn branch_list(&self) -> Result<Vec<String>, ForgeError>;

    /// State of a pull/merge request by its decimal id.
    async fn submit_request_status(&self, id: &str) -> Result<SubmitRequestStatus, ForgeError>;

    /// Open a pull/merge request and return its id.
    async fn create_submit_request(&self, request: SubmitRequest) -> Result<String, ForgeError>;

    /// Blame ranges for `path` at `reference`. Missing data answers an empty list.
    async fn blame_ranges(&self, reference: &str, path: &str)
        -> Result<Vec<BlameRange>, ForgeError>;

    /// Classify `reference` as branch, tag, or commit.
    async fn reference_data(&self, reference: &str) -> Result<ReferenceDescriptor, ForgeError>;

    /// Default branch of the repository.
    async fn default_branch(&self) -> Result<String, ForgeError>;
}

/// Report caller misuse of `operation` and build the matching error.
pub(crate) fn precondition(operation: &str, message: &str) -> ForgeError {
    tracing::error!(operation, "{message}");
    ForgeError::Precondition(message.to_string())
}

/// Parse a submit request id the way platforms number them.
pub(crate) fn parse_submit_request_id(id: &str) -> Result<u64, ForgeError> {
    id.trim()
        .parse()
        .map_err(|_| ForgeError::Precondition(format!("invalid submit request id '{id}'")))
}
