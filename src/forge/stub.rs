//! forge::stub
//!
//! The forge used when a URL matches no known platform. Every capability
//! fails with `NotImplemented`, so callers hold a uniformly typed handle
//! without special-casing "no SCM".

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::traits::{Forge, ForgeError};
use crate::core::types::{
    BlameRange, ReferenceDescriptor, RepoSummary, SubmitRequest, SubmitRequestStatus,
};

/// Forge with no capabilities.
#[derive(Debug, Clone, Default)]
pub struct StubForge;

fn not_implemented<T>(operation: &str) -> Result<T, ForgeError> {
    tracing::error!("{operation} not implemented");
    Err(ForgeError::NotImplemented(operation.to_string()))
}

#[async_trait]
impl Forge for StubForge {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn auth_headers(&self) -> Result<HeaderMap, ForgeError> {
        not_implemented("auth_headers()")
    }

    fn download_url(&self, _sha: &str) -> Result<String, ForgeError> {
        not_implemented("download_url()")
    }

    async fn username_for_auth_url(&self) -> Result<String, ForgeError> {
        not_implemented("username_for_auth_url()")
    }

    async fn validate_params(&self) -> Result<(), ForgeError> {
        not_implemented("validate_params()")
    }

    async fn username(&self) -> Result<String, ForgeError> {
        not_implemented("username()")
    }

    async fn is_user_collaborator(&self, _username: &str) -> Result<bool, ForgeError> {
        not_implemented("is_user_collaborator()")
    }

    async fn user_has_access_to_repo(&self) -> Result<bool, ForgeError> {
        not_implemented("user_has_access_to_repo()")
    }

    async fn is_remote_branch(&self, _branch: &str) -> Result<bool, ForgeError> {
        not_implemented("is_remote_branch()")
    }

    async fn repo_list(&self) -> Result<Vec<RepoSummary>, ForgeError> {
        not_implemented("repo_list()")
    }

    async fn branch_list(&self) -> Result<Vec<String>, ForgeError> {
        not_implemented("branch_list()")
    }

    async fn submit_request_status(&self, _id: &str) -> Result<SubmitRequestStatus, ForgeError> {
        not_implemented("submit_request_status()")
    }

    async fn create_submit_request(&self, _request: SubmitRequest) -> Result<String, ForgeError> {
        not_implemented("create_submit_request()")
    }

    async fn blame_ranges(
        &self,
        _reference: &str,
        _path: &str,
    ) -> Result<Vec<BlameRange>, ForgeError> {
        not_implemented("blame_ranges()")
    }

    async fn reference_data(&self, _reference: &str) -> Result<ReferenceDescriptor, ForgeError> {
        not_implemented("reference_data()")
    }

    async fn default_branch(&self) -> Result<String, ForgeError> {
        not_implemented("default_branch()")
    }
}
