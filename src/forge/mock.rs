//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps branches, tags, commits, and submit requests in
//! memory. Each reference lookup can be given a latency (to stage races
//! under a paused tokio clock) or a forced failure.
//!
//! # Example
//!
//! ```
//! use scmkit::forge::mock::{MockForge, MockRef};
//! use scmkit::forge::Forge;
//! use scmkit::core::types::ReferenceKind;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_branch(
//!     "main",
//!     MockRef::new("628f6f50b514529101a142242846985f7b4be048", None),
//! );
//!
//! let resolved = forge.reference_data("main").await.unwrap();
//! assert_eq!(resolved.kind, ReferenceKind::Branch);
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::resolve::{resolve_reference, RefLookup, RefTarget, ResolveOrder};
use super::traits::{parse_submit_request_id, Forge, ForgeError};
use crate::core::types::{
    BlameRange, ReferenceDescriptor, ReferenceKind, RepoSummary, SubmitRequest,
    SubmitRequestStatus,
};

/// A branch head or tag target held by the mock.
#[derive(Debug, Clone)]
pub struct MockRef {
    pub sha: String,
    pub date: Option<DateTime<Utc>>,
}

impl MockRef {
    pub fn new(sha: impl Into<String>, date: Option<DateTime<Utc>>) -> Self {
        Self {
            sha: sha.into(),
            date,
        }
    }
}

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug)]
struct MockForgeInner {
    branches: BTreeMap<String, MockRef>,
    tags: HashMap<String, MockRef>,
    commits: HashMap<String, Option<DateTime<Utc>>>,
    lookup_failures: HashMap<ReferenceKind, ForgeError>,
    latencies: HashMap<ReferenceKind, Duration>,
    default_branch: String,
    repos: Vec<RepoSummary>,
    blame: Vec<BlameRange>,
    submit_requests: BTreeMap<u64, SubmitRequestStatus>,
    next_submit_request: u64,
    order: ResolveOrder,
    operations: Vec<MockOperation>,
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    LookupBranch(String),
    LookupCommit(String),
    LookupTag(String),
    CreateSubmitRequest { source: String, target: String },
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForge {
    /// Create an empty mock whose default branch is `main`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                branches: BTreeMap::new(),
                tags: HashMap::new(),
                commits: HashMap::new(),
                lookup_failures: HashMap::new(),
                latencies: HashMap::new(),
                default_branch: "main".to_string(),
                repos: Vec::new(),
                blame: Vec::new(),
                submit_requests: BTreeMap::new(),
                next_submit_request: 1,
                order: ResolveOrder::Race,
                operations: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_branch(self, name: impl Into<String>, head: MockRef) -> Self {
        self.state().branches.insert(name.into(), head);
        self
    }

    pub fn with_tag(self, name: impl Into<String>, target: MockRef) -> Self {
        self.state().tags.insert(name.into(), target);
        self
    }

    pub fn with_commit(self, sha: impl Into<String>, date: Option<DateTime<Utc>>) -> Self {
        self.state().commits.insert(sha.into(), date);
        self
    }

    pub fn with_default_branch(self, name: impl Into<String>) -> Self {
        self.state().default_branch = name.into();
        self
    }

    pub fn with_repos(self, repos: Vec<RepoSummary>) -> Self {
        self.state().repos = repos;
        self
    }

    pub fn with_blame(self, ranges: Vec<BlameRange>) -> Self {
        self.state().blame = ranges;
        self
    }

    pub fn with_resolve_order(self, order: ResolveOrder) -> Self {
        self.state().order = order;
        self
    }

    /// Force the lookup for `kind` to fail with `err`.
    pub fn fail_lookup(self, kind: ReferenceKind, err: ForgeError) -> Self {
        self.state().lookup_failures.insert(kind, err);
        self
    }

    /// Delay the lookup for `kind` by `latency` before it answers.
    pub fn with_latency(self, kind: ReferenceKind, latency: Duration) -> Self {
        self.state().latencies.insert(kind, latency);
        self
    }

    /// Set the state of an existing (or new) submit request.
    pub fn set_submit_request_status(&self, id: u64, status: SubmitRequestStatus) {
        self.state().submit_requests.insert(id, status);
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    async fn lookup(
        &self,
        kind: ReferenceKind,
        key: &str,
        operation: MockOperation,
    ) -> Result<RefTarget, ForgeError> {
        let latency = {
            let mut state = self.state();
            state.operations.push(operation);
            state.latencies.get(&kind).copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state();
        if let Some(err) = state.lookup_failures.get(&kind) {
            return Err(err.clone());
        }
        let found = match kind {
            ReferenceKind::Branch => state.branches.get(key).map(|r| RefTarget {
                sha: r.sha.clone(),
                date: r.date,
            }),
            ReferenceKind::Tag => state.tags.get(key).map(|r| RefTarget {
                sha: r.sha.clone(),
                date: r.date,
            }),
            ReferenceKind::Commit => state.commits.get(key).map(|date| RefTarget {
                sha: key.to_string(),
                date: *date,
            }),
        };
        found.ok_or_else(|| ForgeError::NotFound(format!("{kind} {key}")))
    }
}

#[async_trait]
impl RefLookup for MockForge {
    async fn lookup_branch(&self, name: &str) -> Result<RefTarget, ForgeError> {
        self.lookup(
            ReferenceKind::Branch,
            name,
            MockOperation::LookupBranch(name.to_string()),
        )
        .await
    }

    async fn lookup_commit(&self, sha: &str) -> Result<RefTarget, ForgeError> {
        self.lookup(
            ReferenceKind::Commit,
            sha,
            MockOperation::LookupCommit(sha.to_string()),
        )
        .await
    }

    async fn lookup_tag(&self, name: &str) -> Result<RefTarget, ForgeError> {
        self.lookup(
            ReferenceKind::Tag,
            name,
            MockOperation::LookupTag(name.to_string()),
        )
        .await
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn auth_headers(&self) -> Result<HeaderMap, ForgeError> {
        Ok(HeaderMap::new())
    }

    fn download_url(&self, sha: &str) -> Result<String, ForgeError> {
        Ok(format!("mock://archive/{sha}.zip"))
    }

    async fn username_for_auth_url(&self) -> Result<String, ForgeError> {
        Ok("mock-user".to_string())
    }

    async fn validate_params(&self) -> Result<(), ForgeError> {
        Ok(())
    }

    async fn username(&self) -> Result<String, ForgeError> {
        Ok("mock-user".to_string())
    }

    async fn is_user_collaborator(&self, username: &str) -> Result<bool, ForgeError> {
        Ok(username == "mock-user")
    }

    async fn user_has_access_to_repo(&self) -> Result<bool, ForgeError> {
        Ok(true)
    }

    async fn is_remote_branch(&self, branch: &str) -> Result<bool, ForgeError> {
        Ok(self.state().branches.contains_key(branch))
    }

    async fn repo_list(&self) -> Result<Vec<RepoSummary>, ForgeError> {
        Ok(self.state().repos.clone())
    }

    async fn branch_list(&self) -> Result<Vec<String>, ForgeError> {
        Ok(self.state().branches.keys().cloned().collect())
    }

    async fn submit_request_status(&self, id: &str) -> Result<SubmitRequestStatus, ForgeError> {
        let number = parse_submit_request_id(id)?;
        self.state()
            .submit_requests
            .get(&number)
            .copied()
            .ok_or_else(|| ForgeError::NotFound(format!("submit request {number}")))
    }

    async fn create_submit_request(&self, request: SubmitRequest) -> Result<String, ForgeError> {
        let mut state = self.state();
        state.operations.push(MockOperation::CreateSubmitRequest {
            source: request.source_branch,
            target: request.target_branch,
        });
        let number = state.next_submit_request;
        state.next_submit_request += 1;
        state
            .submit_requests
            .insert(number, SubmitRequestStatus::Open);
        Ok(number.to_string())
    }

    async fn blame_ranges(
        &self,
        _reference: &str,
        _path: &str,
    ) -> Result<Vec<BlameRange>, ForgeError> {
        Ok(self.state().blame.clone())
    }

    async fn reference_data(&self, reference: &str) -> Result<ReferenceDescriptor, ForgeError> {
        let order = self.state().order.clone();
        resolve_reference(self, reference, &order).await
    }

    async fn default_branch(&self) -> Result<String, ForgeError> {
        Ok(self.state().default_branch.clone())
    }
}
