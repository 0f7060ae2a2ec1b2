//! forge::resolve
//!
//! Classify a ref string of unknown kind as a branch, tag, or commit.
//!
//! # Algorithm
//!
//! Three lookups start concurrently: branch by name, commit by sha, and
//! tag by name. With [`ResolveOrder::Race`] the first lookup to succeed
//! wins and the other two are dropped (they are read-only, so abandoning
//! them has no side effects). A failing lookup never short-circuits the
//! others. Only when all three fail does resolution fail, and then with a
//! single `RefNotFound` regardless of the individual causes.
//!
//! With [`ResolveOrder::Priority`] all three lookups run to completion and
//! the highest-priority success is returned, which makes refs that are
//! valid under two interpretations (a branch named like a short sha)
//! resolve deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};

use crate::core::types::{ReferenceDescriptor, ReferenceKind};

use super::traits::ForgeError;

/// How ambiguous refs are settled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolveOrder {
    /// Whichever lookup the platform answers first.
    #[default]
    Race,
    /// First success in this order, after all lookups settle. Kinds left
    /// out of the list still resolve, after the listed ones, in
    /// branch/commit/tag order.
    Priority(Vec<ReferenceKind>),
}

/// A successful single-kind lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTarget {
    pub sha: String,
    pub date: Option<DateTime<Utc>>,
}

/// Platform lookups the resolver races.
///
/// Each method answers only for its own kind and fails otherwise; the
/// failure's variant does not matter to the resolver.
#[async_trait]
pub trait RefLookup: Send + Sync {
    /// Head commit of the branch `name`, dated by committer.
    async fn lookup_branch(&self, name: &str) -> Result<RefTarget, ForgeError>;

    /// The commit `sha`, dated by committer.
    async fn lookup_commit(&self, sha: &str) -> Result<RefTarget, ForgeError>;

    /// The tag `name`: tagger date for annotated tags, committer date of
    /// the pointed-to commit for lightweight ones.
    async fn lookup_tag(&self, name: &str) -> Result<RefTarget, ForgeError>;
}

type Lookup<'a> = BoxFuture<'a, Result<ReferenceDescriptor, ForgeError>>;

/// Resolve `reference` against `lookup`.
///
/// # Errors
///
/// `RefNotFound` when no lookup succeeds.
pub async fn resolve_reference(
    lookup: &dyn RefLookup,
    reference: &str,
    order: &ResolveOrder,
) -> Result<ReferenceDescriptor, ForgeError> {
    let lookups = vec![
        tagged(ReferenceKind::Branch, reference, lookup.lookup_branch(reference)),
        tagged(ReferenceKind::Commit, reference, lookup.lookup_commit(reference)),
        tagged(ReferenceKind::Tag, reference, lookup.lookup_tag(reference)),
    ];

    let resolved = match order {
        ResolveOrder::Race => race(lookups).await,
        ResolveOrder::Priority(priority) => by_priority(lookups, priority).await,
    };

    match &resolved {
        Some(descriptor) => tracing::debug!(
            reference,
            kind = %descriptor.kind,
            sha = %descriptor.sha,
            "resolved reference"
        ),
        None => tracing::debug!(reference, "no branch, commit or tag matched"),
    }

    resolved.ok_or_else(|| ForgeError::RefNotFound(format!("ref: {reference} does not exist")))
}

fn tagged<'a>(
    kind: ReferenceKind,
    reference: &'a str,
    fut: impl std::future::Future<Output = Result<RefTarget, ForgeError>> + Send + 'a,
) -> Lookup<'a> {
    fut.map(move |result| match result {
        Ok(target) => Ok(ReferenceDescriptor {
            kind,
            sha: target.sha,
            date: target.date,
        }),
        Err(err) => {
            tracing::debug!(reference, %kind, error = %err, "reference lookup failed");
            Err(err)
        }
    })
    .boxed()
}

/// Any-of-N: first success, or `None` once every lookup has failed.
///
/// The lookups still in flight when one succeeds are dropped here.
async fn race(lookups: Vec<Lookup<'_>>) -> Option<ReferenceDescriptor> {
    future::select_ok(lookups)
        .await
        .ok()
        .map(|(descriptor, _abandoned)| descriptor)
}

async fn by_priority(
    lookups: Vec<Lookup<'_>>,
    priority: &[ReferenceKind],
) -> Option<ReferenceDescriptor> {
    let mut successes: Vec<ReferenceDescriptor> = future::join_all(lookups)
        .await
        .into_iter()
        .filter_map(Result::ok)
        .collect();

    if successes.is_empty() {
        return None;
    }

    // Kinds missing from `priority` rank after every listed kind.
    let index = priority
        .iter()
        .find_map(|kind| successes.iter().position(|d| d.kind == *kind))
        .unwrap_or(0);
    Some(successes.swap_remove(index))
}
