// src/source/capability.rs

//! Source query capability
//!
//! The interface the gather driver consumes. A repository that exposes it
//! answers two questions: "what does this exact release look like?" and
//! "what releases of this id do you have?". Both answers cover the
//! source-local dependency closure: the requested record(s) plus every
//! dependency record transitively reachable within the same source. The
//! driver relies on that closure guarantee when it marks returned
//! dependency ids as already covered by the answering source.

use crate::framework::TargetFramework;
use crate::metadata::{DependencyInfo, PackageIdentity};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from a single source query
///
/// These never abort a gather on their own; the driver logs them against
/// the source and moves on.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source's transport failed
    #[error("transport failure: {0}")]
    Unavailable(String),

    /// The source answered with something the adapter could not parse
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The cancellation token fired while the query was in flight
    #[error("cancelled")]
    Cancelled,
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Dependency metadata interface of a single repository
///
/// Implementations must be safe for concurrent invocation; the driver
/// obtains one provider per source per gather and fans queries out over it.
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    /// Resolve exact releases
    ///
    /// Returns zero or one record per input identity (unordered; callers
    /// match by identity), plus the source-local closure of their
    /// dependencies. Exact lookups return a release regardless of its
    /// listed flag.
    async fn resolve_by_identity(
        &self,
        identities: &[PackageIdentity],
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> SourceResult<Vec<DependencyInfo>>;

    /// Resolve every visible release of an id
    ///
    /// Listed releases always; unlisted prereleases only when
    /// `include_prerelease` is set. Output may be empty — an id that is
    /// simply not published here is not an error. The closure guarantee
    /// applies as for [`Self::resolve_by_identity`].
    async fn resolve_by_id(
        &self,
        id: &str,
        target: &TargetFramework,
        include_prerelease: bool,
        cancel: &CancellationToken,
    ) -> SourceResult<Vec<DependencyInfo>>;

    /// Human-readable source name for logging
    fn name(&self) -> &str;
}
