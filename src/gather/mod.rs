// src/gather/mod.rs

//! Cross-source dependency gather
//!
//! Given a root package release and a catalog of sources, assembles the
//! complete transitive dependency metadata graph a version resolver needs.
//! Metadata is federated: a release can be published to any subset of
//! sources, and ids discovered in one source may only resolve in another.
//! A correct gather therefore re-queries every source for every id
//! discovered anywhere, until the discovered set stabilizes.
//!
//! Results are source-tagged and deduplicated by (id, version, source):
//! the same release found in two sources stays two candidates, because
//! picking the winning source per release is the resolver's concern.

mod candidates;
mod driver;
mod ledger;

pub use candidates::CandidateSet;

use crate::error::{Error, Result};
use crate::framework::TargetFramework;
use crate::metadata::PackageIdentity;
use crate::source::SourceRepository;
use driver::{GatherDriver, GatherSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Caller-supplied knobs for a gather run
#[derive(Debug, Clone)]
pub struct GatherContext {
    /// Surface prerelease versions (and unlisted prereleases) in id queries
    pub include_prerelease: bool,
    /// Maximum concurrent source queries; 0 means one per surviving source
    pub max_parallelism: usize,
}

impl Default for GatherContext {
    fn default() -> Self {
        Self {
            include_prerelease: false,
            max_parallelism: 0,
        }
    }
}

/// Gather the transitive dependency metadata graph for a root release
///
/// Seeds the candidate set with the root identity against every capable
/// source, then drives the fixed-point loop until no source owes a query
/// for any known id, and returns the accumulated candidate set.
///
/// Sources without the dependency metadata capability are skipped; if none
/// remain the gather fails with [`Error::NoSourcesAvailable`]. Individual
/// source failures are logged against the source and do not abort the run.
/// Cancellation aborts promptly with [`Error::Cancelled`] and no partial
/// result. A root that exists in no source is not an error — the returned
/// set simply carries no record for it, and diagnosing that is the
/// resolver's job.
pub async fn gather(
    root: &PackageIdentity,
    target: &TargetFramework,
    sources: &[SourceRepository],
    context: &GatherContext,
    cancel: CancellationToken,
) -> Result<CandidateSet> {
    let mut surviving = Vec::new();
    for repo in sources {
        match repo.dependency_provider()? {
            Some(provider) => surviving.push(GatherSource {
                repo: Arc::new(repo.clone()),
                provider,
            }),
            None => debug!(
                "Source {} has no dependency metadata interface, skipping",
                repo
            ),
        }
    }
    if surviving.is_empty() {
        return Err(Error::NoSourcesAvailable);
    }

    info!(
        "Gathering dependency metadata for {} from {} sources",
        root,
        surviving.len()
    );

    let driver = GatherDriver::new(surviving, target.clone(), context, cancel.clone());

    // Racing the whole run against the token keeps cancellation prompt
    // even when an adapter blocks inside a query
    match cancel.run_until_cancelled(driver.run(root)).await {
        Some(result) => result.map(|(candidates, _ledger)| candidates),
        None => Err(Error::Cancelled),
    }
}
