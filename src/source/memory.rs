// src/source/memory.rs

//! In-memory dependency source
//!
//! A deterministic source for tests and embedding hosts: the full package
//! index lives in memory, and queries can be scripted to fail, stall, or
//! block until cancelled so gather-level error and cancellation paths can
//! be exercised without a network.

use super::capability::{DependencyProvider, SourceError, SourceResult};
use super::feed;
use crate::framework::{self, TargetFramework};
use crate::metadata::{DependencyGroup, DependencyInfo, PackageIdentity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Failure kind injected into every query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Unavailable,
    Malformed,
}

#[derive(Debug, Clone, Default)]
struct SourceBehavior {
    failure: Option<InjectedFailure>,
    delay: Option<Duration>,
    hang_until_cancelled: bool,
}

#[derive(Debug, Clone)]
struct IndexedPackage {
    identity: PackageIdentity,
    listed: bool,
    groups: Vec<DependencyGroup>,
}

/// In-memory package index, keyed by lowercased id
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    packages: HashMap<String, Vec<IndexedPackage>>,
    behavior: SourceBehavior,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package release with its dependency groups
    pub fn add(&mut self, identity: PackageIdentity, listed: bool, groups: Vec<DependencyGroup>) {
        self.packages
            .entry(identity.id_key())
            .or_default()
            .push(IndexedPackage {
                identity,
                listed,
                groups,
            });
    }

    /// Fail every query with the given error kind
    pub fn with_failure(mut self, failure: InjectedFailure) -> Self {
        self.behavior.failure = Some(failure);
        self
    }

    /// Delay every query by a fixed duration
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.behavior.delay = Some(delay);
        self
    }

    /// Block every query until the caller cancels
    pub fn with_hang(mut self) -> Self {
        self.behavior.hang_until_cancelled = true;
        self
    }
}

pub(crate) struct InMemoryProvider {
    name: String,
    index: Arc<InMemoryIndex>,
}

impl InMemoryProvider {
    pub(crate) fn new(name: impl Into<String>, index: Arc<InMemoryIndex>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    async fn apply_behavior(&self, cancel: Option<&CancellationToken>) -> SourceResult<()> {
        let behavior = &self.index.behavior;
        if behavior.hang_until_cancelled {
            match cancel {
                Some(token) => {
                    token.cancelled().await;
                    return Err(SourceError::Cancelled);
                }
                None => {
                    // No token on this code path; the driver races the
                    // whole gather against its own token instead
                    std::future::pending::<()>().await;
                }
            }
        }
        if let Some(delay) = behavior.delay {
            match cancel {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => return Err(SourceError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                },
                None => tokio::time::sleep(delay).await,
            }
        }
        match behavior.failure {
            Some(InjectedFailure::Unavailable) => Err(SourceError::Unavailable(
                "injected transport failure".to_string(),
            )),
            Some(InjectedFailure::Malformed) => Err(SourceError::Malformed(
                "injected parse failure".to_string(),
            )),
            None => Ok(()),
        }
    }

    fn narrow(&self, package: &IndexedPackage, target: &TargetFramework) -> DependencyInfo {
        let dependencies = framework::select_nearest(&package.groups, target)
            .map(|g| g.dependencies.clone())
            .unwrap_or_default();
        DependencyInfo::new(package.identity.clone(), package.listed, dependencies)
    }

    fn versions_of(
        &self,
        id: &str,
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> Vec<DependencyInfo> {
        let Some(entries) = self.index.packages.get(&id.to_lowercase()) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|p| {
                let version = &p.identity.version;
                if version.is_prerelease() && !include_prerelease {
                    return false;
                }
                p.listed || (include_prerelease && version.is_prerelease())
            })
            .map(|p| self.narrow(p, target))
            .collect()
    }
}

#[async_trait]
impl DependencyProvider for InMemoryProvider {
    async fn resolve_by_identity(
        &self,
        identities: &[PackageIdentity],
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> SourceResult<Vec<DependencyInfo>> {
        self.apply_behavior(None).await?;

        let mut seed_ids = Vec::new();
        let mut seed = Vec::new();
        for identity in identities {
            seed_ids.push(identity.id_key());
            if let Some(entries) = self.index.packages.get(&identity.id_key())
                && let Some(package) = entries.iter().find(|p| p.identity == *identity)
            {
                seed.push(self.narrow(package, target));
            }
        }

        feed::expand_closure(&seed_ids, seed, |id| {
            let found = self.versions_of(&id, target, include_prerelease);
            async move { Ok(found) }
        })
        .await
    }

    async fn resolve_by_id(
        &self,
        id: &str,
        target: &TargetFramework,
        include_prerelease: bool,
        cancel: &CancellationToken,
    ) -> SourceResult<Vec<DependencyInfo>> {
        self.apply_behavior(Some(cancel)).await?;

        let seed = self.versions_of(id, target, include_prerelease);
        feed::expand_closure(&[id.to_lowercase()], seed, |dep| {
            let found = self.versions_of(&dep, target, include_prerelease);
            async move { Ok(found) }
        })
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
