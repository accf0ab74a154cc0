// src/source/local.rs

//! Local feed adapter
//!
//! Serves dependency metadata from a directory of per-id JSON documents,
//! `{root}/{id-lowercase}.json`. Useful for mirrored feeds and offline
//! fixtures. A missing document means the id is not published here.

use super::capability::{DependencyProvider, SourceError, SourceResult};
use super::feed::{self, PackageIndexDoc};
use crate::framework::TargetFramework;
use crate::metadata::{DependencyInfo, PackageIdentity};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dependency provider reading a directory of feed documents
pub struct LocalFeedProvider {
    name: String,
    root: PathBuf,
}

impl LocalFeedProvider {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    async fn load_doc(&self, id_key: &str) -> SourceResult<Option<PackageIndexDoc>> {
        let path = self.root.join(format!("{id_key}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| SourceError::Malformed(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No feed document at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(SourceError::Unavailable(format!("{}: {e}", path.display()))),
        }
    }

    async fn load_versions(
        &self,
        id_key: &str,
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> SourceResult<Vec<DependencyInfo>> {
        match self.load_doc(id_key).await? {
            Some(doc) => feed::versions_from_doc(&doc, target, include_prerelease),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl DependencyProvider for LocalFeedProvider {
    async fn resolve_by_identity(
        &self,
        identities: &[PackageIdentity],
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> SourceResult<Vec<DependencyInfo>> {
        let mut seed_ids = Vec::new();
        let mut seed = Vec::new();
        for identity in identities {
            let id_key = identity.id_key();
            if let Some(doc) = self.load_doc(&id_key).await?
                && let Some(record) = feed::identity_from_doc(&doc, identity, target)?
            {
                seed.push(record);
            }
            seed_ids.push(id_key);
        }

        feed::expand_closure(&seed_ids, seed, |id| async move {
            self.load_versions(&id, target, include_prerelease).await
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
        let work = async {
            let seed = self
                .load_versions(&id.to_lowercase(), target, include_prerelease)
                .await?;
            feed::expand_closure(&[id.to_lowercase()], seed, |dep| async move {
                self.load_versions(&dep, target, include_prerelease).await
            })
            .await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            result = work => result,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
