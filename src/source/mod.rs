// src/source/mod.rs

//! Package sources and the dependency query capability
//!
//! A gather runs against a catalog of configured repositories. Each entry
//! is a [`SourceRepository`]: a named reference plus a transport backend.
//! Whether a source takes part in the gather is a capability question, not
//! a type question — [`SourceRepository::dependency_provider`] returns the
//! query interface when the source exposes dependency metadata and `None`
//! when it does not (such sources are silently excluded, never an error).

mod capability;
pub mod feed;
mod http;
mod local;
mod memory;

pub use capability::{DependencyProvider, SourceError, SourceResult};
pub use http::{HttpDependencyProvider, HttpDependencyProviderBuilder};
pub use local::LocalFeedProvider;
pub use memory::{InMemoryIndex, InjectedFailure};

use crate::error::Result;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

/// Transport backing a configured repository
#[derive(Debug, Clone)]
pub enum SourceBackend {
    /// Remote HTTP feed rooted at the repository url
    Http,
    /// Directory of per-id feed documents
    LocalFeed { root: PathBuf },
    /// In-memory index
    Memory { index: Arc<InMemoryIndex> },
}

/// A configured repository in the source catalog
///
/// The reference identity of a source is its (name, url) pair; the backend
/// does not participate in equality. Records in the gather output are
/// tagged with these references, so two sources must not share a name and
/// url.
#[derive(Debug, Clone)]
pub struct SourceRepository {
    name: String,
    url: String,
    provides_dependency_info: bool,
    backend: SourceBackend,
}

impl SourceRepository {
    /// A remote HTTP feed
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            name: name.into(),
            url: url.trim_end_matches('/').to_string(),
            provides_dependency_info: true,
            backend: SourceBackend::Http,
        }
    }

    /// A directory of feed documents on the local filesystem
    pub fn local_feed(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        Self {
            name: name.into(),
            url: format!("file://{}", root.display()),
            provides_dependency_info: true,
            backend: SourceBackend::LocalFeed { root },
        }
    }

    /// An in-memory index
    pub fn memory(name: impl Into<String>, index: Arc<InMemoryIndex>) -> Self {
        let name: String = name.into();
        Self {
            url: format!("memory://{name}"),
            name,
            provides_dependency_info: true,
            backend: SourceBackend::Memory { index },
        }
    }

    /// Mark the source as not exposing dependency metadata
    ///
    /// Such a source stays in the catalog (it may still serve payloads)
    /// but is excluded from the gather.
    pub fn without_dependency_info(mut self) -> Self {
        self.provides_dependency_info = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn provides_dependency_info(&self) -> bool {
        self.provides_dependency_info
    }

    /// Capability query: the dependency metadata interface of this source
    ///
    /// Returns `None` when the source does not expose dependency metadata.
    /// Providers are constructed once per gather and reused across passes;
    /// every adapter is safe for concurrent use.
    pub fn dependency_provider(&self) -> Result<Option<Arc<dyn DependencyProvider>>> {
        if !self.provides_dependency_info {
            return Ok(None);
        }
        let provider: Arc<dyn DependencyProvider> = match &self.backend {
            SourceBackend::Http => Arc::new(HttpDependencyProvider::new(&self.name, &self.url)?),
            SourceBackend::LocalFeed { root } => {
                Arc::new(LocalFeedProvider::new(&self.name, root.clone()))
            }
            SourceBackend::Memory { index } => {
                Arc::new(memory::InMemoryProvider::new(&self.name, index.clone()))
            }
        };
        Ok(Some(provider))
    }
}

impl PartialEq for SourceRepository {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.url == other.url
    }
}

impl Eq for SourceRepository {}

impl Hash for SourceRepository {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.url.hash(state);
    }
}

impl fmt::Display for SourceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}
