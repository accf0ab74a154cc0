// src/config.rs

//! Gather configuration types
//!
//! Plain serde types describing a source catalog and the gather knobs.
//! The host owns loading and persisting the bytes; this module only maps
//! the deserialized form onto [`SourceRepository`] values and a
//! [`GatherContext`].

use crate::gather::GatherContext;
use crate::source::SourceRepository;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Kind of transport behind a configured source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEntryKind {
    /// Remote HTTP feed; `location` is the base url
    Http,
    /// Directory of feed documents; `location` is the path
    LocalFeed,
}

/// One configured source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub kind: SourceEntryKind,
    pub location: String,

    /// Disabled entries are kept in the catalog but never queried
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether the source exposes dependency metadata; sources without it
    /// are excluded from the gather
    #[serde(default = "default_true")]
    pub dependency_info: bool,
}

/// Gather configuration: knobs plus the source catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherConfig {
    #[serde(default)]
    pub include_prerelease: bool,

    /// Maximum concurrent source queries; 0 means one per source
    #[serde(default)]
    pub max_parallelism: usize,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl GatherConfig {
    /// The gather context described by this configuration
    pub fn context(&self) -> GatherContext {
        GatherContext {
            include_prerelease: self.include_prerelease,
            max_parallelism: self.max_parallelism,
        }
    }

    /// Enabled catalog entries as source repositories
    pub fn sources(&self) -> Vec<SourceRepository> {
        self.sources
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| {
                let repo = match entry.kind {
                    SourceEntryKind::Http => {
                        SourceRepository::http(entry.name.as_str(), entry.location.as_str())
                    }
                    SourceEntryKind::LocalFeed => {
                        SourceRepository::local_feed(entry.name.as_str(), entry.location.as_str())
                    }
                };
                if entry.dependency_info {
                    repo
                } else {
                    repo.without_dependency_info()
                }
            })
            .collect()
    }
}
