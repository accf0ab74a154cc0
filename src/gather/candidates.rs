// src/gather/candidates.rs

//! Concurrency-safe candidate set
//!
//! Accumulates source-tagged dependency records as queries complete.
//! Deduplication key is (id case-insensitive, version, source): the same
//! release from two sources stays two entries, the same release from the
//! same source collapses to one. Insertion order is not observable.

use crate::metadata::SourceTaggedDependencyInfo;
use crate::version::Version;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    id: String,
    version: Version,
    source_name: String,
    source_url: String,
}

impl RecordKey {
    fn of(record: &SourceTaggedDependencyInfo) -> Self {
        Self {
            id: record.identity().id_key(),
            version: record.identity().version.clone(),
            source_name: record.source().name().to_string(),
            source_url: record.source().url().to_string(),
        }
    }
}

/// Set of source-tagged dependency records, safe for concurrent insertion
#[derive(Debug, Default)]
pub struct CandidateSet {
    records: DashMap<RecordKey, SourceTaggedDependencyInfo>,
    ids: DashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning true when it was new
    ///
    /// A record equal to an existing entry (same identity, same source) is
    /// dropped; the first insertion's casing wins.
    pub fn insert(&self, record: SourceTaggedDependencyInfo) -> bool {
        let key = RecordKey::of(&record);
        let id = key.id.clone();
        match self.records.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
                self.ids.insert(id);
                true
            }
        }
    }

    /// Current contents, unordered
    pub fn snapshot(&self) -> Vec<SourceTaggedDependencyInfo> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    /// Union of lowercased ids across all contained records
    pub fn known_ids(&self) -> HashSet<String> {
        self.ids.iter().map(|id| id.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
