// src/gather/ledger.rs

//! Per-source query ledger
//!
//! Tracks which ids have been queried (or covered by a returned closure)
//! against each source. Entries are only ever added; an id present in a
//! source's entry is never queried there again, including ids whose query
//! failed. The ledger is owned by the driver task — query completions are
//! serialized onto it, so no locking is needed here.

use std::collections::HashSet;

/// Mapping from source (by index into the surviving source list) to the
/// set of lowercased ids queried against it
#[derive(Debug)]
pub(crate) struct QueriedLedger {
    queried: Vec<HashSet<String>>,
}

impl QueriedLedger {
    /// Create a ledger with an empty entry per source
    pub(crate) fn new(sources: usize) -> Self {
        Self {
            queried: vec![HashSet::new(); sources],
        }
    }

    /// Record an id as queried against a source; true when newly added
    pub(crate) fn mark(&mut self, source: usize, id: &str) -> bool {
        self.queried[source].insert(id.to_lowercase())
    }

    /// Whether the id has been queried against the source
    pub(crate) fn contains(&self, source: usize, id: &str) -> bool {
        self.queried[source].contains(&id.to_lowercase())
    }

    /// Ids queried against one source
    pub(crate) fn ids_for(&self, source: usize) -> &HashSet<String> {
        &self.queried[source]
    }

    /// The universe of ids known to the gather
    pub(crate) fn union_all(&self) -> HashSet<String> {
        let mut all = HashSet::new();
        for entry in &self.queried {
            all.extend(entry.iter().cloned());
        }
        all
    }

    /// Ids known somewhere but not yet queried against this source
    pub(crate) fn missing_for(&self, source: usize, universe: &HashSet<String>) -> Vec<String> {
        universe
            .iter()
            .filter(|id| !self.queried[source].contains(*id))
            .cloned()
            .collect()
    }
}
