// tests/common/mod.rs

//! Shared fixtures for gather integration tests.

use quarry::{
    CandidateSet, DependencyGroup, InMemoryIndex, PackageDependency, PackageIdentity,
    SourceRepository, TargetFramework, VersionRange,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Parse an identity from id and version strings.
pub fn identity(id: &str, version: &str) -> PackageIdentity {
    PackageIdentity::parse(id, version).unwrap()
}

/// A profile-agnostic dependency group list.
pub fn deps(entries: &[(&str, &str)]) -> Vec<DependencyGroup> {
    vec![DependencyGroup::new(
        TargetFramework::Any,
        entries
            .iter()
            .map(|(id, range)| PackageDependency::new(*id, VersionRange::parse(range).unwrap()))
            .collect(),
    )]
}

/// An index hosting the given (id, version, dependencies) releases.
pub fn index(packages: &[(&str, &str, &[(&str, &str)])]) -> InMemoryIndex {
    let mut index = InMemoryIndex::new();
    for (id, version, dependencies) in packages {
        index.add(identity(id, version), true, deps(dependencies));
    }
    index
}

/// An in-memory source hosting the given releases.
pub fn memory_source(
    name: &str,
    packages: &[(&str, &str, &[(&str, &str)])],
) -> SourceRepository {
    SourceRepository::memory(name, Arc::new(index(packages)))
}

/// Stable view of a candidate set: (id lowercased, version, source name).
pub fn tagged(candidates: &CandidateSet) -> BTreeSet<(String, String, String)> {
    candidates
        .snapshot()
        .iter()
        .map(|r| {
            (
                r.identity().id_key(),
                r.identity().version.to_string(),
                r.source().name().to_string(),
            )
        })
        .collect()
}

/// Expected-set literal helper.
pub fn expected(entries: &[(&str, &str, &str)]) -> BTreeSet<(String, String, String)> {
    entries
        .iter()
        .map(|(id, version, source)| {
            (id.to_string(), version.to_string(), source.to_string())
        })
        .collect()
}
