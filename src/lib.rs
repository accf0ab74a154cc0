// src/lib.rs

//! Quarry — cross-source dependency metadata gathering
//!
//! The gather subsystem of a federated package-management client. Package
//! metadata is spread across repositories: a release can be published to
//! any subset of configured sources, and transitive dependency ids
//! discovered in one source may only be resolvable in another. Quarry
//! assembles the complete transitive dependency graph for a root release
//! by driving every source to a fixed point, concurrently, tolerating
//! per-source failures, and preserving per-source provenance for the
//! downstream version resolver.
//!
//! # Architecture
//!
//! - Capability-based sources: a catalog entry takes part in the gather
//!   only if it answers the dependency metadata capability query
//! - Fixed-point driver: every source is asked about every id discovered
//!   anywhere until no source owes a query
//! - Source-tagged candidates: records are deduplicated per (id, version,
//!   source); choosing a winner per release is the resolver's concern
//! - No shared state between invocations: sources, candidate set, and
//!   query ledger are constructed per gather call

pub mod config;
mod error;
pub mod framework;
pub mod gather;
pub mod metadata;
pub mod source;
pub mod version;

pub use config::{GatherConfig, SourceEntry, SourceEntryKind};
pub use error::{Error, Result};
pub use framework::{FrameworkVersion, TargetFramework};
pub use gather::{CandidateSet, GatherContext, gather};
pub use metadata::{
    DependencyGroup, DependencyInfo, PackageDependency, PackageIdentity,
    SourceTaggedDependencyInfo,
};
pub use source::{
    DependencyProvider, HttpDependencyProvider, InMemoryIndex, InjectedFailure,
    LocalFeedProvider, SourceError, SourceRepository,
};
pub use version::{FloatBehavior, Version, VersionRange};
