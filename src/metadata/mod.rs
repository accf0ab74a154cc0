// src/metadata/mod.rs

//! Dependency metadata records
//!
//! The data model flowing from sources through the gather into the
//! resolver: package identities, declared dependencies, dependency groups,
//! and the narrowed per-profile records a source query returns. Package
//! ids compare case-insensitively everywhere; the casing actually stored
//! is whatever the producing source supplied.

use crate::framework::TargetFramework;
use crate::source::SourceRepository;
use crate::version::{Version, VersionRange};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A (id, version) pair uniquely naming a package release
///
/// Equality ignores case on the id and is structural on the version.
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    pub id: String,
    pub version: Version,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Parse from an id plus a version string
    pub fn parse(id: impl Into<String>, version: &str) -> crate::Result<Self> {
        Ok(Self {
            id: id.into(),
            version: Version::parse(version)?,
        })
    }

    /// Lowercased id, the comparison key used throughout the gather
    pub fn id_key(&self) -> String {
        self.id.to_lowercase()
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A declared dependency: an id plus the range of versions that satisfy it
///
/// The range is carried through to the resolver untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    pub id: String,
    pub range: VersionRange,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    pub fn id_key(&self) -> String {
        self.id.to_lowercase()
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.range)
    }
}

/// One dependency group of a package declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub target_framework: TargetFramework,
    pub dependencies: Vec<PackageDependency>,
}

impl DependencyGroup {
    pub fn new(target_framework: TargetFramework, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            target_framework,
            dependencies,
        }
    }
}

/// A package's metadata narrowed to one target profile
///
/// Immutable once constructed. The dependency list is the single group the
/// source selected for the caller's target; `listed` reflects the source's
/// visibility flag for the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    identity: PackageIdentity,
    listed: bool,
    dependencies: Vec<PackageDependency>,
}

impl DependencyInfo {
    pub fn new(
        identity: PackageIdentity,
        listed: bool,
        dependencies: Vec<PackageDependency>,
    ) -> Self {
        Self {
            identity,
            listed,
            dependencies,
        }
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn listed(&self) -> bool {
        self.listed
    }

    pub fn dependencies(&self) -> &[PackageDependency] {
        &self.dependencies
    }

    /// Lowercased ids of the declared dependencies
    pub fn dependency_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.dependencies.iter().map(|d| d.id_key())
    }
}

/// A dependency record paired with the repository that produced it
///
/// Equality requires both the identity and the source to match: the same
/// release discovered in two repositories stays two records. That
/// provenance is what lets the resolver pick a winning source per release.
#[derive(Debug, Clone)]
pub struct SourceTaggedDependencyInfo {
    info: DependencyInfo,
    source: Arc<SourceRepository>,
}

impl SourceTaggedDependencyInfo {
    pub fn new(info: DependencyInfo, source: Arc<SourceRepository>) -> Self {
        Self { info, source }
    }

    pub fn info(&self) -> &DependencyInfo {
        &self.info
    }

    pub fn identity(&self) -> &PackageIdentity {
        self.info.identity()
    }

    pub fn source(&self) -> &SourceRepository {
        &self.source
    }
}

impl PartialEq for SourceTaggedDependencyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity() && *self.source == *other.source
    }
}

impl Eq for SourceTaggedDependencyInfo {}

impl fmt::Display for SourceTaggedDependencyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.info.identity(), self.source.name())
    }
}
