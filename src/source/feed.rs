// src/source/feed.rs

//! Package feed document model
//!
//! The HTTP and local-feed adapters serve the same JSON document shape:
//! one document per package id listing every known version with its
//! dependency groups. This module parses documents into records narrowed
//! to a target profile and expands a query result into the source-local
//! dependency closure.

use super::capability::{SourceError, SourceResult};
use crate::framework::{self, TargetFramework};
use crate::metadata::{DependencyGroup, DependencyInfo, PackageDependency, PackageIdentity};
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::future::Future;

fn default_listed() -> bool {
    true
}

/// Per-id feed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageIndexDoc {
    pub id: String,
    #[serde(default)]
    pub versions: Vec<PackageVersionDoc>,
}

/// One release within a feed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersionDoc {
    pub version: String,
    #[serde(default = "default_listed")]
    pub listed: bool,
    #[serde(default)]
    pub dependency_groups: Vec<DependencyGroupDoc>,
}

/// Declared dependency group; a missing target framework means "any"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGroupDoc {
    #[serde(default)]
    pub target_framework: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDoc>,
}

/// Declared dependency; a missing range means any version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDoc {
    pub id: String,
    #[serde(default)]
    pub range: Option<String>,
}

fn parse_groups(release: &PackageVersionDoc) -> SourceResult<Vec<DependencyGroup>> {
    release
        .dependency_groups
        .iter()
        .map(|g| {
            let target_framework = match g.target_framework.as_deref() {
                None => TargetFramework::Any,
                Some(s) => {
                    TargetFramework::parse(s).map_err(|e| SourceError::Malformed(e.to_string()))?
                }
            };
            let dependencies = g
                .dependencies
                .iter()
                .map(|d| {
                    let range = match d.range.as_deref() {
                        None => VersionRange::any(),
                        Some(r) => VersionRange::parse(r)
                            .map_err(|e| SourceError::Malformed(e.to_string()))?,
                    };
                    Ok(PackageDependency::new(d.id.clone(), range))
                })
                .collect::<SourceResult<Vec<_>>>()?;
            Ok(DependencyGroup::new(target_framework, dependencies))
        })
        .collect()
}

fn narrow(
    id: &str,
    version: Version,
    release: &PackageVersionDoc,
    target: &TargetFramework,
) -> SourceResult<DependencyInfo> {
    let groups = parse_groups(release)?;
    let dependencies = framework::select_nearest(&groups, target)
        .map(|g| g.dependencies.clone())
        .unwrap_or_default();
    Ok(DependencyInfo::new(
        PackageIdentity::new(id.to_string(), version),
        release.listed,
        dependencies,
    ))
}

/// Records for every visible release in a document
///
/// Listed releases always; unlisted prereleases only when prereleases were
/// requested; prereleases hidden entirely otherwise.
pub(crate) fn versions_from_doc(
    doc: &PackageIndexDoc,
    target: &TargetFramework,
    include_prerelease: bool,
) -> SourceResult<Vec<DependencyInfo>> {
    let mut records = Vec::new();
    for release in &doc.versions {
        let version =
            Version::parse(&release.version).map_err(|e| SourceError::Malformed(e.to_string()))?;
        if version.is_prerelease() && !include_prerelease {
            continue;
        }
        if !release.listed && !(include_prerelease && version.is_prerelease()) {
            continue;
        }
        records.push(narrow(&doc.id, version, release, target)?);
    }
    Ok(records)
}

/// Record for one exact release in a document, if present
///
/// Exact lookups ignore the listed flag; the record carries it for the
/// resolver to weigh.
pub(crate) fn identity_from_doc(
    doc: &PackageIndexDoc,
    identity: &PackageIdentity,
    target: &TargetFramework,
) -> SourceResult<Option<DependencyInfo>> {
    for release in &doc.versions {
        let version =
            Version::parse(&release.version).map_err(|e| SourceError::Malformed(e.to_string()))?;
        if version == identity.version {
            return narrow(&doc.id, version, release, target).map(Some);
        }
    }
    Ok(None)
}

/// Expand seed records into the source-local dependency closure
///
/// Breadth-first walk: every dependency id reachable from the seed records
/// is loaded through `load` exactly once, and the records it yields join
/// the result. `seed_ids` are the ids already answered by the seed query;
/// they are never re-loaded, which also makes dependency cycles terminate.
pub(crate) async fn expand_closure<F, Fut>(
    seed_ids: &[String],
    seed: Vec<DependencyInfo>,
    mut load: F,
) -> SourceResult<Vec<DependencyInfo>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = SourceResult<Vec<DependencyInfo>>>,
{
    let mut visited: HashSet<String> = seed_ids.iter().map(|s| s.to_lowercase()).collect();
    let mut queue: VecDeque<String> = VecDeque::new();
    for record in &seed {
        for dep in record.dependency_ids() {
            if !visited.contains(&dep) {
                queue.push_back(dep);
            }
        }
    }

    let mut records = seed;
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let found = load(id).await?;
        for record in &found {
            for dep in record.dependency_ids() {
                if !visited.contains(&dep) {
                    queue.push_back(dep);
                }
            }
        }
        records.extend(found);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, versions: Vec<PackageVersionDoc>) -> PackageIndexDoc {
        PackageIndexDoc {
            id: id.to_string(),
            versions,
        }
    }

    fn release(version: &str, listed: bool, deps: &[(&str, &str)]) -> PackageVersionDoc {
        PackageVersionDoc {
            version: version.to_string(),
            listed,
            dependency_groups: vec![DependencyGroupDoc {
                target_framework: None,
                dependencies: deps
                    .iter()
                    .map(|(id, range)| DependencyDoc {
                        id: id.to_string(),
                        range: Some(range.to_string()),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_versions_hide_prereleases_by_default() {
        let doc = doc(
            "pkg",
            vec![release("1.0.0", true, &[]), release("2.0.0-beta", true, &[])],
        );
        let records = versions_from_doc(&doc, &TargetFramework::Any, false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity().version.to_string(), "1.0.0");

        let records = versions_from_doc(&doc, &TargetFramework::Any, true).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_versions_hide_unlisted_except_prerelease_opt_in() {
        let doc = doc(
            "pkg",
            vec![
                release("1.0.0", false, &[]),
                release("2.0.0-rc.1", false, &[]),
            ],
        );
        let records = versions_from_doc(&doc, &TargetFramework::Any, false).unwrap();
        assert!(records.is_empty());

        let records = versions_from_doc(&doc, &TargetFramework::Any, true).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].identity().version.is_prerelease());
    }

    #[test]
    fn test_identity_lookup_ignores_listed() {
        let doc = doc("pkg", vec![release("1.0.0", false, &[("dep", "1.0")])]);
        let identity = PackageIdentity::parse("PKG", "1.0.0").unwrap();
        let record = identity_from_doc(&doc, &identity, &TargetFramework::Any)
            .unwrap()
            .unwrap();
        assert!(!record.listed());
        assert_eq!(record.dependencies().len(), 1);
        // Canonical casing comes from the document, not the query
        assert_eq!(record.identity().id, "pkg");
    }

    #[test]
    fn test_malformed_version_rejected() {
        let doc = doc("pkg", vec![release("not-a-version", true, &[])]);
        let err = versions_from_doc(&doc, &TargetFramework::Any, false).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn test_malformed_range_rejected() {
        let doc = doc("pkg", vec![release("1.0.0", true, &[("dep", "[oops")])]);
        let err = versions_from_doc(&doc, &TargetFramework::Any, false).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_expand_closure_walks_dependencies_once() {
        use std::collections::HashMap;
        use std::sync::Mutex;

        let a = versions_from_doc(
            &doc("a", vec![release("1.0.0", true, &[("b", "1.0"), ("c", "1.0")])]),
            &TargetFramework::Any,
            false,
        )
        .unwrap();
        let b = versions_from_doc(
            &doc("b", vec![release("1.0.0", true, &[("c", "1.0")])]),
            &TargetFramework::Any,
            false,
        )
        .unwrap();
        let c = versions_from_doc(
            &doc("c", vec![release("1.0.0", true, &[("a", "1.0")])]),
            &TargetFramework::Any,
            false,
        )
        .unwrap();

        let mut feed: HashMap<String, Vec<DependencyInfo>> = HashMap::new();
        feed.insert("b".to_string(), b);
        feed.insert("c".to_string(), c);
        let loads = Mutex::new(Vec::new());

        let records = expand_closure(&["a".to_string()], a, |id| {
            loads.lock().unwrap().push(id.clone());
            let found = feed.get(&id).cloned().unwrap_or_default();
            async move { Ok(found) }
        })
        .await
        .unwrap();

        // a, b and c each appear once; the cycle back to a is not re-loaded
        assert_eq!(records.len(), 3);
        let mut loaded = loads.into_inner().unwrap();
        loaded.sort();
        assert_eq!(loaded, vec!["b".to_string(), "c".to_string()]);
    }
}
