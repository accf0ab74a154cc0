// src/gather/driver.rs

//! Fixed-point gather driver
//!
//! Coordinates the candidate set and queried ledger toward a fixed point:
//! in each pass, every source is asked about every id discovered anywhere
//! but not yet queried there, and the gather terminates when a full pass
//! turns up no pending work. Bookkeeping is single-threaded on the driver
//! task; network queries fan out concurrently up to the parallelism bound,
//! with completions serialized back through the driving stream.
//!
//! Termination: each source's ledger entry only grows and is bounded by
//! the finite set of ids any source knows. Every query either shrinks some
//! source's pending set or discovers ids that do, so total work is bounded
//! by O(sources × discovered ids).

use super::GatherContext;
use super::candidates::CandidateSet;
use super::ledger::QueriedLedger;
use crate::error::{Error, Result};
use crate::framework::TargetFramework;
use crate::metadata::{DependencyInfo, PackageIdentity, SourceTaggedDependencyInfo};
use crate::source::{DependencyProvider, SourceError, SourceRepository};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A surviving source: catalog reference plus its query capability
#[derive(Clone)]
pub(crate) struct GatherSource {
    pub(crate) repo: Arc<SourceRepository>,
    pub(crate) provider: Arc<dyn DependencyProvider>,
}

pub(crate) struct GatherDriver {
    sources: Vec<GatherSource>,
    target: TargetFramework,
    include_prerelease: bool,
    parallelism: usize,
    cancel: CancellationToken,
    candidates: CandidateSet,
    ledger: QueriedLedger,
}

impl GatherDriver {
    pub(crate) fn new(
        sources: Vec<GatherSource>,
        target: TargetFramework,
        context: &GatherContext,
        cancel: CancellationToken,
    ) -> Self {
        let parallelism = if context.max_parallelism == 0 {
            sources.len().max(1)
        } else {
            context.max_parallelism
        };
        let ledger = QueriedLedger::new(sources.len());
        Self {
            sources,
            target,
            include_prerelease: context.include_prerelease,
            parallelism,
            cancel,
            candidates: CandidateSet::new(),
            ledger,
        }
    }

    /// Drive the gather to its fixed point
    pub(crate) async fn run(
        mut self,
        root: &PackageIdentity,
    ) -> Result<(CandidateSet, QueriedLedger)> {
        self.ensure_not_cancelled()?;
        self.seed(root).await?;

        let mut pass = 0usize;
        loop {
            self.ensure_not_cancelled()?;

            let universe = self.ledger.union_all();
            let mut work = Vec::new();
            for index in 0..self.sources.len() {
                for id in self.ledger.missing_for(index, &universe) {
                    work.push((index, id));
                }
            }
            if work.is_empty() {
                break;
            }

            pass += 1;
            debug!(
                "Gather pass {}: {} pending queries across {} sources",
                pass,
                work.len(),
                self.sources.len()
            );

            // Pre-mark before dispatch: a failed query still counts as
            // queried and is never retried
            for (index, id) in &work {
                self.ledger.mark(*index, id);
            }
            self.run_queries(work).await?;
        }

        info!(
            "Gather complete: {} records across {} ids in {} passes",
            self.candidates.len(),
            self.candidates.known_ids().len(),
            pass
        );
        Ok((self.candidates, self.ledger))
    }

    /// Query the root identity against every source
    async fn seed(&mut self, root: &PackageIdentity) -> Result<()> {
        for index in 0..self.sources.len() {
            self.ledger.mark(index, &root.id);
        }

        let sources = self.sources.clone();
        let target = self.target.clone();
        let include_prerelease = self.include_prerelease;
        let root_id = root.id.clone();
        let root = root.clone();

        let seeds = stream::iter(sources.into_iter().enumerate())
            .map(|(index, source)| {
                let root = root.clone();
                let target = target.clone();
                async move {
                    let result = source
                        .provider
                        .resolve_by_identity(
                            std::slice::from_ref(&root),
                            &target,
                            include_prerelease,
                        )
                        .await;
                    (index, result)
                }
            })
            .buffer_unordered(self.parallelism);
        futures::pin_mut!(seeds);

        while let Some((index, result)) = seeds.next().await {
            match result {
                Ok(records) => self.absorb(index, records),
                Err(SourceError::Cancelled) => return Err(Error::Cancelled),
                Err(e) => warn!(
                    "Source {} failed resolving {}: {}",
                    self.sources[index].repo, root_id, e
                ),
            }
        }
        Ok(())
    }

    /// Fan pending (source, id) queries out and fold completions back in
    async fn run_queries(&mut self, work: Vec<(usize, String)>) -> Result<()> {
        let sources = self.sources.clone();
        let cancel = self.cancel.clone();
        let target = self.target.clone();
        let include_prerelease = self.include_prerelease;

        let queries = stream::iter(work.into_iter())
            .map(|(index, id)| {
                let source = sources[index].clone();
                let cancel = cancel.clone();
                let target = target.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (index, id, Err(SourceError::Cancelled));
                    }
                    let result = source
                        .provider
                        .resolve_by_id(&id, &target, include_prerelease, &cancel)
                        .await;
                    (index, id, result)
                }
            })
            .buffer_unordered(self.parallelism);
        futures::pin_mut!(queries);

        while let Some((index, id, result)) = queries.next().await {
            match result {
                Ok(records) => {
                    if records.is_empty() {
                        debug!(
                            "Id {} not found in source {}",
                            id,
                            self.sources[index].repo.name()
                        );
                    }
                    self.absorb(index, records);
                }
                Err(SourceError::Cancelled) => return Err(Error::Cancelled),
                Err(e) => warn!(
                    "Source {} failed resolving {}: {}",
                    self.sources[index].repo, id, e
                ),
            }
        }
        Ok(())
    }

    /// Fold a query's records into the candidate set and ledger
    ///
    /// Declared dependency ids count as covered for the answering source
    /// only — its closure already contained whatever it knows about them.
    /// Peers still owe a query for every new id.
    fn absorb(&mut self, index: usize, records: Vec<DependencyInfo>) {
        let repo = self.sources[index].repo.clone();
        let mut added = 0usize;
        for record in records {
            for dep in record.dependency_ids() {
                self.ledger.mark(index, &dep);
            }
            if self
                .candidates
                .insert(SourceTaggedDependencyInfo::new(record, repo.clone()))
            {
                added += 1;
            }
        }
        if added > 0 {
            debug!("Source {} contributed {} new records", repo.name(), added);
        }
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{DependencyGroup, PackageDependency};
    use crate::source::{InMemoryIndex, SourceResult};
    use crate::version::VersionRange;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::parse(id, version).unwrap()
    }

    fn any_group(deps: &[(&str, &str)]) -> Vec<DependencyGroup> {
        vec![DependencyGroup::new(
            TargetFramework::Any,
            deps.iter()
                .map(|(id, range)| {
                    PackageDependency::new(*id, VersionRange::parse(range).unwrap())
                })
                .collect(),
        )]
    }

    fn memory_source(name: &str, packages: &[(&str, &str, &[(&str, &str)])]) -> GatherSource {
        let mut index = InMemoryIndex::new();
        for (id, version, deps) in packages {
            index.add(identity(id, version), true, any_group(deps));
        }
        let repo = SourceRepository::memory(name, Arc::new(index));
        let provider = repo.dependency_provider().unwrap().unwrap();
        GatherSource {
            repo: Arc::new(repo),
            provider,
        }
    }

    /// Wraps a provider and records which ids resolve_by_id is asked for
    struct RecordingProvider {
        inner: Arc<dyn DependencyProvider>,
        by_id_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DependencyProvider for RecordingProvider {
        async fn resolve_by_identity(
            &self,
            identities: &[PackageIdentity],
            target: &TargetFramework,
            include_prerelease: bool,
        ) -> SourceResult<Vec<DependencyInfo>> {
            self.inner
                .resolve_by_identity(identities, target, include_prerelease)
                .await
        }

        async fn resolve_by_id(
            &self,
            id: &str,
            target: &TargetFramework,
            include_prerelease: bool,
            cancel: &CancellationToken,
        ) -> SourceResult<Vec<DependencyInfo>> {
            self.by_id_calls.lock().unwrap().push(id.to_lowercase());
            self.inner
                .resolve_by_id(id, target, include_prerelease, cancel)
                .await
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    async fn run(
        sources: Vec<GatherSource>,
        root: &PackageIdentity,
    ) -> (CandidateSet, QueriedLedger) {
        let driver = GatherDriver::new(
            sources,
            TargetFramework::Any,
            &GatherContext::default(),
            CancellationToken::new(),
        );
        driver.run(root).await.unwrap()
    }

    #[tokio::test]
    async fn test_ledger_covers_every_declared_dependency() {
        let x = memory_source(
            "x",
            &[("a", "1.0.0", &[("b", "1.0"), ("ghost", "1.0")]), ("b", "1.0.0", &[])],
        );
        let y = memory_source("y", &[("c", "1.0.0", &[])]);

        let (candidates, ledger) = run(vec![x, y], &identity("a", "1.0.0")).await;

        for record in candidates.snapshot() {
            for dep in record.info().dependency_ids() {
                let covered = (0..2).any(|index| ledger.contains(index, &dep));
                assert!(covered, "dependency id {dep} missing from every ledger");
            }
        }
        // "ghost" exists nowhere but was still queried everywhere
        assert!(ledger.contains(0, "ghost"));
        assert!(ledger.contains(1, "ghost"));
    }

    #[tokio::test]
    async fn test_identity_closure_covers_source_ledger_only() {
        // x answers the root identity with its closure (a and b); the
        // covering mark must stop x from being asked about b again, while
        // y, which never saw that closure, still gets asked
        let x_index = {
            let mut index = InMemoryIndex::new();
            index.add(identity("a", "1.0.0"), true, any_group(&[("b", "1.0")]));
            index.add(identity("b", "1.0.0"), true, any_group(&[]));
            index
        };
        let x_repo = SourceRepository::memory("x", Arc::new(x_index));
        let x_recorder = Arc::new(RecordingProvider {
            inner: x_repo.dependency_provider().unwrap().unwrap(),
            by_id_calls: Mutex::new(Vec::new()),
        });
        let x = GatherSource {
            repo: Arc::new(x_repo),
            provider: x_recorder.clone(),
        };

        let y_index = {
            let mut index = InMemoryIndex::new();
            index.add(identity("b", "1.0.0"), true, any_group(&[]));
            index
        };
        let y_repo = SourceRepository::memory("y", Arc::new(y_index));
        let y_recorder = Arc::new(RecordingProvider {
            inner: y_repo.dependency_provider().unwrap().unwrap(),
            by_id_calls: Mutex::new(Vec::new()),
        });
        let y = GatherSource {
            repo: Arc::new(y_repo),
            provider: y_recorder.clone(),
        };

        let (candidates, _) = run(vec![x, y], &identity("a", "1.0.0")).await;

        assert!(x_recorder.by_id_calls.lock().unwrap().is_empty());
        assert_eq!(
            *y_recorder.by_id_calls.lock().unwrap(),
            vec!["b".to_string()]
        );
        // b surfaces from both sources regardless
        let b_sources: Vec<String> = candidates
            .snapshot()
            .iter()
            .filter(|r| r.identity().id_key() == "b")
            .map(|r| r.source().name().to_string())
            .collect();
        assert_eq!(b_sources.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_query_is_not_retried() {
        use crate::source::InjectedFailure;

        let mut index = InMemoryIndex::new();
        index.add(identity("a", "1.0.0"), true, any_group(&[]));
        let index = index.with_failure(InjectedFailure::Unavailable);
        let repo = SourceRepository::memory("flaky", Arc::new(index));
        let recorder = Arc::new(RecordingProvider {
            inner: repo.dependency_provider().unwrap().unwrap(),
            by_id_calls: Mutex::new(Vec::new()),
        });
        let flaky = GatherSource {
            repo: Arc::new(repo),
            provider: recorder.clone(),
        };
        let good = memory_source("good", &[("a", "1.0.0", &[("b", "1.0")]), ("b", "1.0.0", &[])]);

        let (candidates, ledger) = run(vec![flaky, good], &identity("a", "1.0.0")).await;

        // flaky was asked about b exactly once despite failing
        let calls = recorder.by_id_calls.lock().unwrap().clone();
        let b_calls: HashMap<&String, usize> =
            calls.iter().fold(HashMap::new(), |mut acc, id| {
                *acc.entry(id).or_default() += 1;
                acc
            });
        assert!(b_calls.values().all(|&count| count == 1));
        assert!(ledger.contains(0, "a"));
        assert!(ledger.contains(0, "b"));
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_serial_parallelism_reaches_same_fixed_point() {
        let sources = || {
            vec![
                memory_source("x", &[("a", "1.0.0", &[("b", "1.0")]), ("c", "1.0.0", &[])]),
                memory_source("y", &[("b", "1.0.0", &[("d", "1.0")]), ("d", "1.0.0", &[])]),
            ]
        };

        let serial = GatherDriver::new(
            sources(),
            TargetFramework::Any,
            &GatherContext {
                include_prerelease: false,
                max_parallelism: 1,
            },
            CancellationToken::new(),
        );
        let (candidates, _) = serial.run(&identity("a", "1.0.0")).await.unwrap();

        let mut found: Vec<(String, String)> = candidates
            .snapshot()
            .iter()
            .map(|r| (r.identity().id_key(), r.source().name().to_string()))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("a".to_string(), "x".to_string()),
                ("b".to_string(), "y".to_string()),
                ("d".to_string(), "y".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancellation_before_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let driver = GatherDriver::new(
            vec![memory_source("x", &[("a", "1.0.0", &[])])],
            TargetFramework::Any,
            &GatherContext::default(),
            cancel,
        );
        let err = driver.run(&identity("a", "1.0.0")).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
