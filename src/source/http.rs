// src/source/http.rs

//! HTTP feed adapter
//!
//! Fetches per-id feed documents from a remote repository endpoint,
//! `{base}/v1/packages/{id-lowercase}/index.json`, with a bounded retry on
//! transport failures. An HTTP 404 means the id is not published at this
//! source and is an empty result, not an error.

use super::capability::{DependencyProvider, SourceError, SourceResult};
use super::feed::{self, PackageIndexDoc};
use crate::error::{Error, Result};
use crate::framework::TargetFramework;
use crate::metadata::{DependencyInfo, PackageIdentity};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default timeout for feed requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts after a failed request
const MAX_RETRIES: u32 = 2;

/// Delay between retries in milliseconds
const RETRY_DELAY_MS: u64 = 500;

/// Dependency provider over a remote HTTP feed
pub struct HttpDependencyProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Builder for [`HttpDependencyProvider`]
pub struct HttpDependencyProviderBuilder {
    name: String,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl HttpDependencyProviderBuilder {
    pub fn new(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: HTTP_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set retry attempts after a failed request
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<HttpDependencyProvider> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(HttpDependencyProvider {
            name: self.name,
            base_url: self.base_url,
            client,
            max_retries: self.max_retries,
        })
    }
}

impl HttpDependencyProvider {
    /// Create a provider with default options
    pub fn new(name: &str, base_url: &str) -> Result<Self> {
        HttpDependencyProviderBuilder::new(name, base_url).build()
    }

    /// Create a builder for more configuration options
    pub fn builder(name: &str, base_url: &str) -> HttpDependencyProviderBuilder {
        HttpDependencyProviderBuilder::new(name, base_url)
    }

    async fn fetch_doc(&self, id_key: &str) -> SourceResult<Option<PackageIndexDoc>> {
        let url = format!("{}/v1/packages/{}/index.json", self.base_url, id_key);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        debug!("GET {} returned 404; id not published here", url);
                        return Ok(None);
                    }
                    if status.is_success() {
                        return response
                            .json::<PackageIndexDoc>()
                            .await
                            .map(Some)
                            .map_err(|e| SourceError::Malformed(format!("{url}: {e}")));
                    }
                    if !(status.is_server_error() && attempt <= self.max_retries) {
                        return Err(SourceError::Unavailable(format!(
                            "{url} returned HTTP {status}"
                        )));
                    }
                    debug!(
                        "GET {} returned HTTP {}, retrying ({}/{})",
                        url, status, attempt, self.max_retries
                    );
                }
                Err(e) if attempt <= self.max_retries => {
                    debug!("GET {} failed: {}, retrying ({}/{})", url, e, attempt, self.max_retries);
                }
                Err(e) => return Err(SourceError::Unavailable(format!("{url}: {e}"))),
            }
            tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
        }
    }

    async fn fetch_versions(
        &self,
        id_key: &str,
        target: &TargetFramework,
        include_prerelease: bool,
    ) -> SourceResult<Vec<DependencyInfo>> {
        match self.fetch_doc(id_key).await? {
            Some(doc) => feed::versions_from_doc(&doc, target, include_prerelease),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl DependencyProvider for HttpDependencyProvider {
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
            if let Some(doc) = self.fetch_doc(&id_key).await?
                && let Some(record) = feed::identity_from_doc(&doc, identity, target)?
            {
                seed.push(record);
            }
            seed_ids.push(id_key);
        }

        feed::expand_closure(&seed_ids, seed, |id| async move {
            self.fetch_versions(&id, target, include_prerelease).await
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
                .fetch_versions(&id.to_lowercase(), target, include_prerelease)
                .await?;
            feed::expand_closure(&[id.to_lowercase()], seed, |dep| async move {
                self.fetch_versions(&dep, target, include_prerelease).await
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_trims_trailing_slash() {
        let provider = HttpDependencyProvider::new("remote", "https://feed.example.com/").unwrap();
        assert_eq!(provider.base_url, "https://feed.example.com");
        assert_eq!(provider.name(), "remote");
    }

    #[test]
    fn test_builder_options() {
        let provider = HttpDependencyProvider::builder("remote", "https://feed.example.com")
            .timeout_secs(5)
            .max_retries(0)
            .build()
            .unwrap();
        assert_eq!(provider.max_retries, 0);
    }
}
