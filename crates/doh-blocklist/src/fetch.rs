//! Artifact fetch seam
//!
//! The loader is generic over [`ArtifactFetcher`] so the build pipeline
//! can be driven from in-memory artifact maps in tests. The production
//! implementation wraps a shared `reqwest` client.

use bytes::Bytes;
use doh_core::{BlocklistError, CoreResult};
use reqwest::header::CACHE_CONTROL;
use std::future::Future;
use std::time::Duration;

/// Fetches one artifact by URL
///
/// A non-2xx response (or a transport failure, reported as status 0) is a
/// [`BlocklistError::ArtifactFetch`]; the build aborts on the first one.
pub trait ArtifactFetcher: Send + Sync + 'static {
    fn fetch(&self, url: String) -> impl Future<Output = CoreResult<Bytes>> + Send;
}

/// HTTP fetcher for the artifact CDN
///
/// Artifacts are content-addressed by the bundle timestamp, so every
/// request carries a long `Cache-Control` hint for intermediaries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    cache_ttl_secs: u64,
}

impl HttpFetcher {
    pub fn new(cache_ttl_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("doh-blocklist/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            cache_ttl_secs,
        }
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: String) -> impl Future<Output = CoreResult<Bytes>> + Send {
        let client = self.client.clone();
        let cache_ttl_secs = self.cache_ttl_secs;
        async move {
            let response = client
                .get(&url)
                .header(CACHE_CONTROL, format!("max-age={cache_ttl_secs}"))
                .send()
                .await
                .map_err(|_| BlocklistError::fetch(url.clone(), 0))?;

            let status = response.status();
            if !status.is_success() {
                return Err(BlocklistError::fetch(url, status.as_u16()));
            }
            response
                .bytes()
                .await
                .map_err(|_| BlocklistError::fetch(url, 0))
        }
    }
}
