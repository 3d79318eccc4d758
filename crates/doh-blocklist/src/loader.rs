//! Fetch, assemble, and construct the blocklist filter
//!
//! Three artifacts make up a bundle: the file-tag manifest, the rank
//! directory, and the trie blob (a single `td.txt` or ordered parts
//! `td00.txt..td{NN}.txt`). All fetches run concurrently and all must
//! succeed; the assembled blob and directory are handed to the trie
//! constructor and wrapped with the manifest.

use crate::fetch::ArtifactFetcher;
use bytes::{Bytes, BytesMut};
use doh_core::{BlocklistConfig, BlocklistError, CoreResult, FileTagIndex};
use doh_filter::{BlocklistFilter, FrozenTrie};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds a [`BlocklistFilter`] from a configured artifact bundle
#[derive(Debug)]
pub struct BlocklistLoader<F> {
    fetcher: Arc<F>,
    config: BlocklistConfig,
}

impl<F: ArtifactFetcher> BlocklistLoader<F> {
    pub fn new(config: BlocklistConfig, fetcher: F) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            config,
        })
    }

    pub fn config(&self) -> &BlocklistConfig {
        &self.config
    }

    /// Run one full build
    ///
    /// `rxid` is the correlation id of the request that triggered the
    /// build, used only for logging.
    pub async fn load(&self, rxid: &str) -> CoreResult<BlocklistFilter> {
        let base = self.config.base_url();
        info!("[{rxid}] building blocklist filter from {base}");

        let (tags, rd, td) = tokio::try_join!(
            self.fetch_manifest(&base),
            self.fetch_rank_directory(&base),
            self.fetch_trie(rxid, &base),
        )?;

        let trie = FrozenTrie::new(td, rd, self.config.td_nodecount)?;
        let filter = BlocklistFilter::new(trie, tags)?;
        info!(
            "[{rxid}] blocklist filter ready: {} stored names across {} lists",
            filter.stored_count(),
            filter.list_count()
        );
        Ok(filter)
    }

    async fn fetch_manifest(&self, base: &str) -> CoreResult<FileTagIndex> {
        let bytes = self.fetcher.fetch(format!("{base}/filetag.json")).await?;
        FileTagIndex::from_json(&bytes)
    }

    async fn fetch_rank_directory(&self, base: &str) -> CoreResult<Bytes> {
        let bytes = self.fetcher.fetch(format!("{base}/rd.txt")).await?;
        if bytes.is_empty() {
            return Err(BlocklistError::assembly("rank directory is empty"));
        }
        Ok(bytes)
    }

    /// Fetch the trie blob, concatenating multi-part bundles in order
    async fn fetch_trie(&self, rxid: &str, base: &str) -> CoreResult<Bytes> {
        if self.config.td_parts <= -1 {
            let bytes = self.fetcher.fetch(format!("{base}/td.txt")).await?;
            if bytes.is_empty() {
                return Err(BlocklistError::assembly("trie blob is empty"));
            }
            return Ok(bytes);
        }

        let urls: Vec<String> = (0..=self.config.td_parts)
            .map(|i| format!("{base}/td{i:02}.txt"))
            .collect();
        let parts = try_join_all(urls.iter().map(|url| self.fetcher.fetch(url.clone()))).await?;

        let mut assembled = BytesMut::new();
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(BlocklistError::assembly(format!("td part {i:02} is empty")));
            }
            assembled.extend_from_slice(part);
        }
        debug!(
            "[{rxid}] assembled {} td parts into {} bytes",
            parts.len(),
            assembled.len()
        );
        Ok(assembled.freeze())
    }
}
