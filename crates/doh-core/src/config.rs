//! Blocklist configuration

use crate::{BlocklistError, CoreResult};
use serde::{Deserialize, Serialize};

/// Default artifact distribution base URL
pub const DEFAULT_BLOCKLIST_URL: &str = "https://dist.rethinkdns.com/blocklists/";

/// Default versioned bundle timestamp
pub const DEFAULT_LATEST_TIMESTAMP: &str = "1667349440226";

/// Default waiter deadline in milliseconds
pub const DEFAULT_DOWNLOAD_TIMEOUT_MS: u64 = 5_000;

/// Default CDN cache hint in seconds (artifacts are content-addressed by
/// timestamp, so two weeks is safe)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Configuration for blocklist acquisition and construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistConfig {
    /// Base URL prefix for the artifact bundle
    pub blocklist_url: String,
    /// Path segment selecting a versioned bundle
    pub latest_timestamp: String,
    /// Declared trie node count (the blob carries no terminator)
    pub td_nodecount: u64,
    /// Largest td part index, or -1 for a single `td.txt`
    pub td_parts: i32,
    /// How long a `get()` caller waits for an in-flight build, in milliseconds
    pub download_timeout_ms: u64,
    /// CDN/HTTP cache hint attached to artifact fetches, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            blocklist_url: DEFAULT_BLOCKLIST_URL.to_string(),
            latest_timestamp: DEFAULT_LATEST_TIMESTAMP.to_string(),
            td_nodecount: 0,
            td_parts: -1,
            download_timeout_ms: DEFAULT_DOWNLOAD_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl BlocklistConfig {
    /// Validate the configuration before a build is attempted
    pub fn validate(&self) -> CoreResult<()> {
        if self.blocklist_url.is_empty() {
            return Err(BlocklistError::InvalidConfiguration {
                reason: "blocklist_url is empty".to_string(),
            });
        }
        if self.latest_timestamp.is_empty() {
            return Err(BlocklistError::InvalidConfiguration {
                reason: "latest_timestamp is empty".to_string(),
            });
        }
        if self.td_nodecount == 0 {
            return Err(BlocklistError::InvalidConfiguration {
                reason: "td_nodecount must be declared".to_string(),
            });
        }
        if self.td_parts < -1 {
            return Err(BlocklistError::InvalidConfiguration {
                reason: format!("td_parts must be >= -1, got {}", self.td_parts),
            });
        }
        Ok(())
    }

    /// Versioned base URL for this bundle, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}{}", self.blocklist_url, self.latest_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_needs_nodecount() {
        let config = BlocklistConfig::default();
        assert!(config.validate().is_err());

        let config = BlocklistConfig {
            td_nodecount: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_joins_timestamp() {
        let config = BlocklistConfig {
            blocklist_url: "https://cdn.example/blocklists/".to_string(),
            latest_timestamp: "1667349440226".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.base_url(),
            "https://cdn.example/blocklists/1667349440226"
        );
    }

    #[test]
    fn test_invalid_td_parts() {
        let config = BlocklistConfig {
            td_nodecount: 10,
            td_parts: -2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
