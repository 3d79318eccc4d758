//! Error handling for the blocklist resolver core
//!
//! All failures observable at the core boundary are expressed as
//! [`BlocklistError`] variants. Build-time failures are recoverable (the
//! wrapper resets and a later caller may retry); hot-path invariant
//! violations are programmer errors and panic instead of surfacing here.

use thiserror::Error;

/// Main result type used throughout the resolver core
pub type CoreResult<T> = Result<T, BlocklistError>;

/// Errors observable at the core boundary
#[derive(Error, Debug, Clone)]
pub enum BlocklistError {
    #[error("artifact fetch failed: {url} returned status {status}")]
    ArtifactFetch { url: String, status: u16 },

    #[error("artifact assembly failed: {reason}")]
    ArtifactAssembly { reason: String },

    #[error("malformed trie artifact: {reason}")]
    TrieFormat { reason: String },

    #[error("blocklist build did not finish within {timeout_ms}ms")]
    BuildTimeout { timeout_ms: u64 },

    #[error("blocklist filter is not ready")]
    NotReady,

    #[error("malformed file-tag manifest: {reason}")]
    Manifest { reason: String },

    #[error("invalid domain name: {name:?}")]
    InvalidName { name: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl BlocklistError {
    /// Create a new artifact fetch error
    pub fn fetch(url: impl Into<String>, status: u16) -> Self {
        Self::ArtifactFetch {
            url: url.into(),
            status,
        }
    }

    /// Create a new artifact assembly error
    pub fn assembly(reason: impl Into<String>) -> Self {
        Self::ArtifactAssembly {
            reason: reason.into(),
        }
    }

    /// Create a new trie format error
    pub fn trie_format(reason: impl Into<String>) -> Self {
        Self::TrieFormat {
            reason: reason.into(),
        }
    }

    /// Create a new manifest error
    pub fn manifest(reason: impl Into<String>) -> Self {
        Self::Manifest {
            reason: reason.into(),
        }
    }

    /// Check if a later attempt may succeed
    ///
    /// Fetch failures, timeouts and transient readiness are retryable;
    /// malformed artifacts and configuration are not (the same inputs
    /// would fail the same way).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ArtifactFetch { .. } | Self::BuildTimeout { .. } | Self::NotReady => true,
            Self::ArtifactAssembly { .. }
            | Self::TrieFormat { .. }
            | Self::Manifest { .. }
            | Self::InvalidName { .. }
            | Self::InvalidConfiguration { .. } => false,
        }
    }

    /// Error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::ArtifactFetch { .. } => "fetch",
            Self::ArtifactAssembly { .. } => "assembly",
            Self::TrieFormat { .. } | Self::Manifest { .. } => "format",
            Self::BuildTimeout { .. } | Self::NotReady => "availability",
            Self::InvalidName { .. } => "input",
            Self::InvalidConfiguration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(BlocklistError::fetch("http://x/td00.txt", 503).is_recoverable());
        assert!(BlocklistError::BuildTimeout { timeout_ms: 5000 }.is_recoverable());
        assert!(!BlocklistError::trie_format("rank mismatch").is_recoverable());
        assert!(!BlocklistError::manifest("bad key").is_recoverable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(BlocklistError::fetch("u", 404).category(), "fetch");
        assert_eq!(BlocklistError::NotReady.category(), "availability");
        assert_eq!(
            BlocklistError::InvalidName { name: "".into() }.category(),
            "input"
        );
    }
}
