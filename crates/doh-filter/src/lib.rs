//! Succinct blocklist filter for the DoH resolver
//!
//! This crate implements the filter subsystem: a level-ordered,
//! unary-degree-encoded trie over millions of reversed-label domain keys,
//! navigated in O(1) per step via a rank directory, with a delta-coded
//! list-ID set at every terminal. It also carries the producer side of
//! the format so fixtures and offline artifacts come from the same
//! constants the consumer reads.

pub mod bitvec;
pub mod builder;
pub mod codec;
pub mod filter;
pub mod format;
pub mod trie;

pub use bitvec::{BitVector, BitWriter, RankDirectory};
pub use builder::{split_parts, TrieArtifacts, TrieBuilder};
pub use filter::{BlocklistFilter, FilterStats, FilterStatsSnapshot};
pub use trie::{FrozenTrie, SuffixMatch};
