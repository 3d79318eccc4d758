//! Blocklist acquisition for the DoH resolver
//!
//! Fetches the multi-part trie blob, rank directory, and file-tag
//! manifest, assembles them into a [`doh_filter::BlocklistFilter`], and
//! gates construction behind an at-most-one-build wrapper that concurrent
//! request handlers share.

pub mod fetch;
pub mod loader;
pub mod wrapper;

pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use loader::BlocklistLoader;
pub use wrapper::BlocklistWrapper;
