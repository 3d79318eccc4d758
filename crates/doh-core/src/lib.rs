//! Core types, error handling, and configuration for the DoH blocklist
//! resolver
//!
//! This crate provides the foundational types shared by the filter and
//! acquisition crates: the error taxonomy, the blocklist configuration
//! struct, the file-tag manifest model, and the verdict types produced by
//! classification.

pub mod config;
pub mod error;
pub mod filetag;
pub mod verdict;

pub use config::BlocklistConfig;
pub use error::{BlocklistError, CoreResult};
pub use filetag::{FileTag, FileTagIndex};
pub use verdict::{AggregateVerdict, DomainInfo, UserBitmap, Verdict};
