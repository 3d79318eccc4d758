//! Public query API over the frozen trie and the file-tag manifest
//!
//! The hot path (`classify_name`) is pure CPU against an immutable
//! snapshot: no locks, no allocation beyond the verdict itself, safe for
//! any number of concurrent callers.

use crate::format::LABEL_SENTINEL;
use crate::trie::FrozenTrie;
use doh_core::{
    AggregateVerdict, BlocklistError, CoreResult, DomainInfo, FileTagIndex, UserBitmap, Verdict,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Canonical form of a query name: ASCII-lowercased, one trailing dot
/// stripped, never empty
///
/// Non-ASCII bytes pass through unchanged; callers are expected to supply
/// A-labels for IDNs.
pub fn canonicalize(name: &str) -> CoreResult<String> {
    let mut out = name.to_ascii_lowercase();
    if out.ends_with('.') {
        out.pop();
    }
    if out.is_empty() {
        return Err(BlocklistError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(out)
}

/// Trie key for a canonical name: labels reversed (not characters) and
/// joined with the sentinel byte, so `ab.c` and `a.bc` share no path
pub fn reversed_label_key(canonical: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(canonical.len());
    for (i, label) in canonical.split('.').rev().enumerate() {
        if i > 0 {
            key.push(LABEL_SENTINEL);
        }
        key.extend_from_slice(label.as_bytes());
    }
    key
}

/// Display form of the matched suffix: the last `consumed`-key-bytes worth
/// of labels of the canonical name
fn matched_suffix(canonical: &str, key: &[u8], matched_len: usize) -> String {
    let labels_matched = key[..matched_len]
        .iter()
        .filter(|&&b| b == LABEL_SENTINEL)
        .count()
        + 1;
    let labels: Vec<&str> = canonical.split('.').collect();
    labels[labels.len() - labels_matched..].join(".")
}

/// Lock-free hot-path counters
#[derive(Debug, Default)]
pub struct FilterStats {
    lookups: AtomicU64,
    suffix_matches: AtomicU64,
    blocked: AtomicU64,
}

/// Point-in-time view of [`FilterStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStatsSnapshot {
    pub lookups: u64,
    pub suffix_matches: u64,
    pub blocked: u64,
}

/// Immutable blocklist filter: succinct trie plus manifest
#[derive(Debug)]
pub struct BlocklistFilter {
    trie: FrozenTrie,
    tags: FileTagIndex,
    stats: FilterStats,
}

impl BlocklistFilter {
    /// Wrap a constructed trie and its manifest
    ///
    /// Every terminal value is decoded once here, so hot-path decoding can
    /// never observe a corrupt artifact.
    pub fn new(trie: FrozenTrie, tags: FileTagIndex) -> CoreResult<Self> {
        trie.validate_values(tags.len() as u32)?;
        debug!(
            "blocklist filter ready: {} nodes, {} stored names, {} source lists",
            trie.node_count(),
            trie.terminal_count(),
            tags.len()
        );
        Ok(Self {
            trie,
            tags,
            stats: FilterStats::default(),
        })
    }

    /// Number of source blocklists in the manifest
    pub fn list_count(&self) -> usize {
        self.tags.len()
    }

    /// Number of stored names
    pub fn stored_count(&self) -> u64 {
        self.trie.terminal_count()
    }

    /// Classify a single name against the stored set and an optional user
    /// list selection
    ///
    /// The deepest stored suffix of `name` decides the verdict; with no
    /// user bitmap any non-empty stored set blocks, otherwise the ids in
    /// `(stored ∩ deny) \ allow` block.
    pub fn classify_name(&self, name: &str, user: Option<&UserBitmap>) -> CoreResult<Verdict> {
        let canonical = canonicalize(name)?;
        let key = reversed_label_key(&canonical);
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        let m = match self.trie.lookup_suffix(&key, LABEL_SENTINEL) {
            Some(m) => m,
            None => return Ok(Verdict::allow()),
        };
        self.stats.suffix_matches.fetch_add(1, Ordering::Relaxed);

        let stored = self
            .trie
            .decode_value(m.value_offset, self.tags.len() as u32)?;
        let suffix = matched_suffix(&canonical, &key, m.matched_len);

        let (blocked, matched, reason) = match user {
            None => {
                let blocked = !stored.is_empty();
                (blocked, stored, format!("match {suffix}"))
            }
            Some(user) => {
                let matched = user.matching(&stored);
                let blocked = !matched.is_empty();
                let reason = if blocked {
                    format!("denied {suffix}")
                } else {
                    format!("allowed {suffix}")
                };
                (blocked, matched, reason)
            }
        };
        if blocked {
            self.stats.blocked.fetch_add(1, Ordering::Relaxed);
        }

        Ok(Verdict {
            blocked,
            matched_list_ids: matched.iter().map(|id| id.to_string()).collect(),
            reason,
        })
    }

    /// Classify a query name together with the answer names it resolved to
    ///
    /// Blocked iff any individual name is blocked; matched sets are merged.
    pub fn classify_answers(
        &self,
        query_name: &str,
        answer_names: &[String],
        user: Option<&UserBitmap>,
    ) -> CoreResult<AggregateVerdict> {
        let mut verdicts = Vec::with_capacity(1 + answer_names.len());
        verdicts.push(self.classify_name(query_name, user)?);
        for answer in answer_names {
            verdicts.push(self.classify_name(answer, user)?);
        }
        Ok(AggregateVerdict::merge(verdicts))
    }

    /// Inspection helper joining a name's stored ids against the manifest;
    /// never used on the hot path
    pub fn lookup_domain_info(&self, name: &str) -> CoreResult<DomainInfo> {
        let canonical = canonicalize(name)?;
        let key = reversed_label_key(&canonical);

        let stored = match self.trie.lookup_suffix(&key, LABEL_SENTINEL) {
            Some(m) => self
                .trie
                .decode_value(m.value_offset, self.tags.len() as u32)?,
            None => Vec::new(),
        };

        let list_ids: BTreeSet<String> = stored.iter().map(|id| id.to_string()).collect();
        let mut tag_entries = BTreeMap::new();
        for id in &stored {
            if let Some(tag) = self.tags.get(*id) {
                tag_entries.insert(id.to_string(), tag.clone());
            }
        }
        Ok(DomainInfo {
            list_ids,
            tag_entries,
        })
    }

    pub fn stats(&self) -> FilterStatsSnapshot {
        FilterStatsSnapshot {
            lookups: self.stats.lookups.load(Ordering::Relaxed),
            suffix_matches: self.stats.suffix_matches.load(Ordering::Relaxed),
            blocked: self.stats.blocked.load(Ordering::Relaxed),
        }
    }
}
