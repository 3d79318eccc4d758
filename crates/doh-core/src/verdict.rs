//! Block/allow verdicts and the user list-selection algebra

use crate::filetag::FileTag;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A user's projection of the stored list-ID space
///
/// `deny` selects the lists the user wants enforced; `allow` carves
/// exceptions back out. An id present in both sets ends up allowed.
#[derive(Debug, Clone, Default)]
pub struct UserBitmap {
    allow: AHashSet<u32>,
    deny: AHashSet<u32>,
}

impl UserBitmap {
    pub fn new(allow: impl IntoIterator<Item = u32>, deny: impl IntoIterator<Item = u32>) -> Self {
        Self {
            allow: allow.into_iter().collect(),
            deny: deny.into_iter().collect(),
        }
    }

    /// Enforce every list (no exceptions); equivalent to an absent bitmap
    /// only when the stored set is consulted directly.
    pub fn deny_only(deny: impl IntoIterator<Item = u32>) -> Self {
        Self::new([], deny)
    }

    pub fn allows(&self, id: u32) -> bool {
        self.allow.contains(&id)
    }

    pub fn denies(&self, id: u32) -> bool {
        self.deny.contains(&id)
    }

    /// Apply this projection to a stored list-ID set
    ///
    /// Returns the ids that actually block: `(stored ∩ deny) \ allow`,
    /// ascending. `blocked` is exactly "the result is non-empty".
    pub fn matching(&self, stored: &[u32]) -> Vec<u32> {
        let mut matched: Vec<u32> = stored
            .iter()
            .copied()
            .filter(|id| self.denies(*id) && !self.allows(*id))
            .collect();
        matched.sort_unstable();
        matched
    }
}

/// Per-name classification result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the name should be blocked
    pub blocked: bool,
    /// List-IDs responsible for the verdict, as manifest keys
    pub matched_list_ids: BTreeSet<String>,
    /// Short diagnostic, e.g. `"match example.com"` or `"allowed"`
    pub reason: String,
}

impl Verdict {
    /// A pass-through verdict for names with no stored suffix
    pub fn allow() -> Self {
        Self {
            blocked: false,
            matched_list_ids: BTreeSet::new(),
            reason: "none".to_string(),
        }
    }
}

/// Combined result over a query name and its answer names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateVerdict {
    /// True iff any individual verdict blocked
    pub blocked: bool,
    /// Union of all matched list-IDs
    pub matched_list_ids: BTreeSet<String>,
    /// Individual verdicts, query name first then answers in order
    pub verdicts: Vec<Verdict>,
}

impl AggregateVerdict {
    pub fn merge(verdicts: Vec<Verdict>) -> Self {
        let blocked = verdicts.iter().any(|v| v.blocked);
        let matched_list_ids = verdicts
            .iter()
            .flat_map(|v| v.matched_list_ids.iter().cloned())
            .collect();
        Self {
            blocked,
            matched_list_ids,
            verdicts,
        }
    }
}

/// Inspection result for a single name, off the hot path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainInfo {
    /// List-IDs stored for the deepest matching suffix
    pub list_ids: BTreeSet<String>,
    /// Manifest records for those ids
    pub tag_entries: BTreeMap<String, FileTag>,
}
