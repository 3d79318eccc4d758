//! File-tag manifest: metadata for each source blocklist
//!
//! The manifest is a JSON object keyed by decimal-string list-ID. Keys are
//! dense (`0..N-1`) and every per-name list-ID set decoded from the trie is
//! a subset of them.

use crate::{BlocklistError, CoreResult};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Metadata record describing a single source blocklist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileTag {
    /// Numeric list-ID, equal to the manifest key
    pub value: u32,
    /// Unique machine name
    pub uname: String,
    /// Human-readable name
    pub vname: String,
    /// Top-level grouping (e.g. "privacy", "security")
    pub group: String,
    /// Sub-group within `group`
    pub subg: String,
    /// Upstream source URL
    pub url: String,
    /// Whether UIs should display this list
    pub show: u8,
    /// Number of entries contributed by this list
    pub entries: u64,
}

/// Immutable, id-indexed view of the file-tag manifest
#[derive(Debug, Clone)]
pub struct FileTagIndex {
    tags: AHashMap<u32, FileTag>,
}

impl FileTagIndex {
    /// Parse the manifest from its JSON wire form
    ///
    /// Validates that keys are decimal integers, that each key matches the
    /// record's `value` field, and that ids are dense in `0..N-1`.
    pub fn from_json(bytes: &[u8]) -> CoreResult<Self> {
        let raw: AHashMap<String, FileTag> = serde_json::from_slice(bytes)
            .map_err(|e| BlocklistError::manifest(format!("filetag.json: {e}")))?;

        let count = raw.len() as u32;
        let mut tags = AHashMap::with_capacity(raw.len());
        for (key, tag) in raw {
            let id: u32 = key
                .parse()
                .map_err(|_| BlocklistError::manifest(format!("non-numeric list-id {key:?}")))?;
            if id != tag.value {
                return Err(BlocklistError::manifest(format!(
                    "list-id {id} disagrees with record value {}",
                    tag.value
                )));
            }
            if id >= count {
                return Err(BlocklistError::manifest(format!(
                    "list-id {id} outside dense range 0..{count}"
                )));
            }
            if tags.insert(id, tag).is_some() {
                return Err(BlocklistError::manifest(format!("duplicate list-id {id}")));
            }
        }

        Ok(Self { tags })
    }

    /// Build an index directly from records (fixtures and offline tooling)
    pub fn from_tags(tags: Vec<FileTag>) -> CoreResult<Self> {
        let mut map = AHashMap::with_capacity(tags.len());
        let count = tags.len() as u32;
        for tag in tags {
            if tag.value >= count {
                return Err(BlocklistError::manifest(format!(
                    "list-id {} outside dense range 0..{count}",
                    tag.value
                )));
            }
            if map.insert(tag.value, tag).is_some() {
                return Err(BlocklistError::manifest("duplicate list-id"));
            }
        }
        Ok(Self { tags: map })
    }

    /// Number of source blocklists (N)
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Look up a single list by id
    pub fn get(&self, id: u32) -> Option<&FileTag> {
        self.tags.get(&id)
    }

    /// Iterate all known list-IDs
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.tags.keys().copied()
    }

    /// All lists belonging to a top-level group
    pub fn by_group(&self, group: &str) -> Vec<&FileTag> {
        let mut tags: Vec<&FileTag> = self.tags.values().filter(|t| t.group == group).collect();
        tags.sort_by_key(|t| t.value);
        tags
    }
}
