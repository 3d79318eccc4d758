//! Succinct trie navigation over the assembled blob
//!
//! Nodes are BFS indices and are never materialized; every accessor is a
//! handful of rank/select/chunk operations against the shared bitvector.
//! The shape section is a LOUDS bitstring (per node, one 1-bit per child
//! followed by a 0 terminator), so with `z(n)` the position of the n-th
//! zero:
//!
//! ```text
//! child_count(n) = z(n) - z(n-1) - 1          z(-1) = -1
//! first_child(n) = z(n-1) - n + 2
//! ```
//!
//! Children of a node are stored in ascending label order, so each step of
//! a walk binary-searches the child range.

use crate::bitvec::BitVector;
use crate::codec;
use crate::format::{Sections, LABEL_BITS, VALDIR_ENTRY_BITS};
use bytes::Bytes;
use doh_core::{BlocklistError, CoreResult};
use tracing::debug;

/// Result of a suffix walk: the deepest terminal on the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixMatch {
    /// BFS index of the terminal node
    pub node: u64,
    /// Bytes of the key consumed to reach it
    pub matched_len: usize,
    /// Absolute bit offset of the node's encoded list-ID set
    pub value_offset: u64,
}

/// Immutable succinct trie over a trie blob and its rank directory
#[derive(Debug, Clone)]
pub struct FrozenTrie {
    data: BitVector,
    sections: Sections,
}

impl FrozenTrie {
    /// Construct over the assembled blob
    ///
    /// Validates the rank directory against the bits, the declared node
    /// count against the shape section, and that every derived section
    /// lies within the blob.
    pub fn new(td: Bytes, rank_dir: Bytes, node_count: u64) -> CoreResult<Self> {
        if node_count == 0 {
            return Err(BlocklistError::trie_format("node count must be positive"));
        }
        let data = BitVector::new(td, rank_dir)?;

        let (shape_end, term_start, term_end, _, labels_end) = Sections::fixed_bounds(node_count);
        if labels_end > data.len() {
            return Err(BlocklistError::trie_format(format!(
                "blob holds {} bits, fixed sections need {labels_end}",
                data.len()
            )));
        }
        if data.rank0(shape_end) != node_count {
            return Err(BlocklistError::trie_format(format!(
                "shape section encodes {} nodes, {node_count} declared",
                data.rank0(shape_end)
            )));
        }

        let terminal_count = data.rank1(term_end) - data.rank1(term_start);
        let sections = Sections::resolve(node_count, terminal_count);
        if sections.values_start > data.len() {
            return Err(BlocklistError::trie_format(
                "value directory extends past end of blob",
            ));
        }

        debug!(
            "frozen trie ready: {node_count} nodes, {terminal_count} terminals, {} bits",
            data.len()
        );
        Ok(Self { data, sections })
    }

    pub fn node_count(&self) -> u64 {
        self.sections.node_count
    }

    pub fn terminal_count(&self) -> u64 {
        self.sections.terminal_count
    }

    /// Position of the n-th zero in the shape section
    fn zero_pos(&self, n: u64) -> u64 {
        self.data.select0(n)
    }

    /// First child id and child count of `node`
    fn child_range(&self, node: u64) -> (u64, u64) {
        let z_prev: i64 = if node == 0 {
            -1
        } else {
            self.zero_pos(node - 1) as i64
        };
        let z_cur = self.zero_pos(node) as i64;
        let count = (z_cur - z_prev - 1) as u64;
        let first = (z_prev - node as i64 + 2) as u64;
        (first, count)
    }

    /// Label byte of a non-root node
    fn label(&self, node: u64) -> u8 {
        debug_assert!(node >= 1 && node < self.sections.node_count);
        self.data
            .chunk(self.sections.labels_start + LABEL_BITS * (node - 1), 8) as u8
    }

    /// Whether a non-root node terminates a stored key
    fn is_terminal(&self, node: u64) -> bool {
        debug_assert!(node >= 1 && node < self.sections.node_count);
        self.data.get(self.sections.term_start + (node - 1))
    }

    /// Absolute bit offset of a terminal node's value
    fn value_offset(&self, node: u64) -> u64 {
        let flags_before = self.data.rank1(self.sections.term_start + (node - 1));
        let ordinal = flags_before - self.data.rank1(self.sections.term_start);
        let entry_at = self.sections.valdir_start + VALDIR_ENTRY_BITS * ordinal;
        self.sections.values_start + self.data.chunk(entry_at, 32)
    }

    /// Walk `key` from the root, returning the deepest terminal reached at
    /// a label boundary (a position followed by `sep` or the end of key)
    pub fn lookup_suffix(&self, key: &[u8], sep: u8) -> Option<SuffixMatch> {
        let mut node = 0u64;
        let mut best = None;
        for (i, &b) in key.iter().enumerate() {
            let (first, count) = self.child_range(node);
            node = self.find_child(first, count, b)?;
            let at_boundary = i + 1 == key.len() || key[i + 1] == sep;
            if at_boundary && self.is_terminal(node) {
                best = Some(SuffixMatch {
                    node,
                    matched_len: i + 1,
                    value_offset: self.value_offset(node),
                });
            }
        }
        best
    }

    /// Exact-key membership, ignoring suffix semantics
    pub fn contains(&self, key: &[u8]) -> bool {
        let mut node = 0u64;
        for &b in key {
            let (first, count) = self.child_range(node);
            match self.find_child(first, count, b) {
                Some(c) => node = c,
                None => return false,
            }
        }
        node != 0 && self.is_terminal(node)
    }

    fn find_child(&self, first: u64, count: u64, target: u8) -> Option<u64> {
        let (mut lo, mut hi) = (0u64, count);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.label(first + mid) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < count && self.label(first + lo) == target {
            Some(first + lo)
        } else {
            None
        }
    }

    /// Decode the list-ID set stored at `value_offset`
    pub fn decode_value(&self, value_offset: u64, max_id: u32) -> CoreResult<Vec<u32>> {
        codec::decode_set(&self.data, value_offset, max_id)
    }

    /// Decode every terminal's value once, surfacing corrupt artifacts at
    /// construction time instead of on the hot path
    pub fn validate_values(&self, max_id: u32) -> CoreResult<()> {
        for ordinal in 0..self.sections.terminal_count {
            let entry_at = self.sections.valdir_start + VALDIR_ENTRY_BITS * ordinal;
            let offset = self.sections.values_start + self.data.chunk(entry_at, 32);
            codec::decode_set(&self.data, offset, max_id)?;
        }
        Ok(())
    }
}
