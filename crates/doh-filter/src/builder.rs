//! Producer side of the trie format: BFS construction of td + rd blobs
//!
//! Used by the test suites as the conformance fixture generator and
//! exported for offline artifact production. Names are canonicalized and
//! keyed exactly like lookups, so a built trie round-trips by
//! construction.

use crate::bitvec::{build_rank_directory, BitWriter};
use crate::codec;
use crate::filter::{canonicalize, reversed_label_key};
use crate::format::VALDIR_ENTRY_BITS;
use ahash::AHashMap;
use bytes::Bytes;
use doh_core::CoreResult;
use std::collections::{BTreeSet, VecDeque};

/// Finished blobs plus the out-of-band counts a consumer needs
#[derive(Debug, Clone)]
pub struct TrieArtifacts {
    pub td: Bytes,
    pub rd: Bytes,
    pub node_count: u64,
    pub terminal_count: u64,
}

/// Accumulates `(domain, list-ids)` pairs and serializes them
#[derive(Debug, Default)]
pub struct TrieBuilder {
    entries: AHashMap<Vec<u8>, BTreeSet<u32>>,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct stored names so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a domain with the lists that contain it
    ///
    /// Re-inserting a domain merges the id sets.
    pub fn insert(&mut self, domain: &str, list_ids: &[u32]) -> CoreResult<()> {
        let canonical = canonicalize(domain)?;
        let key = reversed_label_key(&canonical);
        self.entries.entry(key).or_default().extend(list_ids);
        Ok(())
    }

    /// Serialize the accumulated set into bit-exact td + rd blobs
    pub fn build(&self) -> CoreResult<TrieArtifacts> {
        let mut keys: Vec<(&[u8], &BTreeSet<u32>)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));

        // BFS over key ranges; each dequeued range is one node whose keys
        // share a prefix of `depth` bytes. Dequeue order is the node id.
        struct Range {
            start: usize,
            end: usize,
            depth: usize,
        }
        let mut queue = VecDeque::new();
        queue.push_back(Range {
            start: 0,
            end: keys.len(),
            depth: 0,
        });

        let mut degrees: Vec<u32> = Vec::new();
        let mut terminals: Vec<Option<usize>> = Vec::new(); // key index per node
        let mut labels: Vec<u8> = Vec::new(); // per non-root node, BFS order

        while let Some(range) = queue.pop_front() {
            let mut i = range.start;
            let mut terminal = None;
            if i < range.end && keys[i].0.len() == range.depth {
                terminal = Some(i);
                i += 1;
            }

            let mut degree = 0u32;
            while i < range.end {
                let b = keys[i].0[range.depth];
                let mut j = i + 1;
                while j < range.end && keys[j].0[range.depth] == b {
                    j += 1;
                }
                labels.push(b);
                queue.push_back(Range {
                    start: i,
                    end: j,
                    depth: range.depth + 1,
                });
                degree += 1;
                i = j;
            }

            degrees.push(degree);
            terminals.push(terminal);
        }

        let node_count = degrees.len() as u64;

        // Measure each terminal's value to fill the value directory, then
        // emit everything in section order.
        let mut value_offsets: Vec<u64> = Vec::new();
        let mut scratch = BitWriter::new();
        for terminal in terminals.iter().skip(1) {
            if let Some(key_idx) = terminal {
                value_offsets.push(scratch.bit_len());
                let ids: Vec<u32> = keys[*key_idx].1.iter().copied().collect();
                codec::encode_set(&ids, &mut scratch);
            }
        }
        let terminal_count = value_offsets.len() as u64;

        let mut w = BitWriter::new();
        for &degree in &degrees {
            for _ in 0..degree {
                w.push_bit(true);
            }
            w.push_bit(false);
        }
        for terminal in terminals.iter().skip(1) {
            w.push_bit(terminal.is_some());
        }
        for &label in &labels {
            w.push_bits(label as u64, 8);
        }
        for &offset in &value_offsets {
            w.push_bits(offset, VALDIR_ENTRY_BITS as u32);
        }
        for terminal in terminals.iter().skip(1) {
            if let Some(key_idx) = terminal {
                let ids: Vec<u32> = keys[*key_idx].1.iter().copied().collect();
                codec::encode_set(&ids, &mut w);
            }
        }
        w.pad_to_word();

        let td = Bytes::from(w.into_bytes());
        let rd = Bytes::from(build_rank_directory(&td));
        Ok(TrieArtifacts {
            td,
            rd,
            node_count,
            terminal_count,
        })
    }
}

/// Split a blob into `parts` contiguous, non-empty byte ranges
///
/// Concatenating the result in order restores the input exactly; used for
/// multi-part artifact layouts and their tests.
pub fn split_parts(td: &Bytes, parts: usize) -> Vec<Bytes> {
    assert!(parts >= 1 && parts <= td.len(), "cannot split {} bytes into {parts} parts", td.len());
    let chunk = td.len().div_ceil(parts);
    (0..parts)
        .map(|i| td.slice(i * chunk..((i + 1) * chunk).min(td.len())))
        .collect()
}
