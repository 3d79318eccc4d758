//! Bitstream layout constants and section arithmetic
//!
//! The trie blob is one bitstream, read MSB-first within 16-bit big-endian
//! words (equivalently MSB-first per byte). The constants here are the
//! conformance vector shared by the producer ([`crate::builder`]) and the
//! consumer ([`crate::trie`], [`crate::codec`]); changing any of them
//! changes the wire format.

/// Width of a child label field in bits
pub const LABEL_BITS: u64 = 8;

/// Byte joining reversed labels in a lookup key; sorts before every label
/// byte so sibling order stays consistent with label order
pub const LABEL_SENTINEL: u8 = 0x00;

/// Rank directory block size; popcount scans within a block touch at most
/// two 64-bit words
pub const RANK_BLOCK_BITS: u64 = 128;

/// Width of one rank directory entry (big-endian)
pub const RANK_ENTRY_BITS: u64 = 32;

/// Rank directory level count (flat directory)
pub const RANK_LEVELS: u32 = 1;

/// Width of one value-directory entry: the bit offset of a terminal's
/// value, relative to the start of the values section
pub const VALDIR_ENTRY_BITS: u64 = 32;

/// Total width of one tag-codec word
pub const TAG_WORD_BITS: u32 = 7;

/// Payload bits per tag-codec word; the remaining high bit is the
/// continuation flag
pub const TAG_PAYLOAD_BITS: u32 = 6;

/// Bit offsets of every section of a trie blob
///
/// With `n` nodes and `t` terminals, in BFS order from the root:
///
/// ```text
/// shape   [0, 2n-1)       unary degrees: per node, k ones then a zero
/// term    [2n-1, 3n-2)    terminal flag per non-root node
/// labels  next 8(n-1)     label byte per non-root node
/// valdir  next 32t        value bit-offset per terminal
/// values  remainder       delta-coded list-ID sets
/// ```
///
/// `t` is not stored; it is recovered as `rank1(term_end) - rank1(term_start)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub node_count: u64,
    pub terminal_count: u64,
    pub shape_end: u64,
    pub term_start: u64,
    pub term_end: u64,
    pub labels_start: u64,
    pub labels_end: u64,
    pub valdir_start: u64,
    pub values_start: u64,
}

impl Sections {
    /// Section bounds that depend only on the node count
    ///
    /// Returns `(shape_end, term_start, term_end, labels_start, labels_end)`.
    pub fn fixed_bounds(node_count: u64) -> (u64, u64, u64, u64, u64) {
        debug_assert!(node_count >= 1);
        let shape_end = 2 * node_count - 1;
        let term_start = shape_end;
        let term_end = term_start + (node_count - 1);
        let labels_start = term_end;
        let labels_end = labels_start + LABEL_BITS * (node_count - 1);
        (shape_end, term_start, term_end, labels_start, labels_end)
    }

    /// Full layout once the terminal count is known
    pub fn resolve(node_count: u64, terminal_count: u64) -> Self {
        let (shape_end, term_start, term_end, labels_start, labels_end) =
            Self::fixed_bounds(node_count);
        let valdir_start = labels_end;
        let values_start = valdir_start + VALDIR_ENTRY_BITS * terminal_count;
        Self {
            node_count,
            terminal_count,
            shape_end,
            term_start,
            term_end,
            labels_start,
            labels_end,
            valdir_start,
            values_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_only_layout() {
        let s = Sections::resolve(1, 0);
        assert_eq!(s.shape_end, 1);
        assert_eq!(s.term_start, s.term_end);
        assert_eq!(s.labels_start, s.labels_end);
        assert_eq!(s.values_start, s.valdir_start);
    }

    #[test]
    fn test_section_arithmetic() {
        // 5 nodes, 2 terminals: shape 9 bits, term 4, labels 32, valdir 64
        let s = Sections::resolve(5, 2);
        assert_eq!(s.shape_end, 9);
        assert_eq!(s.term_end, 13);
        assert_eq!(s.labels_end, 45);
        assert_eq!(s.values_start, 45 + 64);
    }
}
