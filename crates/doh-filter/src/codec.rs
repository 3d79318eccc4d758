//! Variable-length encoding of per-terminal list-ID sets
//!
//! A value is the ascending list-ID set of one terminal node, delta-coded
//! and written as a count-prefixed sequence of varints. Each varint is a
//! run of [`TAG_WORD_BITS`]-bit words, little-endian by payload group,
//! with the high (continuation) bit set on every word but the last.
//! The empty set encodes as a single zero-count varint.

use crate::bitvec::{BitVector, BitWriter};
use crate::format::{TAG_PAYLOAD_BITS, TAG_WORD_BITS};
use doh_core::{BlocklistError, CoreResult};

/// Most words a single varint may span; enough for any id below 2^16 with
/// generous slack, and a hard stop on corrupt continuation chains
const MAX_VARINT_WORDS: u32 = 6;

/// Append one set of list-IDs to the writer
///
/// `ids` must be strictly ascending; duplicates are a build-time error
/// upstream of this call.
pub fn encode_set(ids: &[u32], w: &mut BitWriter) {
    debug_assert!(ids.windows(2).all(|p| p[0] < p[1]), "ids must be ascending");
    write_varint(ids.len() as u64, w);
    let mut prev = 0u32;
    for (i, &id) in ids.iter().enumerate() {
        let delta = if i == 0 { id } else { id - prev };
        write_varint(delta as u64, w);
        prev = id;
    }
}

/// Decode one set starting at `offset`, enforcing membership in `0..max_id`
///
/// Returns the ids ascending. Truncated streams, runaway continuation
/// chains, zero deltas, and out-of-range ids are all format errors.
pub fn decode_set(bv: &BitVector, offset: u64, max_id: u32) -> CoreResult<Vec<u32>> {
    let (count, mut at) = read_varint(bv, offset)?;
    if count > max_id as u64 {
        return Err(BlocklistError::trie_format(format!(
            "value declares {count} list-ids but only {max_id} exist"
        )));
    }

    let mut ids = Vec::with_capacity(count as usize);
    let mut acc: u64 = 0;
    for i in 0..count {
        let (delta, next) = read_varint(bv, at)?;
        at = next;
        if i > 0 && delta == 0 {
            return Err(BlocklistError::trie_format("duplicate list-id in value"));
        }
        acc += delta;
        if acc >= max_id as u64 {
            return Err(BlocklistError::trie_format(format!(
                "list-id {acc} outside manifest range 0..{max_id}"
            )));
        }
        ids.push(acc as u32);
    }
    Ok(ids)
}

fn write_varint(mut v: u64, w: &mut BitWriter) {
    let mask = (1u64 << TAG_PAYLOAD_BITS) - 1;
    loop {
        let payload = v & mask;
        v >>= TAG_PAYLOAD_BITS;
        let cont = (v != 0) as u64;
        w.push_bits((cont << TAG_PAYLOAD_BITS) | payload, TAG_WORD_BITS);
        if v == 0 {
            break;
        }
    }
}

fn read_varint(bv: &BitVector, mut at: u64) -> CoreResult<(u64, u64)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_WORDS {
        if at + TAG_WORD_BITS as u64 > bv.len() {
            return Err(BlocklistError::trie_format("truncated tag value"));
        }
        let word = bv.chunk(at, TAG_WORD_BITS);
        at += TAG_WORD_BITS as u64;
        value |= (word & ((1 << TAG_PAYLOAD_BITS) - 1)) << (TAG_PAYLOAD_BITS * i);
        if word >> TAG_PAYLOAD_BITS == 0 {
            return Ok((value, at));
        }
    }
    Err(BlocklistError::trie_format("unterminated tag varint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn round_trip(ids: &[u32], max_id: u32) -> Vec<u32> {
        let mut w = BitWriter::new();
        encode_set(ids, &mut w);
        w.pad_to_word();
        let bv = BitVector::with_computed_directory(Bytes::from(w.into_bytes()));
        decode_set(&bv, 0, max_id).unwrap()
    }

    #[test]
    fn test_round_trips() {
        assert_eq!(round_trip(&[], 16), Vec::<u32>::new());
        assert_eq!(round_trip(&[0], 16), vec![0]);
        assert_eq!(round_trip(&[0, 1, 2], 16), vec![0, 1, 2]);
        assert_eq!(round_trip(&[5, 42], 64), vec![5, 42]);
        assert_eq!(round_trip(&[63, 64, 4095], 4096), vec![63, 64, 4095]);
    }

    #[test]
    fn test_multiple_values_are_self_delimiting() {
        let mut w = BitWriter::new();
        encode_set(&[3, 9], &mut w);
        let second_at = w.bit_len();
        encode_set(&[1], &mut w);
        w.pad_to_word();
        let bv = BitVector::with_computed_directory(Bytes::from(w.into_bytes()));
        assert_eq!(decode_set(&bv, 0, 16).unwrap(), vec![3, 9]);
        assert_eq!(decode_set(&bv, second_at, 16).unwrap(), vec![1]);
    }

    #[test]
    fn test_out_of_range_id_rejected() {
        let mut w = BitWriter::new();
        encode_set(&[7], &mut w);
        w.pad_to_word();
        let bv = BitVector::with_computed_directory(Bytes::from(w.into_bytes()));
        assert!(decode_set(&bv, 0, 7).is_err());
        assert!(decode_set(&bv, 0, 8).is_ok());
    }

    #[test]
    fn test_truncated_value_rejected() {
        // A lone all-ones byte claims a continuation that never ends.
        let bv = BitVector::with_computed_directory(Bytes::from(vec![0xff, 0xff]));
        assert!(decode_set(&bv, 0, 16).is_err());
    }
}
