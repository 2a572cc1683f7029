//! SHA-256 hashing for parchment.
//!
//! All hashing uses SHA-256. This module provides:
//! - Basic SHA-256 hashing
//! - Block header hashing (fixed 72-byte encoding)
//! - Block data hashing (streaming with length-prefixed encoding)

use sha2::{Digest, Sha256};

use crate::block::{BlockHeader, Transaction};

/// SHA-256 hash output (32 bytes).
pub type Hash = [u8; 32];

/// Zero hash: 32 zero bytes. Used for the genesis block's `previous_hash`.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compute SHA-256 hash of arbitrary data.
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute a block header hash over a fixed 72-byte encoding.
///
/// Encoding layout:
/// - number: 8 bytes (u64 BE)
/// - previous_hash: 32 bytes
/// - data_hash: 32 bytes
///
/// Total: 72 bytes (fixed)
pub fn block_header_hash(header: &BlockHeader) -> Hash {
    const HEADER_ENCODING_SIZE: usize = 72;

    let mut buf = [0u8; HEADER_ENCODING_SIZE];
    buf[0..8].copy_from_slice(&header.number.to_be_bytes());
    buf[8..40].copy_from_slice(&header.previous_hash);
    buf[40..72].copy_from_slice(&header.data_hash);

    sha256(&buf)
}

/// Compute the data hash of an ordered transaction list.
///
/// Streaming encoding, per transaction:
/// - id_len: u32 LE, id: variable
/// - payload_len: u32 LE, payload: variable
pub fn compute_data_hash(transactions: &[Transaction]) -> Hash {
    let mut hasher = Sha256::new();
    for tx in transactions {
        hasher.update((tx.id.len() as u32).to_le_bytes());
        hasher.update(tx.id.as_bytes());
        hasher.update((tx.payload.len() as u32).to_le_bytes());
        hasher.update(&tx.payload);
    }
    hasher.finalize().into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_basic() {
        // SHA-256("hello")
        let hash = sha256(b"hello");
        assert_eq!(
            hex(&hash),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_header_hash_deterministic() {
        let header = BlockHeader {
            number: 7,
            previous_hash: sha256(b"prev"),
            data_hash: sha256(b"data"),
        };
        assert_eq!(block_header_hash(&header), block_header_hash(&header));
    }

    #[test]
    fn test_header_hash_depends_on_every_field() {
        let base = BlockHeader {
            number: 7,
            previous_hash: sha256(b"prev"),
            data_hash: sha256(b"data"),
        };
        let mut other = base.clone();
        other.number = 8;
        assert_ne!(block_header_hash(&base), block_header_hash(&other));

        let mut other = base.clone();
        other.previous_hash = ZERO_HASH;
        assert_ne!(block_header_hash(&base), block_header_hash(&other));

        let mut other = base.clone();
        other.data_hash = ZERO_HASH;
        assert_ne!(block_header_hash(&base), block_header_hash(&other));
    }

    #[test]
    fn test_data_hash_empty_vs_nonempty() {
        let empty = compute_data_hash(&[]);
        let one = compute_data_hash(&[Transaction {
            id: "tx-0".to_string(),
            payload: b"payload".to_vec(),
        }]);
        assert_ne!(empty, one);
    }

    #[test]
    fn test_data_hash_order_sensitive() {
        let a = Transaction { id: "a".to_string(), payload: vec![1] };
        let b = Transaction { id: "b".to_string(), payload: vec![2] };
        assert_ne!(
            compute_data_hash(&[a.clone(), b.clone()]),
            compute_data_hash(&[b, a])
        );
    }

    fn hex(data: &[u8]) -> String {
        use std::fmt::Write;
        data.iter().fold(String::with_capacity(data.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{:02x}", b);
            acc
        })
    }
}
