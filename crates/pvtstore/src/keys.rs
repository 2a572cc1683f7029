//! Composite key encoding for the private data tables.
//!
//! Keys are fixed-width big-endian so that lexicographic table order equals
//! numeric order, which makes per-block reads and expiry sweeps range scans.

/// Encode a data or missing-data key: `{block:8BE}{tx_seq:8BE}`.
pub(crate) fn encode_block_tx_key(block_num: u64, tx_seq: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[0..8].copy_from_slice(&block_num.to_be_bytes());
    key[8..16].copy_from_slice(&tx_seq.to_be_bytes());
    key
}

/// Decode a `{block:8BE}{tx_seq:8BE}` key.
pub(crate) fn decode_block_tx_key(key: &[u8]) -> Option<(u64, u64)> {
    if key.len() != 16 {
        return None;
    }
    let block_num = u64::from_be_bytes(key[0..8].try_into().ok()?);
    let tx_seq = u64::from_be_bytes(key[8..16].try_into().ok()?);
    Some((block_num, tx_seq))
}

/// Encode an expiry key: `{expiry_block:8BE}{committing_block:8BE}`.
pub(crate) fn encode_expiry_key(expiry_block: u64, committing_block: u64) -> [u8; 16] {
    encode_block_tx_key(expiry_block, committing_block)
}

/// Decode an expiry key into `(expiry_block, committing_block)`.
pub(crate) fn decode_expiry_key(key: &[u8]) -> Option<(u64, u64)> {
    decode_block_tx_key(key)
}
