//! Block, transaction, and chain-info types.

use serde::{Deserialize, Serialize};

use crate::hash::{block_header_hash, Hash};
use crate::validation::TxValidationFlags;

/// Header of a block: monotonic number plus the hash links to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number, starting at 0.
    pub number: u64,
    /// Hash of the previous block's header (zero for the genesis block).
    pub previous_hash: Hash,
    /// Hash over the ordered transaction list.
    pub data_hash: Hash,
}

impl BlockHeader {
    /// Hash of this header (fixed-layout encoding).
    pub fn hash(&self) -> Hash {
        block_header_hash(self)
    }
}

/// A single transaction: an id (unique across the ledger) and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id.
    pub id: String,
    /// Opaque transaction payload.
    pub payload: Vec<u8>,
}

/// Block metadata. Carries the per-transaction validation flag vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// One validation code per transaction, in transaction order.
    pub tx_validation_flags: TxValidationFlags,
}

/// An ordered batch of transactions with a monotonic number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Ordered transactions.
    pub transactions: Vec<Transaction>,
    /// Block metadata.
    pub metadata: BlockMetadata,
}

impl Block {
    /// Block number of this block.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Hash of this block's header.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}

/// Snapshot of the chain as seen by the block store.
///
/// `height` is the number of committed blocks, which equals the next block
/// number to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainInfo {
    /// Number of committed blocks.
    pub height: u64,
    /// Header hash of the last committed block (zero when empty).
    pub current_block_hash: Hash,
    /// `previous_hash` of the last committed block (zero when empty).
    pub previous_block_hash: Hash,
}

impl BlockchainInfo {
    /// Info for an empty chain.
    pub fn empty() -> Self {
        Self {
            height: 0,
            current_block_hash: crate::hash::ZERO_HASH,
            previous_block_hash: crate::hash::ZERO_HASH,
        }
    }
}
