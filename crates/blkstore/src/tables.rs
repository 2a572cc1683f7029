//! Table definitions for the block index.
//!
//! The index is authoritative for the store's contents: a block exists iff
//! its location is indexed. Segment file bytes past the last indexed block
//! are discarded on open.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

/// Table definitions for the block index.
pub(crate) struct Tables;

impl Tables {
    /// Block location by number: block_num → serialized [`BlockLocation`].
    pub const BLOCK_LOC: TableDefinition<'static, u64, &'static [u8]> =
        TableDefinition::new("block_loc");

    /// Block number by header hash.
    pub const BLOCK_HASH: TableDefinition<'static, &'static [u8], u64> =
        TableDefinition::new("block_hash");

    /// Transaction location by id: tx_id → serialized [`TxLocation`].
    pub const TX_ID: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("tx_id");

    /// Store metadata. Keys: "height".
    pub const META: TableDefinition<'static, &'static str, u64> = TableDefinition::new("meta");
}

/// Metadata key for the chain height.
pub(crate) const META_HEIGHT: &str = "height";

/// Location of a block within the segment files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BlockLocation {
    /// Segment file number.
    pub file_num: u64,
    /// Offset of the record within the segment file.
    pub offset: u64,
    /// Length of the record including the 4-byte length prefix.
    pub length: u32,
}

/// Location of a transaction: its block and index within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TxLocation {
    pub block_num: u64,
    pub tx_index: u32,
}

#[cfg(test)]
mod tests {
    use redb::TableHandle;

    use super::*;

    #[test]
    fn test_table_names_unique() {
        let names = [
            Tables::BLOCK_LOC.name(),
            Tables::BLOCK_HASH.name(),
            Tables::TX_ID.name(),
            Tables::META.name(),
        ];

        let mut sorted = names.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len(), "Table names must be unique");
    }
}
