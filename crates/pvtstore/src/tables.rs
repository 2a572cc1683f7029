//! Table definitions for the private data store.
//!
//! All tables live in one redb database per ledger, so a commit is a single
//! write transaction: data, missing-data, expiry records, and the height
//! become visible together or not at all.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

/// Table definitions for private data storage.
pub(crate) struct Tables;

impl Tables {
    /// Private write sets: `{block:8BE}{tx_seq:8BE}` → serialized `TxPvtWriteSet`.
    pub const DATA: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("pvt_data");

    /// Missing-data records: `{block:8BE}{tx_seq:8BE}` → serialized `Vec<MissingPvtData>`.
    pub const MISSING: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("missing_data");

    /// Expiry records: `{expiry_block:8BE}{committing_block:8BE}` → serialized
    /// [`ExpiryRecord`]. Scanned in key order, so everything expiring at or
    /// before a given block is one range query.
    pub const EXPIRY: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("expiry");

    /// Store metadata. Keys: "height".
    pub const META: TableDefinition<'static, &'static str, u64> = TableDefinition::new("meta");
}

/// Metadata key for the last committed block height.
pub(crate) const META_HEIGHT: &str = "height";

/// Collections of one `(tx, namespace)` pair sharing an expiry block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ExpiryEntry {
    pub seq_in_block: u64,
    pub namespace: String,
    pub collections: Vec<String>,
}

/// Everything of one committing block that expires at one expiry block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ExpiryRecord {
    /// Entries whose write sets are stored.
    pub present: Vec<ExpiryEntry>,
    /// Entries recorded as missing.
    pub missing: Vec<ExpiryEntry>,
}
