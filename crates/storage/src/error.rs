//! Coordinator error types.

use snafu::Snafu;

use parchment_blkstore::BlockStoreError;
use parchment_pvtstore::PvtDataStoreError;

/// Coordinator error types.
///
/// A `BlockStore` error after a successful private data commit leaves the
/// private data store one block ahead; that skew is legal and is reconciled
/// by the next commit of the same block number.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("Block store error: {source}"))]
    BlockStore { source: BlockStoreError },

    #[snafu(display("Private data store error: {source}"))]
    PvtDataStore { source: PvtDataStoreError },

    #[snafu(display(
        "Ledger {ledger_id} refused to open: block store at height {block_store_height}, \
         private data store at height {pvt_store_height}"
    ))]
    Corruption {
        ledger_id: String,
        block_store_height: u64,
        pvt_store_height: u64,
    },
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, StorageError>;
