//! Top-level provider: opens per-ledger coordinators.

use snafu::ResultExt;
use tracing::{info, warn};

use parchment_blkstore::BlockStoreProvider;
use parchment_pvtstore::PvtDataStoreProvider;
use parchment_types::{BlockStoreConfig, PvtDataConfig};

use crate::error::{BlockStoreSnafu, CorruptionSnafu, PvtDataStoreSnafu, Result};
use crate::store::Store;

/// Owns the block store and private data store providers and opens
/// per-ledger [`Store`]s over them.
///
/// Opening is not required to be thread-safe; the returned coordinators are.
pub struct Provider {
    blk_provider: BlockStoreProvider,
    pvt_provider: PvtDataStoreProvider,
}

impl Provider {
    /// Create a provider over the two store roots.
    pub fn new(blk_conf: BlockStoreConfig, pvt_conf: PvtDataConfig) -> Result<Self> {
        let blk_provider = BlockStoreProvider::new(blk_conf).context(BlockStoreSnafu)?;
        let pvt_provider = PvtDataStoreProvider::new(pvt_conf).context(PvtDataStoreSnafu)?;
        Ok(Self { blk_provider, pvt_provider })
    }

    /// Open (or create) the ledger storage for `ledger_id` and reconcile the
    /// two store heights.
    ///
    /// - A fresh private data store over an existing chain is bootstrapped to
    ///   the chain height (the pre-existing blocks have no private data).
    /// - The private data store one block ahead is tolerated; the next commit
    ///   of the pending block number reconciles it.
    /// - Any other skew refuses to open with
    ///   [`StorageError::Corruption`](crate::StorageError::Corruption).
    pub fn open(&self, ledger_id: &str) -> Result<Store> {
        let block_store = self.blk_provider.open_store(ledger_id).context(BlockStoreSnafu)?;
        let pvt_store = self.pvt_provider.open_store(ledger_id).context(PvtDataStoreSnafu)?;

        let block_height = block_store.height();
        if pvt_store.is_empty() && block_height > 0 {
            pvt_store
                .init_last_committed_block(block_height)
                .context(PvtDataStoreSnafu)?;
            info!(
                ledger_id,
                height = block_height,
                "bootstrapped private data store against existing chain"
            );
        }

        let pvt_height = pvt_store.last_committed_block_height();
        if pvt_height == block_height + 1 {
            warn!(
                ledger_id,
                block_height,
                pvt_height,
                "private data store is one block ahead; next commit reconciles"
            );
        } else if pvt_height != block_height {
            return CorruptionSnafu {
                ledger_id,
                block_store_height: block_height,
                pvt_store_height: pvt_height,
            }
            .fail();
        }

        info!(ledger_id, height = block_height, "opened ledger storage");
        Ok(Store::new(ledger_id, block_store, pvt_store))
    }
}
