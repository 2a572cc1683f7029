//! The ledger storage coordinator.

use std::sync::Arc;

use parking_lot::Mutex;
use snafu::ResultExt;
use tracing::debug;

use parchment_blkstore::BlockStore;
use parchment_pvtstore::{BtlPolicy, PvtDataStore};
use parchment_types::{
    Block, BlockAndPvtData, BlockchainInfo, Hash, MissingPvtDataInfo, PvtNsCollFilter,
    Transaction, TxPvtData, TxPvtDataMap,
};

use crate::error::{BlockStoreSnafu, PvtDataStoreSnafu, Result};

/// Storage coordinator for one ledger.
///
/// Owns the ledger's block store and private data store and presents them as
/// a single commit target. The private data store is written first: its
/// height is not the ledger height, so it is the side allowed to run one
/// block ahead after a crash or a failed block append. The next commit of
/// the same block number skips the private data step and only retries the
/// block append — the write set stored by the first attempt stays
/// authoritative.
///
/// Commits are serialized internally; readers run concurrently with each
/// other and with an in-flight commit. There is no cross-store read
/// snapshot: a reader may briefly observe the private data store one block
/// ahead during a commit.
#[derive(Debug)]
pub struct Store {
    ledger_id: String,
    block_store: BlockStore,
    pvt_store: PvtDataStore,
    commit_lock: Mutex<()>,
}

impl Store {
    pub(crate) fn new(ledger_id: &str, block_store: BlockStore, pvt_store: PvtDataStore) -> Self {
        Self {
            ledger_id: ledger_id.to_string(),
            block_store,
            pvt_store,
            commit_lock: Mutex::new(()),
        }
    }

    /// Set the block-to-live policy. Must be called once before the first
    /// commit.
    pub fn init(&self, btl: Arc<dyn BtlPolicy>) {
        self.pvt_store.init(btl);
    }

    /// Ledger this coordinator belongs to.
    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    /// Commit a block together with its private data.
    ///
    /// The private data store is committed first, then the block is appended.
    /// When the private data store is already ahead (a prior attempt crashed
    /// or failed between the two steps), the private data step is skipped and
    /// the supplied write sets are ignored in favor of the stored ones.
    ///
    /// A failed block append is surfaced as [`StorageError::BlockStore`] and
    /// is not rolled back: the private data store keeps its head start and
    /// recovery reconciles on the next commit or reopen.
    ///
    /// [`StorageError::BlockStore`]: crate::StorageError::BlockStore
    pub fn commit_with_pvt_data(&self, bp: &BlockAndPvtData) -> Result<()> {
        let _guard = self.commit_lock.lock();

        let block_num = bp.block.number();
        let pvt_height = self.pvt_store.last_committed_block_height();
        let block_height = self.block_store.height();

        if pvt_height <= block_height {
            let pvt_data = ordered_pvt_data(&bp.pvt_data);
            self.pvt_store
                .commit(block_num, pvt_data, &bp.missing_pvt_data)
                .context(PvtDataStoreSnafu)?;
        } else {
            debug!(
                ledger_id = %self.ledger_id,
                block_num,
                "private data store is ahead, skipping private data commit"
            );
        }

        self.block_store.add_block(&bp.block).context(BlockStoreSnafu)?;
        debug!(ledger_id = %self.ledger_id, block_num, "committed block with private data");
        Ok(())
    }

    /// Private data of a block, ascending by transaction index.
    ///
    /// Entries of invalid transactions are included; blocks without private
    /// data yield an empty result.
    pub fn get_pvt_data_by_num(
        &self,
        block_num: u64,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>> {
        self.pvt_store
            .get_pvt_data_by_block_num(block_num, filter)
            .context(PvtDataStoreSnafu)
    }

    /// A block joined with its private data.
    ///
    /// Transactions without private data (or whose write set the filter trims
    /// away entirely) are absent from the map.
    pub fn get_pvt_data_and_block_by_num(
        &self,
        block_num: u64,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<BlockAndPvtData> {
        let block = self
            .block_store
            .retrieve_block_by_number(block_num)
            .context(BlockStoreSnafu)?;
        let pvt_data = self
            .pvt_store
            .get_pvt_data_by_block_num(block_num, filter)
            .context(PvtDataStoreSnafu)?;

        let mut joined = BlockAndPvtData::new(block);
        for data in pvt_data {
            joined.pvt_data.insert(data.seq_in_block, data);
        }
        Ok(joined)
    }

    /// Eligible missing-data entries of the `n` most recently committed
    /// blocks, regardless of transaction validity.
    pub fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        n: u64,
    ) -> Result<MissingPvtDataInfo> {
        self.pvt_store
            .get_missing_pvt_data_info_for_most_recent_blocks(n)
            .context(PvtDataStoreSnafu)
    }

    /// Whether the private data store is ahead of the block store.
    ///
    /// True only in the one-block-ahead state left by a crash or failed block
    /// append between the two commit steps.
    pub fn is_pvt_store_ahead_of_block_store(&self) -> bool {
        self.pvt_store.last_committed_block_height() > self.block_store.height()
    }

    /// Chain info. The height is the block store height, never the private
    /// data store height.
    pub fn blockchain_info(&self) -> BlockchainInfo {
        self.block_store.blockchain_info()
    }

    /// Read a block by number (passed through to the block store).
    pub fn retrieve_block_by_number(&self, block_num: u64) -> Result<Block> {
        self.block_store
            .retrieve_block_by_number(block_num)
            .context(BlockStoreSnafu)
    }

    /// Read a block by its header hash (passed through to the block store).
    pub fn retrieve_block_by_hash(&self, hash: &Hash) -> Result<Block> {
        self.block_store.retrieve_block_by_hash(hash).context(BlockStoreSnafu)
    }

    /// Read a transaction by id (passed through to the block store).
    pub fn retrieve_tx_by_id(&self, tx_id: &str) -> Result<Transaction> {
        self.block_store.retrieve_tx_by_id(tx_id).context(BlockStoreSnafu)
    }

    /// The underlying block store.
    pub fn block_store(&self) -> &BlockStore {
        &self.block_store
    }

    /// The underlying private data store.
    pub fn pvt_data_store(&self) -> &PvtDataStore {
        &self.pvt_store
    }

    /// Shut the coordinator down, closing both store handles.
    pub fn shutdown(self) {
        debug!(ledger_id = %self.ledger_id, "shutting down ledger storage");
    }
}

/// Flatten the per-transaction map into the ascending list the private data
/// store commits. Only transactions that actually carry data appear in the
/// map, so no further validity filtering happens here: invalid-but-present
/// write sets are stored like any other.
fn ordered_pvt_data(pvt_data: &TxPvtDataMap) -> Vec<TxPvtData> {
    pvt_data.values().cloned().collect()
}
