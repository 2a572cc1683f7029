//! The per-ledger block store.

use std::fs;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use redb::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use tracing::{debug, info};

use parchment_types::{Block, BlockchainInfo, Hash, Transaction};

use crate::blockfile::{self, SegmentWriter};
use crate::error::{
    BlockHashNotFoundSnafu, BlockNotFoundSnafu, BlockStoreError, CommitSnafu, DatabaseSnafu,
    IoSnafu, Result, StorageSnafu, TableSnafu, TransactionSnafu, TxNotFoundSnafu,
    UnexpectedBlockNumberSnafu,
};
use crate::tables::{BlockLocation, Tables, TxLocation, META_HEIGHT};

/// Index database file name within a ledger directory.
const INDEX_FILE: &str = "index.redb";

/// Append-only block store for one ledger.
///
/// Blocks live in segment files; the redb index maps numbers, header hashes,
/// and transaction ids to them. The index is written after the file append,
/// so on open any tail bytes past the last indexed block are discarded (an
/// add that never returned success leaves no trace).
///
/// Concurrent readers are supported; `add_block` calls are serialized
/// internally.
#[derive(Debug)]
pub struct BlockStore {
    ledger_id: String,
    dir: PathBuf,
    db: Database,
    max_file_size: u64,
    writer: Mutex<SegmentWriter>,
    info: RwLock<BlockchainInfo>,
}

impl BlockStore {
    /// Open (or create) the block store in `dir`.
    pub(crate) fn open(ledger_id: &str, dir: PathBuf, max_file_size: u64) -> Result<Self> {
        fs::create_dir_all(&dir).context(IoSnafu)?;
        let db = Database::create(dir.join(INDEX_FILE)).context(DatabaseSnafu)?;
        ensure_tables(&db)?;

        let height = read_height(&db)?;
        let (writer, store_info) = if height == 0 {
            blockfile::trim_past(&dir, 0, 0)?;
            (SegmentWriter::open(&dir, 0)?, BlockchainInfo::empty())
        } else {
            let loc = read_location(&db, height - 1)?;
            blockfile::trim_past(&dir, loc.file_num, loc.offset + u64::from(loc.length))?;
            let last: Block = decode(&blockfile::read_record(&dir, &loc)?)?;
            let store_info = BlockchainInfo {
                height,
                current_block_hash: last.hash(),
                previous_block_hash: last.header.previous_hash,
            };
            (SegmentWriter::open(&dir, loc.file_num)?, store_info)
        };

        info!(ledger_id, height, "opened block store");
        Ok(Self {
            ledger_id: ledger_id.to_string(),
            dir,
            db,
            max_file_size,
            writer: Mutex::new(writer),
            info: RwLock::new(store_info),
        })
    }

    /// Ledger this store belongs to.
    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    /// Number of committed blocks.
    pub fn height(&self) -> u64 {
        self.info.read().height
    }

    /// Chain info: height and the hashes of the last committed block.
    pub fn blockchain_info(&self) -> BlockchainInfo {
        self.info.read().clone()
    }

    /// Append a block.
    ///
    /// The block's number must equal the current height; anything else
    /// (duplicates included) fails with
    /// [`BlockStoreError::UnexpectedBlockNumber`].
    pub fn add_block(&self, block: &Block) -> Result<()> {
        let mut writer = self.writer.lock();

        let expected = self.info.read().height;
        let number = block.number();
        if number != expected {
            return UnexpectedBlockNumberSnafu { expected, received: number }.fail();
        }

        let encoded = encode(block)?;
        let loc = writer.append(self.max_file_size, &encoded)?;
        let loc_bytes = encode(&loc)?;
        let hash = block.hash();

        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut loc_table = txn.open_table(Tables::BLOCK_LOC).context(TableSnafu)?;
            loc_table.insert(number, &loc_bytes[..]).context(StorageSnafu)?;

            let mut hash_table = txn.open_table(Tables::BLOCK_HASH).context(TableSnafu)?;
            hash_table.insert(&hash[..], number).context(StorageSnafu)?;

            let mut tx_table = txn.open_table(Tables::TX_ID).context(TableSnafu)?;
            for (tx_index, tx) in block.transactions.iter().enumerate() {
                let tx_loc = encode(&TxLocation { block_num: number, tx_index: tx_index as u32 })?;
                tx_table.insert(tx.id.as_str(), &tx_loc[..]).context(StorageSnafu)?;
            }

            let mut meta = txn.open_table(Tables::META).context(TableSnafu)?;
            meta.insert(META_HEIGHT, number + 1).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;

        *self.info.write() = BlockchainInfo {
            height: number + 1,
            current_block_hash: hash,
            previous_block_hash: block.header.previous_hash,
        };
        debug!(ledger_id = %self.ledger_id, block_num = number, "added block");
        Ok(())
    }

    /// Read a block by number.
    pub fn retrieve_block_by_number(&self, block_num: u64) -> Result<Block> {
        let loc = match self.lookup_location(block_num)? {
            Some(loc) => loc,
            None => return BlockNotFoundSnafu { height: block_num }.fail(),
        };
        decode(&blockfile::read_record(&self.dir, &loc)?)
    }

    /// Read a block by its header hash.
    pub fn retrieve_block_by_hash(&self, hash: &Hash) -> Result<Block> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::BLOCK_HASH).context(TableSnafu)?;
        let Some(number) = table.get(&hash[..]).context(StorageSnafu)? else {
            return BlockHashNotFoundSnafu { hash: *hash }.fail();
        };
        self.retrieve_block_by_number(number.value())
    }

    /// Read a transaction by id.
    pub fn retrieve_tx_by_id(&self, tx_id: &str) -> Result<Transaction> {
        let tx_loc = {
            let txn = self.db.begin_read().context(TransactionSnafu)?;
            let table = txn.open_table(Tables::TX_ID).context(TableSnafu)?;
            let Some(raw) = table.get(tx_id).context(StorageSnafu)? else {
                return TxNotFoundSnafu { tx_id }.fail();
            };
            decode::<TxLocation>(raw.value())?
        };
        let block = self.retrieve_block_by_number(tx_loc.block_num)?;
        block
            .transactions
            .get(tx_loc.tx_index as usize)
            .cloned()
            .ok_or_else(|| BlockStoreError::TxNotFound { tx_id: tx_id.to_string() })
    }

    fn lookup_location(&self, block_num: u64) -> Result<Option<BlockLocation>> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::BLOCK_LOC).context(TableSnafu)?;
        match table.get(block_num).context(StorageSnafu)? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }
}

/// Create all tables so later read transactions never race table creation.
fn ensure_tables(db: &Database) -> Result<()> {
    let txn = db.begin_write().context(TransactionSnafu)?;
    txn.open_table(Tables::BLOCK_LOC).context(TableSnafu)?;
    txn.open_table(Tables::BLOCK_HASH).context(TableSnafu)?;
    txn.open_table(Tables::TX_ID).context(TableSnafu)?;
    txn.open_table(Tables::META).context(TableSnafu)?;
    txn.commit().context(CommitSnafu)?;
    Ok(())
}

fn read_height(db: &Database) -> Result<u64> {
    let txn = db.begin_read().context(TransactionSnafu)?;
    let table = txn.open_table(Tables::META).context(TableSnafu)?;
    Ok(table
        .get(META_HEIGHT)
        .context(StorageSnafu)?
        .map(|v| v.value())
        .unwrap_or(0))
}

fn read_location(db: &Database, block_num: u64) -> Result<BlockLocation> {
    let txn = db.begin_read().context(TransactionSnafu)?;
    let table = txn.open_table(Tables::BLOCK_LOC).context(TableSnafu)?;
    let Some(raw) = table.get(block_num).context(StorageSnafu)? else {
        return BlockNotFoundSnafu { height: block_num }.fail();
    };
    decode(raw.value())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value)
        .map_err(|e| BlockStoreError::Serialization { message: e.to_string() })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes)
        .map_err(|e| BlockStoreError::Serialization { message: e.to_string() })
}
