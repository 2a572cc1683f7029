//! The per-ledger private data store.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, ReadableTable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use tracing::{debug, info};

use parchment_types::{
    MissingPvtData, MissingPvtDataInfo, PvtNsCollFilter, TxMissingPvtDataMap, TxPvtData,
    TxPvtWriteSet,
};

use crate::btl::BtlPolicy;
use crate::error::{
    CommitSnafu, DatabaseSnafu, IoSnafu, PvtDataStoreError, Result, StorageSnafu, TableSnafu,
    TransactionSnafu, UnexpectedBlockNumberSnafu,
};
use crate::keys::{decode_block_tx_key, decode_expiry_key, encode_block_tx_key, encode_expiry_key};
use crate::tables::{ExpiryEntry, ExpiryRecord, Tables, META_HEIGHT};

/// Database file name within a ledger directory.
const STORE_FILE: &str = "pvtdata.redb";

/// Private data store for one ledger.
///
/// Write sets and missing-data records are keyed by
/// `(block number, transaction index)`. One commit is one redb write
/// transaction, so the store's height moves together with its contents.
/// Concurrent readers are supported; `commit` calls are serialized by the
/// coordinator above this store.
pub struct PvtDataStore {
    ledger_id: String,
    db: Database,
    purge_interval: u64,
    btl: RwLock<Option<Arc<dyn BtlPolicy>>>,
    /// Last committed block height; `None` while the store is empty.
    height: RwLock<Option<u64>>,
}

impl std::fmt::Debug for PvtDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PvtDataStore")
            .field("ledger_id", &self.ledger_id)
            .field("purge_interval", &self.purge_interval)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PvtDataStore {
    /// Open (or create) the private data store in `dir`.
    pub(crate) fn open(ledger_id: &str, dir: PathBuf, purge_interval: u64) -> Result<Self> {
        fs::create_dir_all(&dir).context(IoSnafu)?;
        let db = Database::create(dir.join(STORE_FILE)).context(DatabaseSnafu)?;
        ensure_tables(&db)?;

        let height = read_height(&db)?;
        info!(ledger_id, height = height.unwrap_or(0), "opened private data store");
        Ok(Self {
            ledger_id: ledger_id.to_string(),
            db,
            purge_interval,
            btl: RwLock::new(None),
            height: RwLock::new(height),
        })
    }

    /// Set the block-to-live policy. Must be called before the first commit.
    pub fn init(&self, btl: Arc<dyn BtlPolicy>) {
        *self.btl.write() = Some(btl);
    }

    /// Whether the store has never committed (nor been bootstrapped).
    pub fn is_empty(&self) -> bool {
        self.height.read().is_none()
    }

    /// Height of the last committed block plus one; 0 when empty.
    pub fn last_committed_block_height(&self) -> u64 {
        self.height.read().unwrap_or(0)
    }

    /// Bootstrap the store's height against an existing block store.
    ///
    /// Used when a private data store is opened for the first time over a
    /// chain that already has blocks: those blocks have no private data, and
    /// the store starts at the chain's height.
    pub fn init_last_committed_block(&self, height: u64) -> Result<()> {
        if !self.is_empty() {
            return Err(PvtDataStoreError::NotEmpty);
        }

        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut meta = txn.open_table(Tables::META).context(TableSnafu)?;
            meta.insert(META_HEIGHT, height).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;

        *self.height.write() = Some(height);
        info!(ledger_id = %self.ledger_id, height, "bootstrapped private data store height");
        Ok(())
    }

    /// Commit the private data and missing-data records of one block.
    ///
    /// `block_num` must be exactly the store's current height. Data,
    /// missing-data, expiry records, and the height advance atomically. Every
    /// `purge_interval` blocks, expired data is dropped within the same
    /// transaction.
    pub fn commit(
        &self,
        block_num: u64,
        pvt_data: Vec<TxPvtData>,
        missing: &TxMissingPvtDataMap,
    ) -> Result<()> {
        let btl = self
            .btl
            .read()
            .clone()
            .ok_or(PvtDataStoreError::UninitializedPolicy)?;

        let expected = self.last_committed_block_height();
        if block_num != expected {
            return UnexpectedBlockNumberSnafu { expected, received: block_num }.fail();
        }

        let mut pvt_data = pvt_data;
        pvt_data.sort_by_key(|d| d.seq_in_block);
        let expiries = collect_expiries(btl.as_ref(), block_num, &pvt_data, missing);

        let committed_height = block_num + 1;
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut data_table = txn.open_table(Tables::DATA).context(TableSnafu)?;
            for d in &pvt_data {
                let key = encode_block_tx_key(block_num, d.seq_in_block);
                let value = encode(&d.write_set)?;
                data_table.insert(&key[..], &value[..]).context(StorageSnafu)?;
            }

            let mut missing_table = txn.open_table(Tables::MISSING).context(TableSnafu)?;
            for (seq, entries) in missing.iter() {
                let key = encode_block_tx_key(block_num, *seq);
                let value = encode(entries)?;
                missing_table.insert(&key[..], &value[..]).context(StorageSnafu)?;
            }

            let mut expiry_table = txn.open_table(Tables::EXPIRY).context(TableSnafu)?;
            for (expiry_block, record) in &expiries {
                let key = encode_expiry_key(*expiry_block, block_num);
                let value = encode(record)?;
                expiry_table.insert(&key[..], &value[..]).context(StorageSnafu)?;
            }

            if committed_height % self.purge_interval == 0 {
                purge_expired(
                    &mut data_table,
                    &mut missing_table,
                    &mut expiry_table,
                    block_num,
                    &self.ledger_id,
                )?;
            }

            let mut meta = txn.open_table(Tables::META).context(TableSnafu)?;
            meta.insert(META_HEIGHT, committed_height).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;

        *self.height.write() = Some(committed_height);
        debug!(
            ledger_id = %self.ledger_id,
            block_num,
            pvt_entries = pvt_data.len(),
            "committed private data"
        );
        Ok(())
    }

    /// Private data of one block, ascending by transaction index.
    ///
    /// Unknown and out-of-range blocks yield an empty result. Entries of
    /// invalid transactions are included. A filter trims write sets; entries
    /// trimmed to nothing are dropped.
    pub fn get_pvt_data_by_block_num(
        &self,
        block_num: u64,
        filter: Option<&PvtNsCollFilter>,
    ) -> Result<Vec<TxPvtData>> {
        if block_num >= self.last_committed_block_height() {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::DATA).context(TableSnafu)?;

        let lo = encode_block_tx_key(block_num, 0);
        let hi = encode_block_tx_key(block_num, u64::MAX);
        let mut out = Vec::new();
        for item in table.range::<&[u8]>(&lo[..]..=&hi[..]).context(StorageSnafu)? {
            let (key, value) = item.context(StorageSnafu)?;
            let Some((_, seq_in_block)) = decode_block_tx_key(key.value()) else {
                continue;
            };
            let write_set: TxPvtWriteSet = decode(value.value())?;
            let write_set = match filter {
                None => write_set,
                Some(f) => match write_set.filter(f) {
                    Some(trimmed) => trimmed,
                    None => continue,
                },
            };
            out.push(TxPvtData { seq_in_block, write_set });
        }
        Ok(out)
    }

    /// Eligible missing-data entries of the `n` most recently committed
    /// blocks, regardless of transaction validity.
    ///
    /// Ineligible entries stay on disk for the dissemination layer but are
    /// not fetch work, so they are not reported.
    pub fn get_missing_pvt_data_info_for_most_recent_blocks(
        &self,
        n: u64,
    ) -> Result<MissingPvtDataInfo> {
        let mut info = MissingPvtDataInfo::default();
        let height = self.last_committed_block_height();
        if height == 0 || n == 0 {
            return Ok(info);
        }

        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::MISSING).context(TableSnafu)?;

        let lo = encode_block_tx_key(height.saturating_sub(n), 0);
        let hi = encode_block_tx_key(height - 1, u64::MAX);
        for item in table.range::<&[u8]>(&lo[..]..=&hi[..]).context(StorageSnafu)? {
            let (key, value) = item.context(StorageSnafu)?;
            let Some((block_num, seq_in_block)) = decode_block_tx_key(key.value()) else {
                continue;
            };
            let entries: Vec<MissingPvtData> = decode(value.value())?;
            for entry in entries {
                if entry.is_eligible {
                    info.add(block_num, seq_in_block, &entry.namespace, &entry.collection);
                }
            }
        }
        Ok(info)
    }

    /// Ledger this store belongs to.
    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }
}

/// Group the expiring collections of one commit by expiry block.
fn collect_expiries(
    btl: &dyn BtlPolicy,
    block_num: u64,
    pvt_data: &[TxPvtData],
    missing: &TxMissingPvtDataMap,
) -> BTreeMap<u64, ExpiryRecord> {
    let mut expiries: BTreeMap<u64, ExpiryRecord> = BTreeMap::new();

    for d in pvt_data {
        for ns in &d.write_set.ns_data {
            let mut groups: BTreeMap<u64, Vec<String>> = BTreeMap::new();
            for coll in &ns.collections {
                let eb = btl.expiring_block(&ns.namespace, &coll.collection, block_num);
                if eb != u64::MAX {
                    groups.entry(eb).or_default().push(coll.collection.clone());
                }
            }
            for (eb, collections) in groups {
                expiries.entry(eb).or_default().present.push(ExpiryEntry {
                    seq_in_block: d.seq_in_block,
                    namespace: ns.namespace.clone(),
                    collections,
                });
            }
        }
    }

    for (seq, entries) in missing.iter() {
        let mut groups: BTreeMap<(u64, String), Vec<String>> = BTreeMap::new();
        for entry in entries {
            let eb = btl.expiring_block(&entry.namespace, &entry.collection, block_num);
            if eb != u64::MAX {
                groups
                    .entry((eb, entry.namespace.clone()))
                    .or_default()
                    .push(entry.collection.clone());
            }
        }
        for ((eb, namespace), collections) in groups {
            expiries.entry(eb).or_default().missing.push(ExpiryEntry {
                seq_in_block: *seq,
                namespace,
                collections,
            });
        }
    }

    expiries
}

/// Drop everything whose expiry block is at or before `current_block`.
///
/// Expired collections are trimmed out of the stored write sets (entries that
/// become empty are removed), and matching missing-data records are dropped.
fn purge_expired(
    data_table: &mut redb::Table<'_, &'static [u8], &'static [u8]>,
    missing_table: &mut redb::Table<'_, &'static [u8], &'static [u8]>,
    expiry_table: &mut redb::Table<'_, &'static [u8], &'static [u8]>,
    current_block: u64,
    ledger_id: &str,
) -> Result<()> {
    let hi = encode_expiry_key(current_block, u64::MAX);
    let expired: Vec<(Vec<u8>, ExpiryRecord)> = {
        let mut acc = Vec::new();
        for item in expiry_table.range::<&[u8]>(..=&hi[..]).context(StorageSnafu)? {
            let (key, value) = item.context(StorageSnafu)?;
            acc.push((key.value().to_vec(), decode(value.value())?));
        }
        acc
    };
    if expired.is_empty() {
        return Ok(());
    }

    let mut purged = 0usize;
    for (key, record) in &expired {
        let Some((_, committing_block)) = decode_expiry_key(key) else {
            continue;
        };

        for entry in &record.present {
            let data_key = encode_block_tx_key(committing_block, entry.seq_in_block);
            let existing = data_table
                .get(&data_key[..])
                .context(StorageSnafu)?
                .map(|g| g.value().to_vec());
            let Some(bytes) = existing else {
                continue;
            };
            let mut write_set: TxPvtWriteSet = decode(&bytes)?;
            trim_expired(&mut write_set, &entry.namespace, &entry.collections);
            if write_set.is_empty() {
                data_table.remove(&data_key[..]).context(StorageSnafu)?;
            } else {
                let value = encode(&write_set)?;
                data_table.insert(&data_key[..], &value[..]).context(StorageSnafu)?;
            }
            purged += 1;
        }

        for entry in &record.missing {
            let missing_key = encode_block_tx_key(committing_block, entry.seq_in_block);
            let existing = missing_table
                .get(&missing_key[..])
                .context(StorageSnafu)?
                .map(|g| g.value().to_vec());
            let Some(bytes) = existing else {
                continue;
            };
            let mut entries: Vec<MissingPvtData> = decode(&bytes)?;
            entries.retain(|m| {
                m.namespace != entry.namespace || !entry.collections.contains(&m.collection)
            });
            if entries.is_empty() {
                missing_table.remove(&missing_key[..]).context(StorageSnafu)?;
            } else {
                let value = encode(&entries)?;
                missing_table
                    .insert(&missing_key[..], &value[..])
                    .context(StorageSnafu)?;
            }
            purged += 1;
        }

        expiry_table.remove(&key[..]).context(StorageSnafu)?;
    }

    debug!(ledger_id, current_block, purged, "purged expired private data");
    Ok(())
}

fn trim_expired(write_set: &mut TxPvtWriteSet, namespace: &str, collections: &[String]) {
    for ns in &mut write_set.ns_data {
        if ns.namespace == namespace {
            ns.collections.retain(|c| !collections.contains(&c.collection));
        }
    }
    write_set.ns_data.retain(|ns| !ns.collections.is_empty());
}

/// Create all tables so later read transactions never race table creation.
fn ensure_tables(db: &Database) -> Result<()> {
    let txn = db.begin_write().context(TransactionSnafu)?;
    txn.open_table(Tables::DATA).context(TableSnafu)?;
    txn.open_table(Tables::MISSING).context(TableSnafu)?;
    txn.open_table(Tables::EXPIRY).context(TableSnafu)?;
    txn.open_table(Tables::META).context(TableSnafu)?;
    txn.commit().context(CommitSnafu)?;
    Ok(())
}

fn read_height(db: &Database) -> Result<Option<u64>> {
    let txn = db.begin_read().context(TransactionSnafu)?;
    let table = txn.open_table(Tables::META).context(TableSnafu)?;
    Ok(table.get(META_HEIGHT).context(StorageSnafu)?.map(|v| v.value()))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value)
        .map_err(|e| PvtDataStoreError::Serialization { message: e.to_string() })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes)
        .map_err(|e| PvtDataStoreError::Serialization { message: e.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use parchment_types::{CollectionPvtData, NsPvtData};

    use crate::btl::StaticBtlPolicy;

    use super::*;

    fn open_store(dir: &std::path::Path, purge_interval: u64) -> PvtDataStore {
        let store = PvtDataStore::open("test-ledger", dir.to_path_buf(), purge_interval)
            .expect("open store");
        store.init(Arc::new(StaticBtlPolicy::new()));
        store
    }

    fn sample_tx_pvt_data(seq_in_block: u64) -> TxPvtData {
        TxPvtData {
            seq_in_block,
            write_set: TxPvtWriteSet {
                ns_data: vec![NsPvtData {
                    namespace: "ns-1".to_string(),
                    collections: vec![
                        CollectionPvtData {
                            collection: "coll-1".to_string(),
                            payload: b"pvt-ns1-coll1".to_vec(),
                        },
                        CollectionPvtData {
                            collection: "coll-2".to_string(),
                            payload: b"pvt-ns1-coll2".to_vec(),
                        },
                    ],
                }],
            },
        }
    }

    #[test]
    fn test_commit_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        // Deliberately unsorted input.
        let data = vec![sample_tx_pvt_data(6), sample_tx_pvt_data(3), sample_tx_pvt_data(5)];
        store
            .commit(0, data, &TxMissingPvtDataMap::default())
            .expect("commit");

        assert_eq!(store.last_committed_block_height(), 1);
        let loaded = store.get_pvt_data_by_block_num(0, None).expect("get");
        let seqs: Vec<u64> = loaded.iter().map(|d| d.seq_in_block).collect();
        assert_eq!(seqs, vec![3, 5, 6]);
        assert_eq!(loaded[0].write_set, sample_tx_pvt_data(3).write_set);
    }

    #[test]
    fn test_unknown_block_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);
        store
            .commit(0, vec![sample_tx_pvt_data(0)], &TxMissingPvtDataMap::default())
            .expect("commit");

        assert!(store.get_pvt_data_by_block_num(1, None).expect("get").is_empty());
        assert!(store.get_pvt_data_by_block_num(99, None).expect("get").is_empty());
    }

    #[test]
    fn test_commit_rejects_wrong_block_number() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        let err = store
            .commit(5, vec![], &TxMissingPvtDataMap::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PvtDataStoreError::UnexpectedBlockNumber { expected: 0, received: 5 }
        ));
    }

    #[test]
    fn test_commit_requires_policy() {
        let dir = tempfile::tempdir().unwrap();
        let store = PvtDataStore::open("test-ledger", dir.path().to_path_buf(), 100)
            .expect("open store");

        let err = store
            .commit(0, vec![], &TxMissingPvtDataMap::default())
            .unwrap_err();
        assert!(matches!(err, PvtDataStoreError::UninitializedPolicy));
    }

    #[test]
    fn test_filter_drops_fully_trimmed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        let mut other = sample_tx_pvt_data(1);
        other.write_set.ns_data[0].namespace = "ns-2".to_string();
        store
            .commit(0, vec![sample_tx_pvt_data(0), other], &TxMissingPvtDataMap::default())
            .expect("commit");

        let mut filter = PvtNsCollFilter::new();
        filter.add("ns-1", "coll-2");
        let loaded = store.get_pvt_data_by_block_num(0, Some(&filter)).expect("get");

        // Only tx 0 survives, trimmed to the one collection.
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].seq_in_block, 0);
        assert_eq!(loaded[0].write_set.ns_data.len(), 1);
        assert_eq!(loaded[0].write_set.ns_data[0].collections.len(), 1);
        assert_eq!(loaded[0].write_set.ns_data[0].collections[0].collection, "coll-2");
    }

    #[test]
    fn test_missing_data_query_reports_eligible_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        let mut missing = TxMissingPvtDataMap::default();
        missing.add(4, "ns-4", "coll-4", true);
        missing.add(5, "ns-5", "coll-5", false);
        store.commit(0, vec![], &missing).expect("commit");

        let info = store
            .get_missing_pvt_data_info_for_most_recent_blocks(1)
            .expect("query");
        let block = info.block(0).expect("block 0 reported");
        assert_eq!(block.len(), 1);
        assert_eq!(block[&4][0].namespace, "ns-4");
    }

    #[test]
    fn test_missing_data_query_windows_recent_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        for block_num in 0..4 {
            let mut missing = TxMissingPvtDataMap::default();
            missing.add(0, "ns-1", "coll-1", true);
            store.commit(block_num, vec![], &missing).expect("commit");
        }

        let info = store
            .get_missing_pvt_data_info_for_most_recent_blocks(2)
            .expect("query");
        assert!(info.block(0).is_none());
        assert!(info.block(1).is_none());
        assert!(info.block(2).is_some());
        assert!(info.block(3).is_some());
    }

    #[test]
    fn test_bootstrap_height() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 100);

        assert!(store.is_empty());
        store.init_last_committed_block(9).expect("bootstrap");
        assert!(!store.is_empty());
        assert_eq!(store.last_committed_block_height(), 9);

        // Bootstrapping twice is an error.
        assert!(matches!(
            store.init_last_committed_block(10),
            Err(PvtDataStoreError::NotEmpty)
        ));

        // Commits resume from the bootstrapped height.
        store
            .commit(9, vec![sample_tx_pvt_data(0)], &TxMissingPvtDataMap::default())
            .expect("commit");
        assert_eq!(store.last_committed_block_height(), 10);
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path(), 100);
            store
                .commit(0, vec![sample_tx_pvt_data(2)], &TxMissingPvtDataMap::default())
                .expect("commit");
        }

        let store = open_store(dir.path(), 100);
        assert_eq!(store.last_committed_block_height(), 1);
        let loaded = store.get_pvt_data_by_block_num(0, None).expect("get");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].seq_in_block, 2);
    }

    #[test]
    fn test_btl_purge_trims_expired_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = PvtDataStore::open("test-ledger", dir.path().to_path_buf(), 1)
            .expect("open store");
        // coll-1 lives for 1 block; coll-2 never expires.
        store.init(Arc::new(StaticBtlPolicy::new().set("ns-1", "coll-1", 1)));

        store
            .commit(0, vec![sample_tx_pvt_data(0)], &TxMissingPvtDataMap::default())
            .expect("commit block 0");

        // Not expired yet at block 1.
        store.commit(1, vec![], &TxMissingPvtDataMap::default()).expect("commit block 1");
        let loaded = store.get_pvt_data_by_block_num(0, None).expect("get");
        assert_eq!(loaded[0].write_set.ns_data[0].collections.len(), 2);

        // Expires at block 2 = 0 + btl(1) + 1.
        store.commit(2, vec![], &TxMissingPvtDataMap::default()).expect("commit block 2");
        let loaded = store.get_pvt_data_by_block_num(0, None).expect("get");
        assert_eq!(loaded.len(), 1);
        let colls: Vec<&str> = loaded[0].write_set.ns_data[0]
            .collections
            .iter()
            .map(|c| c.collection.as_str())
            .collect();
        assert_eq!(colls, vec!["coll-2"]);
    }

    #[test]
    fn test_btl_purge_drops_empty_entries_and_missing_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = PvtDataStore::open("test-ledger", dir.path().to_path_buf(), 1)
            .expect("open store");
        store.init(Arc::new(
            StaticBtlPolicy::new()
                .set("ns-1", "coll-1", 1)
                .set("ns-1", "coll-2", 1)
                .set("ns-m", "coll-m", 1),
        ));

        let mut missing = TxMissingPvtDataMap::default();
        missing.add(1, "ns-m", "coll-m", true);
        store
            .commit(0, vec![sample_tx_pvt_data(0)], &missing)
            .expect("commit block 0");

        store.commit(1, vec![], &TxMissingPvtDataMap::default()).expect("commit block 1");
        store.commit(2, vec![], &TxMissingPvtDataMap::default()).expect("commit block 2");

        // Both collections expired, so the whole entry is gone.
        assert!(store.get_pvt_data_by_block_num(0, None).expect("get").is_empty());
        // The missing record expired with its collection.
        let info = store
            .get_missing_pvt_data_info_for_most_recent_blocks(10)
            .expect("query");
        assert!(info.is_empty());
    }
}
