//! Private data write sets and missing-data bookkeeping.
//!
//! Private data is keyed by `(block number, transaction index)` and nested as
//! namespace → collection → opaque bytes. The nesting order is significant:
//! filtering (`TxPvtWriteSet::filter`) is stable with respect to input order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::filter::PvtNsCollFilter;

/// Private writes of one collection within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPvtData {
    /// Collection name.
    pub collection: String,
    /// Opaque serialized write set for the collection.
    pub payload: Vec<u8>,
}

/// Private writes of one namespace, across its collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsPvtData {
    /// Namespace (typically a chaincode name).
    pub namespace: String,
    /// Per-collection writes, in dissemination order.
    pub collections: Vec<CollectionPvtData>,
}

/// Full private write set of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPvtWriteSet {
    /// Per-namespace writes, in dissemination order.
    pub ns_data: Vec<NsPvtData>,
}

impl TxPvtWriteSet {
    /// Whether the write set carries no namespace entries.
    pub fn is_empty(&self) -> bool {
        self.ns_data.is_empty()
    }

    /// Apply a namespace/collection filter.
    ///
    /// A namespace entry is retained iff at least one of its collections is in
    /// the filter under that namespace; within a retained namespace only
    /// filtered collections remain. Output order equals input order. Returns
    /// `None` when nothing survives the filter.
    pub fn filter(&self, filter: &PvtNsCollFilter) -> Option<TxPvtWriteSet> {
        let mut ns_data = Vec::new();
        for ns in &self.ns_data {
            if !filter.has_namespace(&ns.namespace) {
                continue;
            }
            let collections: Vec<CollectionPvtData> = ns
                .collections
                .iter()
                .filter(|c| filter.contains(&ns.namespace, &c.collection))
                .cloned()
                .collect();
            if !collections.is_empty() {
                ns_data.push(NsPvtData { namespace: ns.namespace.clone(), collections });
            }
        }
        if ns_data.is_empty() {
            None
        } else {
            Some(TxPvtWriteSet { ns_data })
        }
    }
}

/// Private data of one transaction within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPvtData {
    /// Index of the transaction within its block.
    pub seq_in_block: u64,
    /// The transaction's private write set.
    pub write_set: TxPvtWriteSet,
}

/// Private data of a block, keyed by transaction index.
pub type TxPvtDataMap = BTreeMap<u64, TxPvtData>;

/// One missing private data record: a collection the peer expected but does
/// not hold. `is_eligible` is true when the peer is a member of the collection
/// and should attempt to fetch the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPvtData {
    /// Namespace of the missing collection.
    pub namespace: String,
    /// Missing collection name.
    pub collection: String,
    /// Whether the peer is entitled to the data and should fetch it.
    pub is_eligible: bool,
}

/// Missing private data of a block, keyed by transaction index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMissingPvtDataMap(BTreeMap<u64, Vec<MissingPvtData>>);

impl TxMissingPvtDataMap {
    /// Record a missing collection for the transaction at `seq_in_block`.
    pub fn add(&mut self, seq_in_block: u64, namespace: &str, collection: &str, eligible: bool) {
        self.0.entry(seq_in_block).or_default().push(MissingPvtData {
            namespace: namespace.to_string(),
            collection: collection.to_string(),
            is_eligible: eligible,
        });
    }

    /// Whether no missing data is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in ascending transaction order.
    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Vec<MissingPvtData>)> {
        self.0.iter()
    }
}

/// A block joined with its private data and missing-data records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAndPvtData {
    /// The block.
    pub block: Block,
    /// Private data present for a subset of the block's transactions.
    pub pvt_data: TxPvtDataMap,
    /// Private data the peer expected but has not received.
    pub missing_pvt_data: TxMissingPvtDataMap,
}

impl BlockAndPvtData {
    /// A block with no private data attached.
    pub fn new(block: Block) -> Self {
        Self { block, pvt_data: TxPvtDataMap::new(), missing_pvt_data: TxMissingPvtDataMap::default() }
    }
}

/// A missing collection reference as reported by the missing-data query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCollection {
    /// Namespace of the missing collection.
    pub namespace: String,
    /// Missing collection name.
    pub collection: String,
}

/// Missing private data across blocks: `block → tx index → collections`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingPvtDataInfo(BTreeMap<u64, BTreeMap<u64, Vec<MissingCollection>>>);

impl MissingPvtDataInfo {
    /// Record a missing collection for `(block_num, seq_in_block)`.
    pub fn add(&mut self, block_num: u64, seq_in_block: u64, namespace: &str, collection: &str) {
        self.0
            .entry(block_num)
            .or_default()
            .entry(seq_in_block)
            .or_default()
            .push(MissingCollection {
                namespace: namespace.to_string(),
                collection: collection.to_string(),
            });
    }

    /// Whether no missing data is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Missing data of one block, if any.
    pub fn block(&self, block_num: u64) -> Option<&BTreeMap<u64, Vec<MissingCollection>>> {
        self.0.get(&block_num)
    }

    /// Iterate blocks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&u64, &BTreeMap<u64, Vec<MissingCollection>>)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_write_set() -> TxPvtWriteSet {
        TxPvtWriteSet {
            ns_data: vec![
                NsPvtData {
                    namespace: "ns-1".to_string(),
                    collections: vec![
                        CollectionPvtData { collection: "coll-1".to_string(), payload: vec![1] },
                        CollectionPvtData { collection: "coll-2".to_string(), payload: vec![2] },
                    ],
                },
                NsPvtData {
                    namespace: "ns-2".to_string(),
                    collections: vec![CollectionPvtData {
                        collection: "coll-1".to_string(),
                        payload: vec![3],
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_filter_retains_matching_pairs_only() {
        let ws = sample_write_set();
        let mut filter = PvtNsCollFilter::new();
        filter.add("ns-1", "coll-2");

        let trimmed = ws.filter(&filter).expect("ns-1/coll-2 should survive");
        assert_eq!(trimmed.ns_data.len(), 1);
        assert_eq!(trimmed.ns_data[0].namespace, "ns-1");
        assert_eq!(trimmed.ns_data[0].collections.len(), 1);
        assert_eq!(trimmed.ns_data[0].collections[0].collection, "coll-2");
    }

    #[test]
    fn test_filter_drops_everything() {
        let ws = sample_write_set();
        let mut filter = PvtNsCollFilter::new();
        filter.add("ns-9", "coll-9");
        assert!(ws.filter(&filter).is_none());
    }

    #[test]
    fn test_filter_is_stable() {
        let ws = sample_write_set();
        let mut filter = PvtNsCollFilter::new();
        filter.add("ns-2", "coll-1");
        filter.add("ns-1", "coll-1");
        filter.add("ns-1", "coll-2");

        let trimmed = ws.filter(&filter).expect("everything matches");
        // Input order preserved, regardless of filter insertion order.
        assert_eq!(trimmed, ws);
    }

    #[test]
    fn test_missing_map_groups_by_tx() {
        let mut missing = TxMissingPvtDataMap::default();
        missing.add(4, "ns-4", "coll-4", true);
        missing.add(4, "ns-4", "coll-5", false);
        missing.add(5, "ns-5", "coll-5", true);

        let entries: Vec<_> = missing.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(*entries[0].0, 4);
        assert_eq!(entries[0].1.len(), 2);
        assert_eq!(*entries[1].0, 5);
    }

    #[test]
    fn test_missing_info_add_and_lookup() {
        let mut info = MissingPvtDataInfo::default();
        info.add(5, 4, "ns-4", "coll-4");
        info.add(5, 5, "ns-5", "coll-5");

        let block = info.block(5).expect("block 5 recorded");
        assert_eq!(block.len(), 2);
        assert_eq!(block[&4][0].collection, "coll-4");
        assert!(info.block(6).is_none());
    }
}
