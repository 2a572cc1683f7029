//! Construction of hash-chained test blocks and sample private data.

use parchment_types::{
    hash::{compute_data_hash, ZERO_HASH},
    Block, BlockHeader, BlockMetadata, CollectionPvtData, NsPvtData, Transaction, TxPvtData,
    TxPvtDataMap, TxPvtWriteSet, TxValidationFlags,
};

/// Transactions per constructed test block.
pub const TXS_PER_BLOCK: usize = 8;

/// Build `count` chained blocks numbered from 0.
///
/// Each block carries [`TXS_PER_BLOCK`] transactions with ledger-unique ids,
/// a data hash over them, the previous block's header hash, and all-valid
/// validation flags.
pub fn construct_test_blocks(count: usize) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(count);
    let mut previous_hash = ZERO_HASH;
    for number in 0..count as u64 {
        let transactions: Vec<Transaction> = (0..TXS_PER_BLOCK)
            .map(|seq| Transaction {
                id: format!("txid-{}-{}", number, seq),
                payload: format!("payload-{}-{}", number, seq).into_bytes(),
            })
            .collect();
        let header = BlockHeader {
            number,
            previous_hash,
            data_hash: compute_data_hash(&transactions),
        };
        previous_hash = header.hash();
        blocks.push(Block {
            header,
            metadata: BlockMetadata {
                tx_validation_flags: TxValidationFlags::new(transactions.len()),
            },
            transactions,
        });
    }
    blocks
}

/// Sample private data for the given transaction indices.
///
/// Every transaction gets the same write set: namespace `ns-1` with
/// collections `coll-1` and `coll-2`.
pub fn sample_pvt_data(tx_nums: &[u64]) -> TxPvtDataMap {
    let write_set = TxPvtWriteSet {
        ns_data: vec![NsPvtData {
            namespace: "ns-1".to_string(),
            collections: vec![
                CollectionPvtData {
                    collection: "coll-1".to_string(),
                    payload: b"pvt-writes-ns1-coll1".to_vec(),
                },
                CollectionPvtData {
                    collection: "coll-2".to_string(),
                    payload: b"pvt-writes-ns1-coll2".to_vec(),
                },
            ],
        }],
    };

    tx_nums
        .iter()
        .map(|&seq_in_block| {
            (seq_in_block, TxPvtData { seq_in_block, write_set: write_set.clone() })
        })
        .collect()
}
