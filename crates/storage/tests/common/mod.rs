//! Shared fixtures for the ledger storage integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;

use parchment_pvtstore::{BtlPolicy, StaticBtlPolicy};
use parchment_storage::Provider;
use parchment_test_utils::{construct_test_blocks, sample_pvt_data, TestDir};
use parchment_types::{BlockAndPvtData, BlockStoreConfig, PvtDataConfig, TxValidationCode};

/// Block store root within a test directory.
pub const CHAINS_DIR: &str = "chains";
/// Private data store root within a test directory.
pub const PVT_DATA_DIR: &str = "pvtdataStore";

/// Build a provider over the standard sub-roots of `dir`.
///
/// Reopening with the same `dir` yields a provider over the same state.
pub fn build_provider(dir: &TestDir) -> Provider {
    let blk_conf = BlockStoreConfig::builder()
        .root_dir(dir.join(CHAINS_DIR))
        .build()
        .expect("valid block store config");
    let pvt_conf = PvtDataConfig::builder()
        .store_path(dir.join(PVT_DATA_DIR))
        .purge_interval(1)
        .build()
        .expect("valid pvt data config");
    Provider::new(blk_conf, pvt_conf).expect("provider")
}

/// BTL policy for the sample collections: nothing expires.
pub fn sample_btl_policy() -> Arc<dyn BtlPolicy> {
    Arc::new(
        StaticBtlPolicy::new()
            .set("ns-1", "coll-1", 0)
            .set("ns-1", "coll-2", 0),
    )
}

/// Ten blocks with private data on a few selected transactions:
/// - block 2: pvt data for txs 3, 5, 6 — tx 6 marked invalid
/// - block 3: pvt data for txs 4, 6
/// - block 5: missing data for txs 4, 5 — tx 5 marked invalid
pub fn sample_data_with_pvt_data_for_selective_tx() -> Vec<BlockAndPvtData> {
    let mut data: Vec<BlockAndPvtData> = construct_test_blocks(10)
        .into_iter()
        .map(BlockAndPvtData::new)
        .collect();

    data[2].pvt_data = sample_pvt_data(&[3, 5, 6]);
    data[2]
        .block
        .metadata
        .tx_validation_flags
        .set_flag(6, TxValidationCode::InvalidWriteset);

    data[3].pvt_data = sample_pvt_data(&[4, 6]);

    data[5].missing_pvt_data.add(4, "ns-4", "coll-4", true);
    data[5].missing_pvt_data.add(5, "ns-5", "coll-5", true);
    data[5]
        .block
        .metadata
        .tx_validation_flags
        .set_flag(5, TxValidationCode::InvalidWriteset);

    data
}

/// Ten blocks where block `i` carries private data for txs `i` and `i + 1`.
pub fn sample_data_with_pvt_data_for_all_txs() -> Vec<BlockAndPvtData> {
    construct_test_blocks(10)
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let mut bp = BlockAndPvtData::new(block);
            bp.pvt_data = sample_pvt_data(&[i as u64, i as u64 + 1]);
            bp
        })
        .collect()
}
