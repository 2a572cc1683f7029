//! Per-ledger block store provider.

use std::fs;

use snafu::ResultExt;

use parchment_types::BlockStoreConfig;

use crate::error::{ConfigSnafu, IoSnafu, Result};
use crate::store::BlockStore;

/// Opens block stores under a common root, one subdirectory per ledger.
pub struct BlockStoreProvider {
    conf: BlockStoreConfig,
}

impl BlockStoreProvider {
    /// Create a provider for `conf.root_dir`, creating the root if needed.
    pub fn new(conf: BlockStoreConfig) -> Result<Self> {
        conf.validate().context(ConfigSnafu)?;
        fs::create_dir_all(&conf.root_dir).context(IoSnafu)?;
        Ok(Self { conf })
    }

    /// Open (or create) the block store for `ledger_id`.
    pub fn open_store(&self, ledger_id: &str) -> Result<BlockStore> {
        BlockStore::open(ledger_id, self.conf.root_dir.join(ledger_id), self.conf.max_file_size)
    }
}
