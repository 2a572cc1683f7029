//! Per-ledger private data store provider.

use std::fs;

use snafu::ResultExt;

use parchment_types::PvtDataConfig;

use crate::error::{ConfigSnafu, IoSnafu, Result};
use crate::store::PvtDataStore;

/// Opens private data stores under a common root, one subdirectory per ledger.
pub struct PvtDataStoreProvider {
    conf: PvtDataConfig,
}

impl PvtDataStoreProvider {
    /// Create a provider for `conf.store_path`, creating the root if needed.
    pub fn new(conf: PvtDataConfig) -> Result<Self> {
        conf.validate().context(ConfigSnafu)?;
        fs::create_dir_all(&conf.store_path).context(IoSnafu)?;
        Ok(Self { conf })
    }

    /// Open (or create) the private data store for `ledger_id`.
    pub fn open_store(&self, ledger_id: &str) -> Result<PvtDataStore> {
        PvtDataStore::open(
            ledger_id,
            self.conf.store_path.join(ledger_id),
            self.conf.purge_interval,
        )
    }
}
