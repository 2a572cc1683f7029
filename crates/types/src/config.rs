//! Store configuration with validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Minimum segment block file size: 1 MiB.
const MIN_BLOCK_FILE_SIZE: u64 = 1024 * 1024;

/// Configuration error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[snafu(display("Invalid configuration: {message}"))]
    Validation {
        /// What is wrong with the value.
        message: String,
    },
}

/// Block store configuration.
///
/// # Validation Rules
///
/// - `max_file_size` must be >= 1 MiB
///
/// # Example
///
/// ```no_run
/// # use parchment_types::BlockStoreConfig;
/// let config = BlockStoreConfig::builder()
///     .root_dir("/var/ledger/chains")
///     .build()
///     .expect("valid block store config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStoreConfig {
    /// Root directory holding one subdirectory per ledger.
    pub root_dir: PathBuf,
    /// Maximum size of a segment block file in bytes.
    ///
    /// Must be >= 1 MiB. Default: 64 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

#[bon::bon]
impl BlockStoreConfig {
    /// Creates a new block store configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_file_size` < 1 MiB.
    #[builder]
    pub fn new(
        #[builder(into)] root_dir: PathBuf,
        #[builder(default = default_max_file_size())] max_file_size: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self { root_dir, max_file_size };
        config.validate()?;
        Ok(config)
    }
}

impl BlockStoreConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size < MIN_BLOCK_FILE_SIZE {
            return Err(ConfigError::Validation {
                message: format!(
                    "max_file_size must be >= {} (1 MiB), got {}",
                    MIN_BLOCK_FILE_SIZE, self.max_file_size
                ),
            });
        }
        Ok(())
    }
}

/// Private data store configuration.
///
/// # Validation Rules
///
/// - `purge_interval` must be >= 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvtDataConfig {
    /// Root directory holding one private data store per ledger.
    pub store_path: PathBuf,
    /// Number of blocks between purges of expired private data.
    ///
    /// Must be >= 1. Default: 100.
    #[serde(default = "default_purge_interval")]
    pub purge_interval: u64,
}

#[bon::bon]
impl PvtDataConfig {
    /// Creates a new private data store configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `purge_interval` == 0.
    #[builder]
    pub fn new(
        #[builder(into)] store_path: PathBuf,
        #[builder(default = default_purge_interval())] purge_interval: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self { store_path, purge_interval };
        config.validate()?;
        Ok(config)
    }
}

impl PvtDataConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.purge_interval == 0 {
            return Err(ConfigError::Validation {
                message: "purge_interval must be >= 1, got 0".to_string(),
            });
        }
        Ok(())
    }
}

fn default_max_file_size() -> u64 {
    64 * 1024 * 1024 // 64 MiB
}

fn default_purge_interval() -> u64 {
    100
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_block_store_config_defaults() {
        let config = BlockStoreConfig::builder()
            .root_dir("/tmp/chains")
            .build()
            .expect("valid config");
        assert_eq!(config.max_file_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_block_store_config_rejects_tiny_files() {
        let result = BlockStoreConfig::builder()
            .root_dir("/tmp/chains")
            .max_file_size(4096)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_pvt_data_config_defaults() {
        let config = PvtDataConfig::builder()
            .store_path("/tmp/pvtdataStore")
            .build()
            .expect("valid config");
        assert_eq!(config.purge_interval, 100);
    }

    #[test]
    fn test_pvt_data_config_rejects_zero_interval() {
        let result = PvtDataConfig::builder()
            .store_path("/tmp/pvtdataStore")
            .purge_interval(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialized_config_validates() {
        let config: PvtDataConfig =
            serde_json::from_str(r#"{"store_path": "/tmp/p", "purge_interval": 0}"#)
                .expect("deserializes");
        assert!(config.validate().is_err());
    }
}
