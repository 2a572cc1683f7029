//! Test utilities for the parchment workspace.
//!
//! This crate provides:
//! - [`TestDir`]: managed temporary directories
//! - Construction of hash-chained test blocks and sample private data

mod blocks;
mod test_dir;

pub use blocks::{construct_test_blocks, sample_pvt_data, TXS_PER_BLOCK};
pub use test_dir::TestDir;
