//! # RocksDB Backing
//!
//! Production `KeyValue` implementation over a single RocksDB database
//! with one column family per derived store.
//!
//! ## Column Families
//!
//! - `account-log` - Per-account action log (mn-02)
//! - `balances` - Balance projection (mn-03)
//! - `replication` - Storage replication projection (mn-03)
//! - `statistics` - Usage statistics projection (mn-03)
//! - `content` - Channel content chains (mn-04)
//! - `chain-state` - Cursor, block infos, tracked accounts (mn-05)
//!
//! All six handles share one `Arc<DB>`, so the staged stores keep their
//! one-backing-per-store shape while the data lives in one database under
//! the data directory.
//!
//! ## Configuration
//!
//! Tuned for a replay-heavy write pattern:
//! - Snappy compression on every column family
//! - Bloom filters (10 bits per key) for point reads
//! - fsync on commit by default; tests turn it off

use std::sync::Arc;

use mn_01_staged_store::{BatchOp, KeyValue, StoreError};
use mn_05_sync_engine::MirrorBackings;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

/// Column family per derived store.
pub const CF_ACCOUNT_LOG: &str = "account-log";
pub const CF_BALANCES: &str = "balances";
pub const CF_REPLICATION: &str = "replication";
pub const CF_STATISTICS: &str = "statistics";
pub const CF_CONTENT: &str = "content";
pub const CF_CHAIN_STATE: &str = "chain-state";

/// All column families used by the mirror.
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_ACCOUNT_LOG,
    CF_BALANCES,
    CF_REPLICATION,
    CF_STATISTICS,
    CF_CONTENT,
    CF_CHAIN_STATE,
];

/// RocksDB configuration for production use.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory.
    pub path: String,
    /// Block cache size in bytes (default: 256MB).
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB).
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3).
    pub max_write_buffer_number: i32,
    /// Target file size for level-1 (default: 64MB).
    pub target_file_size_base: u64,
    /// Enable fsync after each write (default: true for durability).
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            target_file_size_base: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Config for testing (smaller buffers, no sync).
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            target_file_size_base: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// One store's view of the shared database, bound to its column family.
pub struct RocksDbKv {
    db: Arc<DB>,
    cf: &'static str,
    sync_writes: bool,
}

impl RocksDbKv {
    fn cf(&self) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(self.cf)
            .ok_or_else(|| StoreError::corruption(format!("missing column family {}", self.cf)))
    }
}

impl KeyValue for RocksDbKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let cf = self.cf()?;
        self.db
            .get_cf(cf, key)
            .map_err(|e| StoreError::io(format!("RocksDB get failed: {e}")))
    }

    fn apply_batch(&mut self, operations: Vec<BatchOp>) -> Result<(), StoreError> {
        let cf = self.cf()?;
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOp::Put { key, value } => batch.put_cf(cf, &key, &value),
                BatchOp::Delete { key } => batch.delete_cf(cf, &key),
            }
        }

        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.sync_writes);

        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| StoreError::io(format!("RocksDB batch write failed: {e}")))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let cf = self.cf()?;
        let mut results = Vec::new();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) =
                item.map_err(|e| StoreError::io(format!("RocksDB scan failed: {e}")))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }
}

/// Opens (or creates) the mirror database and hands out one backing per
/// derived store.
pub fn open_backings(config: &RocksDbConfig) -> Result<MirrorBackings<RocksDbKv>, StoreError> {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);

    opts.set_write_buffer_size(config.write_buffer_size);
    opts.set_max_write_buffer_number(config.max_write_buffer_number);
    opts.set_target_file_size_base(config.target_file_size_base);
    opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

    let mut block_opts = rocksdb::BlockBasedOptions::default();
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
    opts.set_block_based_table_factory(&block_opts);

    let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
        .iter()
        .map(|name| {
            let mut cf_opts = Options::default();
            cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
            ColumnFamilyDescriptor::new(*name, cf_opts)
        })
        .collect();

    let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
        .map_err(|e| StoreError::io(format!("Failed to open RocksDB: {e}")))?;
    let db = Arc::new(db);

    let backing = |cf: &'static str| RocksDbKv {
        db: Arc::clone(&db),
        cf,
        sync_writes: config.sync_writes,
    };

    Ok(MirrorBackings {
        account_log: backing(CF_ACCOUNT_LOG),
        balances: backing(CF_BALANCES),
        replication: backing(CF_REPLICATION),
        statistics: backing(CF_STATISTICS),
        content: backing(CF_CONTENT),
        chain_state: backing(CF_CHAIN_STATE),
    })
}
