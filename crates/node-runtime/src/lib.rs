//! # Node Runtime Library
//!
//! Wiring for the mirror node binary, exposed as a library so the
//! integration tests can assemble the same stack over temporary
//! directories.
//!
//! - `config` - node configuration with `MN_*` environment overrides
//! - `telemetry` - tracing subscriber setup
//! - `adapters` - RocksDB backing, daemon transport, data dir lock
//! - `queries` - JSON read surface for whatever front end gets bolted on

pub mod adapters;
pub mod config;
pub mod queries;
pub mod telemetry;

pub use config::{ConfigError, NodeConfig, Profile};
pub use queries::{QueryError, QueryHandler};

use std::path::Path;

use anyhow::Context;
use mn_01_staged_store::StoreError;
use mn_05_sync_engine::{MirrorStores, SyncEngine};

use crate::adapters::{DataDirLock, RocksDbConfig, RocksDbKv, TcpDaemonClient};

/// A wired mirror node: the engine plus the lock guarding its data
/// directory. Dropping the node releases the lock.
pub struct Node {
    pub engine: SyncEngine<RocksDbKv, TcpDaemonClient>,
    _lock: DataDirLock,
}

impl Node {
    /// The node's read surface over its current committed view.
    pub fn queries(&self) -> QueryHandler<'_, RocksDbKv> {
        QueryHandler::new(self.engine.stores(), self.engine.config().statistics_window)
    }
}

/// Opens the mirror database under `data_dir` and every derived store
/// over it, with production tuning.
pub fn open_stores(data_dir: &Path) -> Result<MirrorStores<RocksDbKv>, StoreError> {
    let config = RocksDbConfig {
        path: data_dir.join("rocksdb").to_string_lossy().into_owned(),
        ..RocksDbConfig::default()
    };
    let backings = adapters::open_backings(&config)?;
    MirrorStores::open(backings)
}

/// Builds a ready-to-run node from its configuration.
///
/// Takes the data directory lock first, so a second mirror pointed at the
/// same directory fails before touching the database.
pub fn build_node(config: &NodeConfig) -> anyhow::Result<Node> {
    config.validate()?;

    let lock =
        DataDirLock::acquire(&config.node.data_dir).context("locking the data directory")?;
    let stores = open_stores(&config.node.data_dir).context("opening the mirror stores")?;
    let client = TcpDaemonClient::new(config.node.daemon_addr.clone());

    Ok(Node {
        engine: SyncEngine::new(config.sync_config(), client, stores),
        _lock: lock,
    })
}
