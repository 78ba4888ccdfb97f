//! # Adapter Implementations
//!
//! Concrete implementations of the sync engine's outbound ports plus the
//! process-level resources the runtime owns:
//!
//! - [`rocksdb_kv`] - the `KeyValue` backing over RocksDB column families
//! - [`daemon_client`] - `ActionLogClient` and `UpdateBroadcaster` over TCP
//! - [`replay`] - `ActionLogClient` over a captured log file
//! - [`lock`] - the exclusive data directory lock

pub mod daemon_client;
pub mod lock;
pub mod replay;
pub mod rocksdb_kv;

pub use daemon_client::{DaemonRequest, DaemonResponse, TcpDaemonClient};
pub use lock::{DataDirLock, LockError};
pub use replay::FileReplayClient;
pub use rocksdb_kv::{open_backings, RocksDbConfig, RocksDbKv};
