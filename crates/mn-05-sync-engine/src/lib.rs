//! # Sync Engine (Subsystem 05)
//!
//! The consumer side of the mirror. One engine owns one daemon connection
//! and the full store set, and does three things with them:
//!
//! - [`engine`]: sync cycles. Page the action log from the committed
//!   cursor, dispatch every entry into the staged stores, commit once when
//!   the log is drained. A failed cycle is discarded whole.
//! - [`engine`]: account imports. Re-scan the absorbed log prefix to
//!   backfill one new account's logs, without moving the cursor, the
//!   watermarks or any shared projection.
//! - [`rebalance`]: storage planning. Read the mirrored view window and
//!   replica counts, broadcast store/remove updates back to the daemon.
//!
//! Crash safety rests on two rules kept in [`stores`]: every store commits
//! atomically with its own watermark, and the store holding the cursor
//! commits last. Replay after a crash re-fetches from the cursor and the
//! per-store watermarks in [`dispatch`] skip whatever already landed.

pub mod chain_state;
pub mod config;
pub mod engine;
pub mod errors;
pub mod pagination;
pub mod ports;
pub mod rebalance;
pub mod stores;

mod dispatch;

pub use chain_state::{BlockInfo, ChainStateStore};
pub use config::{SyncConfig, ACCOUNT_PAGE_SIZE, STORAGE_MANAGER_PAGE_SIZE};
pub use engine::{CycleReport, ImportReport, SyncEngine, SyncPhase};
pub use errors::{SyncError, TransportError};
pub use ports::{
    ActionLogClient, BroadcastOutcome, FailureEnvelope, LogFetchRequest, LogPage, MockDaemon,
    StorageUpdateCommand, UpdateBroadcaster,
};
pub use rebalance::{plan_rebalance, RebalanceConfig, RebalanceReport};
pub use stores::{MirrorBackings, MirrorStores, UnitOfWork};
