//! # Integration Flows
//!
//! End-to-end tests that drive the sync engine the way the runtime does:
//! scripted daemon logs in, committed projections out. Each module covers
//! one flow; all of them run over in-memory backings except `persistence`,
//! which exercises the RocksDB adapter under a temporary directory.

pub mod history_feed;
pub mod import_flow;
pub mod persistence;
pub mod rebalance_flow;
pub mod sync_cycles;
