//! # Staged Store (Subsystem 01)
//!
//! The persisted-store contract shared by every mirror store. Two layers:
//!
//! - [`kv`]: the key-value backing port (`KeyValue`, `BatchOp`) with an
//!   in-memory adapter; production backs it with RocksDB column families.
//! - [`staged`]: the save / discard / commit staging overlay, the
//!   object-safe [`staged::Staged`] surface the consumer drives a whole
//!   cycle through, and the per-store watermark that makes replay after a
//!   crash idempotent.
//!
//! Stores are physically separate: one commit is atomic within a store and
//! never across stores. Cross-store consistency is the consumer's job,
//! built on commit ordering and watermark replay.

pub mod errors;
pub mod kv;
pub mod staged;

pub use errors::StoreError;
pub use kv::{BatchOp, InMemoryKv, KeyValue};
pub use staged::{commit_all, discard_all, save_all, Staged, StagedKv, WATERMARK_KEY};
