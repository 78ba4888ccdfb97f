//! # Account Log (Subsystem 02)
//!
//! Per-account derived logs: every transaction an account took part in and
//! every reward it was paid, each paired with a block range index mapping
//! `block number -> (first offset, count)` into the log. The index is what
//! makes block-ranged history reads cheap; the logs are what make them
//! complete.
//!
//! Appends for one block are consecutive, so the index keeps a single
//! range per block and extends it row by row. Reverts run the exact
//! inverse: pop the row, shrink the range. Log and index share one store
//! and therefore one commit.

pub mod append_log;
pub mod keys;
pub mod range_index;
pub mod store;

mod codec;

pub use append_log::AppendLog;
pub use keys::LogKind;
pub use range_index::{BlockRangeIndex, RangeEntry};
pub use store::{AccountLogStore, TransactionRow};
