//! # History Query (Subsystem 06)
//!
//! Chronological activity feeds for one account, merged from its two
//! derived logs:
//!
//! - [`partition`]: splits a requested block range into disjoint
//!   sub-ranges labeled by which log covers them, so the merge walks each
//!   block once and opens only the logs that can hold rows there.
//! - [`feed`]: derives feed items from a log row and the account's role
//!   in it (received, sent, sponsored, the two fee sides, rewarded).
//! - [`query`]: the engine tying both to an [`AccountLogStore`].
//!
//! Everything here is read-only; the sync engine owns all writes.
//!
//! [`AccountLogStore`]: mn_02_account_log::AccountLogStore

pub mod errors;
pub mod feed;
pub mod partition;
pub mod query;

pub use errors::HistoryError;
pub use feed::{FeedItem, FeedKind};
pub use partition::{partition_block_ranges, FeedSource, SubRange};
pub use query::HistoryQueryEngine;
