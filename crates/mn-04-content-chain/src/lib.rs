//! # Content Chain (Subsystem 04)
//!
//! The channel content version-chain state machine. Each `(channel,
//! content id)` pair carries an ordered chain of versions; a version is a
//! set of unit revisions keyed by uri and is either a pending edit set or
//! the approved one, and at most one version per chain is approved.
//!
//! [`chain`] holds the pure operations: add/remove a unit revision,
//! promote a set of uris into a new approved version, demote it again.
//! Promote and demote are exact inverses, as are add and remove, so a
//! reverted branch leaves no trace. [`projection`] persists the chains,
//! one document row per channel.

pub mod chain;
pub mod projection;

mod codec;

pub use chain::{
    add_unit, approved_count, demote, promote, remove_unit, ContentVersion, ContentVersionChain,
    UnitMap,
};
pub use projection::{ChannelContentProjection, ChannelContents};
