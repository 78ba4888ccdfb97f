//! # Shared Types Crate
//!
//! This crate contains the ledger data model shared by every mirror-node
//! subsystem: the action-log entry format the daemon emits, the coin
//! arithmetic used by balances and fees, and the address rules applied to
//! query inputs.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Closed action set**: `LedgerAction` and `ActionRecord` are matched
//!   exhaustively at every dispatch site; a newly added kind fails
//!   compilation wherever it is not yet handled.
//! - **Checked arithmetic**: `Coin` operations never wrap; impossible
//!   states surface at the call site that can decide what they mean.

pub mod coin;
pub mod entities;
pub mod errors;

pub use coin::Coin;
pub use entities::*;
pub use errors::*;
