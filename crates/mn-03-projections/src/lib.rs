//! # Projections (Subsystem 03)
//!
//! Derived views over the action log, one store each:
//!
//! - [`balance`]: account balances from principals, fees and rewards.
//! - [`replication`]: which storage node holds which file, with per-file
//!   replica counters.
//! - [`statistics`]: windowed per-file view counts from service reports.
//!
//! Every apply has an exact inverse, driven purely by the payload of the
//! reverted entry. Consistency violations (a balance below zero, a
//! replication toggle that does not toggle, a revert of something never
//! applied) are not errors to hand back; they mean the mirror has drifted
//! from the daemon and the process stops.

pub mod balance;
pub mod replication;
pub mod statistics;

pub use balance::{BalanceDirection, BalanceProjection};
pub use replication::StorageReplicationProjection;
pub use statistics::{window_start, UsageStatisticsProjection};
