//! # Sync Errors
//!
//! The recoverable failures of a sync cycle. A cycle that fails here is
//! discarded and retried on the next tick; nothing in this module covers
//! consistency violations, which panic at the projection that detected
//! them.

use mn_01_staged_store::StoreError;
use shared_types::AddressError;
use thiserror::Error;

/// Failure talking to the ledger daemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection dropped before a response arrived.
    #[error("Connection to the daemon lost: {0}")]
    Disconnected(String),

    /// The response could not be decoded.
    #[error("Malformed daemon response: {0}")]
    Malformed(String),

    /// The response decoded but violates the protocol contract.
    #[error("Unexpected daemon response: {0}")]
    Unexpected(String),
}

/// Failure of one sync or rebalance cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The daemon request failed; retry on the next tick.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A store refused to read, stage or commit.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A caller named an account that is not a valid address.
    #[error("Invalid account address: {0}")]
    Address(#[from] AddressError),
}
