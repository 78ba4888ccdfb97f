//! # History Query Errors

use mn_01_staged_store::StoreError;
use shared_types::AddressError;
use thiserror::Error;

/// Failure answering one history query. Surfaced to the caller as a
/// structured response, never fatal.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The queried account is not a valid address.
    #[error("Invalid account address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The underlying log store refused a read.
    #[error(transparent)]
    Store(#[from] StoreError),
}
