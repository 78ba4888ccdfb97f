//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Rejection of an externally supplied account address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Empty addresses are reserved for the internal "no party" marker.
    #[error("Address is empty")]
    Empty,

    /// Longer than the accepted limit.
    #[error("Address too long: {len} characters, limit 64")]
    TooLong { len: usize },

    /// Character outside `[A-Za-z0-9._-]`.
    #[error("Address contains invalid character {character:?}")]
    InvalidCharacter { character: char },
}
