//! # Store Errors
//!
//! Failure modes of store backends and the staging overlay. These are the
//! recoverable kind: a consuming cycle aborts, discards its writes and
//! retries later. Violations of derived-state consistency are not errors
//! and are asserted fatally at the site that detects them.

use thiserror::Error;

/// Errors surfaced by store backends and the staging overlay.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O failure in the backing store.
    #[error("Store I/O error: {message}")]
    Io { message: String },

    /// A stored value failed to decode.
    #[error("Store corruption: {message}")]
    Corruption { message: String },
}

impl StoreError {
    /// Wraps a backend failure message.
    pub fn io(message: impl Into<String>) -> Self {
        StoreError::Io {
            message: message.into(),
        }
    }

    /// Wraps a decode failure message.
    pub fn corruption(message: impl Into<String>) -> Self {
        StoreError::Corruption {
            message: message.into(),
        }
    }
}
