//! # Per-Account Append Log
//!
//! A dense, offset-addressed log per account. `append` writes at offset
//! `len` and bumps the length; `pop` is its exact inverse, removing the
//! last row and shrinking the length. Rows are never edited in place and
//! never removed from the middle.

use mn_01_staged_store::{KeyValue, StagedKv, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{decode, encode};
use crate::keys::{self, LogKind};

/// Append log over one log kind of the account-log store.
#[derive(Debug, Clone, Copy)]
pub struct AppendLog {
    kind: LogKind,
}

impl AppendLog {
    pub fn new(kind: LogKind) -> Self {
        AppendLog { kind }
    }

    /// Number of rows in the account's log.
    pub fn len<B: KeyValue>(&self, kv: &StagedKv<B>, account: &str) -> Result<u64, StoreError> {
        match kv.get(&keys::len_key(self.kind, account))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::corruption(format!(
                        "log length of {} has {} bytes, expected 8",
                        account,
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Appends a row, returning the offset it was written at.
    pub fn append<B: KeyValue, T: Serialize>(
        &self,
        kv: &mut StagedKv<B>,
        account: &str,
        row: &T,
    ) -> Result<u64, StoreError> {
        let offset = self.len(kv, account)?;
        kv.put(keys::entry_key(self.kind, account, offset), encode("log row", row)?);
        kv.put(
            keys::len_key(self.kind, account),
            (offset + 1).to_be_bytes().to_vec(),
        );
        Ok(offset)
    }

    /// Removes and returns the last row, the exact inverse of `append`.
    ///
    /// Popping an empty log means a revert arrived for a row that was never
    /// appended; the mirror is broken and the process stops.
    pub fn pop<B: KeyValue, T: DeserializeOwned>(
        &self,
        kv: &mut StagedKv<B>,
        account: &str,
    ) -> Result<T, StoreError> {
        let len = self.len(kv, account)?;
        if len == 0 {
            tracing::error!(
                "[mn-02] log desync for {}/{:?}: pop on empty log",
                account,
                self.kind
            );
            panic!("log desync: pop on empty log of account {}", account);
        }
        let offset = len - 1;
        let key = keys::entry_key(self.kind, account, offset);
        let bytes = kv.get(&key)?.ok_or_else(|| {
            StoreError::corruption(format!(
                "log row {} of {} is missing below the recorded length",
                offset, account
            ))
        })?;
        let row = decode("log row", &bytes)?;
        kv.delete(key);
        if offset == 0 {
            // A fully drained log leaves no trace, matching a never-written one.
            kv.delete(keys::len_key(self.kind, account));
        } else {
            kv.put(
                keys::len_key(self.kind, account),
                offset.to_be_bytes().to_vec(),
            );
        }
        Ok(row)
    }

    /// Reads the row at `offset`, if present.
    pub fn get<B: KeyValue, T: DeserializeOwned>(
        &self,
        kv: &StagedKv<B>,
        account: &str,
        offset: u64,
    ) -> Result<Option<T>, StoreError> {
        match kv.get(&keys::entry_key(self.kind, account, offset))? {
            Some(bytes) => Ok(Some(decode("log row", &bytes)?)),
            None => Ok(None),
        }
    }
}
