//! # Staged Writes
//!
//! The save / discard / commit contract every mirror store follows. A
//! consuming cycle accumulates writes in memory, `save` stages them as one
//! batch, and `commit` applies the batch atomically to the backing store.
//! `discard` drops everything uncommitted, restoring the last committed
//! view. Uncommitted writes are visible to reads through the owning store
//! and to nobody else.
//!
//! Each store also persists a watermark: the `global_index` of the last
//! log entry whose effects were committed to it, written inside the same
//! atomic batch as the row changes. Stores commit independently, so after
//! a crash the watermarks of different stores may differ by one cycle; the
//! consumer replays from its cursor and skips, per store, entries at or
//! below that store's watermark.

use std::collections::BTreeMap;

use crate::errors::StoreError;
use crate::kv::{BatchOp, KeyValue};

/// Reserved key holding the store watermark.
///
/// Lives in the `meta:` namespace so it never collides with row keys and
/// stays out of row scans.
pub const WATERMARK_KEY: &[u8] = b"meta:watermark";

const META_PREFIX: &[u8] = b"meta:";

/// An uncommitted write: a pending value or a pending deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Put(Vec<u8>),
    Delete,
}

/// Staging overlay over a key-value backing store.
///
/// Reads go overlay first, then the staged batch, then the backing store,
/// so the owning component always sees its own uncommitted writes.
pub struct StagedKv<B: KeyValue> {
    name: &'static str,
    backing: B,
    /// Writes made since the last `save`.
    overlay: BTreeMap<Vec<u8>, Pending>,
    /// Writes saved and awaiting `commit`.
    staged: BTreeMap<Vec<u8>, Pending>,
    /// Last committed watermark.
    watermark: Option<u64>,
    /// Watermark recorded for the next save.
    pending_watermark: Option<u64>,
    /// Watermark staged for the next commit.
    staged_watermark: Option<u64>,
}

impl<B: KeyValue> StagedKv<B> {
    /// Opens the store over `backing`, loading the persisted watermark.
    pub fn open(name: &'static str, backing: B) -> Result<Self, StoreError> {
        let watermark = match backing.get(WATERMARK_KEY)? {
            Some(bytes) => Some(decode_watermark(name, &bytes)?),
            None => None,
        };
        Ok(StagedKv {
            name,
            backing,
            overlay: BTreeMap::new(),
            staged: BTreeMap::new(),
            watermark,
            pending_watermark: None,
            staged_watermark: None,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reads a key, seeing uncommitted writes first.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(pending) = self.overlay.get(key).or_else(|| self.staged.get(key)) {
            return Ok(match pending {
                Pending::Put(value) => Some(value.clone()),
                Pending::Delete => None,
            });
        }
        self.backing.get(key)
    }

    /// Records an uncommitted write.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: Vec<u8>) {
        self.overlay.insert(key.into(), Pending::Put(value));
    }

    /// Records an uncommitted deletion.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.overlay.insert(key.into(), Pending::Delete);
    }

    /// All live pairs under `prefix`, ascending by key, uncommitted writes
    /// merged in.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for (key, value) in self.backing.scan_prefix(prefix)? {
            merged.insert(key, Some(value));
        }
        for layer in [&self.staged, &self.overlay] {
            for (key, pending) in layer.iter().filter(|(k, _)| k.starts_with(prefix)) {
                let value = match pending {
                    Pending::Put(value) => Some(value.clone()),
                    Pending::Delete => None,
                };
                merged.insert(key.clone(), value);
            }
        }
        Ok(merged
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    /// All live rows outside the `meta:` namespace, ascending by key.
    ///
    /// This is the store's derived state as far as equality is concerned;
    /// watermarks and other metadata are excluded.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .scan_prefix(b"")?
            .into_iter()
            .filter(|(key, _)| !key.starts_with(META_PREFIX))
            .collect())
    }

    /// Last committed watermark, `None` before the first commit.
    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    /// Records the watermark to persist with the next save + commit.
    pub fn set_watermark(&mut self, index: u64) {
        self.pending_watermark = Some(index);
    }

    /// Stages everything written since the last save.
    pub fn save(&mut self) {
        let moved = std::mem::take(&mut self.overlay);
        for (key, pending) in moved {
            self.staged.insert(key, pending);
        }
        if let Some(index) = self.pending_watermark.take() {
            self.staged_watermark = Some(index);
        }
    }

    /// Drops all uncommitted writes, restoring the last committed view.
    pub fn discard(&mut self) {
        let dropped = self.overlay.len() + self.staged.len();
        if dropped > 0 {
            tracing::debug!(
                "[mn-01] {}: discarded {} uncommitted write(s)",
                self.name,
                dropped
            );
        }
        self.overlay.clear();
        self.staged.clear();
        self.pending_watermark = None;
        self.staged_watermark = None;
    }

    /// Applies the staged batch atomically to the backing store.
    ///
    /// Only saved writes are committed; the overlay keeps anything written
    /// after the last `save`. On error the staged batch is retained and the
    /// backing store is unchanged.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        let mut ops: Vec<BatchOp> = self
            .staged
            .iter()
            .map(|(key, pending)| match pending {
                Pending::Put(value) => BatchOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                },
                Pending::Delete => BatchOp::Delete { key: key.clone() },
            })
            .collect();
        if let Some(index) = self.staged_watermark {
            ops.push(BatchOp::put(
                WATERMARK_KEY.to_vec(),
                index.to_be_bytes().to_vec(),
            ));
        }
        if ops.is_empty() {
            return Ok(());
        }

        let count = ops.len();
        self.backing.apply_batch(ops)?;
        self.staged.clear();
        if let Some(index) = self.staged_watermark.take() {
            self.watermark = Some(index);
        }
        tracing::debug!("[mn-01] {}: committed {} operation(s)", self.name, count);
        Ok(())
    }

    /// Consumes the store, returning the backing. Lets tests reopen over
    /// the same data to exercise restart paths.
    pub fn into_backing(self) -> B {
        self.backing
    }
}

fn decode_watermark(name: &str, bytes: &[u8]) -> Result<u64, StoreError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StoreError::corruption(format!(
            "{}: watermark has {} bytes, expected 8",
            name,
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Object-safe staging surface.
///
/// Lets the consumer drive stores with different backing types through one
/// slice when saving, committing and discarding a cycle.
pub trait Staged {
    /// Store name used in logs.
    fn name(&self) -> &'static str;
    /// Stage everything written since the last save.
    fn save(&mut self);
    /// Drop all uncommitted writes.
    fn discard(&mut self);
    /// Apply the staged batch atomically to the backing store.
    fn commit(&mut self) -> Result<(), StoreError>;
    /// Last committed watermark.
    fn watermark(&self) -> Option<u64>;
    /// Record the watermark to persist with the next save + commit.
    fn set_watermark(&mut self, index: u64);
}

impl<B: KeyValue> Staged for StagedKv<B> {
    fn name(&self) -> &'static str {
        StagedKv::name(self)
    }

    fn save(&mut self) {
        StagedKv::save(self)
    }

    fn discard(&mut self) {
        StagedKv::discard(self)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        StagedKv::commit(self)
    }

    fn watermark(&self) -> Option<u64> {
        StagedKv::watermark(self)
    }

    fn set_watermark(&mut self, index: u64) {
        StagedKv::set_watermark(self, index)
    }
}

/// Stages every store in slice order.
pub fn save_all(stores: &mut [&mut dyn Staged]) {
    for store in stores.iter_mut() {
        store.save();
    }
}

/// Commits every store in slice order.
///
/// The caller fixes the order; the sync engine commits the store holding
/// its cursor last, so a crash between two commits can only leave the
/// cursor behind the data, never ahead of it. Stops at the first error;
/// stores after the failing one keep their staged batches.
pub fn commit_all(stores: &mut [&mut dyn Staged]) -> Result<(), StoreError> {
    for store in stores.iter_mut() {
        store.commit()?;
    }
    Ok(())
}

/// Discards uncommitted writes in every store.
pub fn discard_all(stores: &mut [&mut dyn Staged]) {
    for store in stores.iter_mut() {
        store.discard();
    }
}
