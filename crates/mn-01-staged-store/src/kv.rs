//! # Key-Value Backing Port
//!
//! The storage plane every mirror store is built on. A backend only needs
//! point reads, one atomic batch write and an ordered prefix scan; the
//! staging contract in [`crate::staged`] is layered on top and is the sole
//! writer, so the port carries no direct `put`/`delete`.

use crate::errors::StoreError;

/// Abstract interface for key-value database operations.
///
/// Production: `RocksDbKv` in node-runtime, one column family per store.
/// Testing: [`InMemoryKv`] below.
pub trait KeyValue: Send {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or none.
    fn apply_batch(&mut self, operations: Vec<BatchOp>) -> Result<(), StoreError>;

    /// All pairs whose key starts with `prefix`, ascending by key.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOp {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Delete { key: key.into() }
    }
}

/// In-memory key-value store for unit tests and light deployments.
///
/// Backed by a `BTreeMap` so `scan_prefix` returns ascending key order,
/// the same order a RocksDB iterator produces.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKv {
    data: std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValue for InMemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn apply_batch(&mut self, operations: Vec<BatchOp>) -> Result<(), StoreError> {
        for op in operations {
            match op {
                BatchOp::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let results: Vec<_> = self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}
