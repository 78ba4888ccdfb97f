//! # Storage Replication Projection
//!
//! Which storage node holds which file, derived from `StorageUpdate`
//! actions. The stored flag for a `(storage, file)` pair is
//! `(status == Store) XOR (entry is a revert)`: reverting a Store means
//! not stored, reverting a Remove means stored again.
//!
//! Flag rows are never pruned. A pair's first sighting creates its row;
//! every later sighting must flip the flag. Two sightings computing the
//! same flag would mean the daemon logged a no-op update or the mirror
//! lost one, and either way the derived state can no longer be trusted,
//! so the process stops.
//!
//! A per-file replica counter row is maintained alongside the flags so
//! `replica_count` is a point read instead of a scan over every pair.

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use shared_types::{LoggingType, StorageStatus};

/// Replication flags per `(storage, file)` pair plus per-file counters.
pub struct StorageReplicationProjection<B: KeyValue> {
    kv: StagedKv<B>,
}

// Storage addresses never contain ':', so the first ':' after the prefix
// terminates the address and the rest of the key is the file uri, which
// may contain anything.
fn flag_key(storage_address: &str, file_uri: &str) -> Vec<u8> {
    let mut key = format!("rep:{}:", storage_address).into_bytes();
    key.extend_from_slice(file_uri.as_bytes());
    key
}

fn flag_prefix(storage_address: &str) -> Vec<u8> {
    format!("rep:{}:", storage_address).into_bytes()
}

fn count_key(file_uri: &str) -> Vec<u8> {
    let mut key = b"cnt:".to_vec();
    key.extend_from_slice(file_uri.as_bytes());
    key
}

impl<B: KeyValue> StorageReplicationProjection<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(StorageReplicationProjection {
            kv: StagedKv::open("replication", backing)?,
        })
    }

    /// Consumes one storage update, forward or reverted.
    pub fn update(
        &mut self,
        storage_address: &str,
        file_uri: &str,
        status: StorageStatus,
        logging_type: LoggingType,
    ) -> Result<(), StoreError> {
        let stored = (status == StorageStatus::Store) != (logging_type == LoggingType::Revert);

        let key = flag_key(storage_address, file_uri);
        match self.kv.get(&key)? {
            None => {
                self.kv.put(key, vec![stored as u8]);
            }
            Some(bytes) => {
                let previous = decode_flag(&bytes)?;
                if previous == stored {
                    tracing::error!(
                        "[mn-03] replication desync for {} / {}: repeated stored={} sighting",
                        storage_address,
                        file_uri,
                        stored
                    );
                    panic!(
                        "replication desync for {} / {}",
                        storage_address, file_uri
                    );
                }
                self.kv.put(key, vec![stored as u8]);
            }
        }

        let count = self.replica_count(file_uri)?;
        let updated = if stored {
            count + 1
        } else {
            match count.checked_sub(1) {
                Some(updated) => updated,
                None => {
                    tracing::error!(
                        "[mn-03] replication desync for {}: replica count below zero",
                        file_uri
                    );
                    panic!("replication desync for file {}", file_uri);
                }
            }
        };
        self.kv
            .put(count_key(file_uri), updated.to_be_bytes().to_vec());
        Ok(())
    }

    /// Whether `storage_address` currently stores `file_uri`.
    pub fn is_stored(&self, storage_address: &str, file_uri: &str) -> Result<bool, StoreError> {
        match self.kv.get(&flag_key(storage_address, file_uri))? {
            Some(bytes) => decode_flag(&bytes),
            None => Ok(false),
        }
    }

    /// How many storage nodes currently store `file_uri`.
    pub fn replica_count(&self, file_uri: &str) -> Result<u64, StoreError> {
        match self.kv.get(&count_key(file_uri))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::corruption(format!(
                        "replica count of {} has {} bytes, expected 8",
                        file_uri,
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Files currently stored by `storage_address`, ascending by uri.
    pub fn stored_uris(&self, storage_address: &str) -> Result<Vec<String>, StoreError> {
        let prefix = flag_prefix(storage_address);
        let mut uris = Vec::new();
        for (key, value) in self.kv.scan_prefix(&prefix)? {
            if !decode_flag(&value)? {
                continue;
            }
            let uri = String::from_utf8(key[prefix.len()..].to_vec()).map_err(|_| {
                StoreError::corruption(format!(
                    "replication key of {} holds a non-utf8 uri",
                    storage_address
                ))
            })?;
            uris.push(uri);
        }
        Ok(uris)
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }
}

fn decode_flag(bytes: &[u8]) -> Result<bool, StoreError> {
    match bytes {
        [0] => Ok(false),
        [1] => Ok(true),
        other => Err(StoreError::corruption(format!(
            "replication flag has invalid encoding {:?}",
            other
        ))),
    }
}

impl<B: KeyValue> Staged for StorageReplicationProjection<B> {
    fn name(&self) -> &'static str {
        self.kv.name()
    }

    fn save(&mut self) {
        self.kv.save()
    }

    fn discard(&mut self) {
        self.kv.discard()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.kv.commit()
    }

    fn watermark(&self) -> Option<u64> {
        self.kv.watermark()
    }

    fn set_watermark(&mut self, index: u64) {
        self.kv.set_watermark(index)
    }
}
