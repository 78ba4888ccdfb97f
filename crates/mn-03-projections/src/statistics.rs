//! # Usage Statistics Projection
//!
//! Per-block view counters reported by service nodes, one document per
//! block holding `file uri -> views`. The projection answers "how often
//! was this file viewed over the last N blocks", which is what the
//! replication planner weighs files by.
//!
//! Applying a report adds counts; reverting subtracts them exactly, and
//! entries that reach zero vanish so the pre-report rows come back
//! byte-for-byte. A retention sweep drops whole blocks once they fall out
//! of the window; the daemon finalizes far inside it, so reverts never
//! target a swept block.

use std::collections::BTreeMap;

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use shared_types::LoggingType;

/// Windowed per-file view counts.
pub struct UsageStatisticsProjection<B: KeyValue> {
    kv: StagedKv<B>,
}

const BLOCK_PREFIX: &[u8] = b"sta:";

fn block_key(block_number: u64) -> Vec<u8> {
    let mut key = BLOCK_PREFIX.to_vec();
    key.extend_from_slice(&block_number.to_be_bytes());
    key
}

fn block_of_key(key: &[u8]) -> Option<u64> {
    let suffix: [u8; 8] = key.get(BLOCK_PREFIX.len()..)?.try_into().ok()?;
    Some(u64::from_be_bytes(suffix))
}

/// First block inside the window ending at `head_block`.
pub fn window_start(head_block: u64, window: u64) -> u64 {
    head_block.saturating_sub(window.saturating_sub(1))
}

impl<B: KeyValue> UsageStatisticsProjection<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(UsageStatisticsProjection {
            kv: StagedKv::open("statistics", backing)?,
        })
    }

    /// Consumes one statistics report, forward or reverted.
    ///
    /// Zero counts are skipped in both directions. Reverting a report the
    /// block never absorbed is a broken mirror and stops the process.
    pub fn record(
        &mut self,
        block_number: u64,
        views: &[(String, u64)],
        logging_type: LoggingType,
    ) -> Result<(), StoreError> {
        let mut counters = self.block_views(block_number)?;
        match logging_type {
            LoggingType::Apply => {
                for (uri, count) in views {
                    if *count == 0 {
                        continue;
                    }
                    *counters.entry(uri.clone()).or_insert(0) += count;
                }
            }
            LoggingType::Revert => {
                for (uri, count) in views {
                    if *count == 0 {
                        continue;
                    }
                    let remaining = counters
                        .get(uri)
                        .and_then(|current| current.checked_sub(*count));
                    match remaining {
                        Some(0) => {
                            counters.remove(uri);
                        }
                        Some(remaining) => {
                            counters.insert(uri.clone(), remaining);
                        }
                        None => {
                            tracing::error!(
                                "[mn-03] statistics desync at block {}: reverting {} view(s) of {} never recorded",
                                block_number,
                                count,
                                uri
                            );
                            panic!("statistics desync at block {}", block_number);
                        }
                    }
                }
            }
        }

        let key = block_key(block_number);
        if counters.is_empty() {
            self.kv.delete(key);
        } else {
            self.kv.put(
                key,
                bincode::serialize(&counters)
                    .map_err(|e| StoreError::corruption(format!("encoding statistics: {}", e)))?,
            );
        }
        Ok(())
    }

    /// View counters of one block; empty when nothing was reported.
    pub fn block_views(&self, block_number: u64) -> Result<BTreeMap<String, u64>, StoreError> {
        match self.kv.get(&block_key(block_number))? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| StoreError::corruption(format!("decoding statistics: {}", e))),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Total views of `file_uri` over the window ending at `head_block`.
    pub fn views_in_window(
        &self,
        file_uri: &str,
        head_block: u64,
        window: u64,
    ) -> Result<u64, StoreError> {
        let start = window_start(head_block, window);
        let mut total = 0u64;
        for (key, value) in self.kv.scan_prefix(BLOCK_PREFIX)? {
            let block = match block_of_key(&key) {
                Some(block) => block,
                None => continue,
            };
            if block < start || block > head_block {
                continue;
            }
            let counters: BTreeMap<String, u64> = bincode::deserialize(&value)
                .map_err(|e| StoreError::corruption(format!("decoding statistics: {}", e)))?;
            total += counters.get(file_uri).copied().unwrap_or(0);
        }
        Ok(total)
    }

    /// Every file with at least one view in the window, with its total.
    pub fn window_totals(
        &self,
        head_block: u64,
        window: u64,
    ) -> Result<BTreeMap<String, u64>, StoreError> {
        let start = window_start(head_block, window);
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for (key, value) in self.kv.scan_prefix(BLOCK_PREFIX)? {
            let block = match block_of_key(&key) {
                Some(block) => block,
                None => continue,
            };
            if block < start || block > head_block {
                continue;
            }
            let counters: BTreeMap<String, u64> = bincode::deserialize(&value)
                .map_err(|e| StoreError::corruption(format!("decoding statistics: {}", e)))?;
            for (uri, count) in counters {
                *totals.entry(uri).or_insert(0) += count;
            }
        }
        Ok(totals)
    }

    /// Drops block documents that fell out of the window ending at
    /// `head_block`. Returns how many blocks were swept.
    pub fn prune_outside_window(
        &mut self,
        head_block: u64,
        window: u64,
    ) -> Result<usize, StoreError> {
        let start = window_start(head_block, window);
        let mut swept = 0;
        for (key, _) in self.kv.scan_prefix(BLOCK_PREFIX)? {
            match block_of_key(&key) {
                Some(block) if block < start => {
                    self.kv.delete(key);
                    swept += 1;
                }
                _ => {}
            }
        }
        if swept > 0 {
            tracing::debug!(
                "[mn-03] statistics: swept {} block(s) below {}",
                swept,
                start
            );
        }
        Ok(swept)
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }
}

impl<B: KeyValue> Staged for UsageStatisticsProjection<B> {
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
