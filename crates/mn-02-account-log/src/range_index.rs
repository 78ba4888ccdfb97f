//! # Block Range Index
//!
//! Maps `block number -> (first offset, count)` inside one per-account
//! append log. Appends within a block always land on consecutive offsets,
//! so one entry per block is enough; the index extends an existing entry
//! instead of inserting a second one, which keeps it amortized O(1) in the
//! number of rows per block.
//!
//! Ranges of one account log tile the log disjointly. A stored range whose
//! end does not meet the incoming offset means the derived state and the
//! log have drifted apart; that is not an I/O failure, it is a broken
//! mirror, and the process stops rather than compound it.

use mn_01_staged_store::{KeyValue, StagedKv, StoreError};
use serde::{Deserialize, Serialize};

use crate::codec::{decode, encode};
use crate::keys::{self, LogKind};

/// One indexed block: where its rows start in the log and how many there are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    /// Offset of the block's first row in the append log.
    pub offset: u64,
    /// Number of consecutive rows belonging to the block.
    pub count: u64,
}

impl RangeEntry {
    /// Offset one past the block's last row.
    pub fn end(&self) -> u64 {
        self.offset + self.count
    }
}

/// Range index over one log kind of the account-log store.
#[derive(Debug, Clone, Copy)]
pub struct BlockRangeIndex {
    kind: LogKind,
}

impl BlockRangeIndex {
    pub fn new(kind: LogKind) -> Self {
        BlockRangeIndex { kind }
    }

    /// Indexes one appended row at `next_offset`.
    ///
    /// Returns `true` when the block was seen for the first time, `false`
    /// when an existing range was extended by one.
    pub fn insert<B: KeyValue>(
        &self,
        kv: &mut StagedKv<B>,
        account: &str,
        block_number: u64,
        next_offset: u64,
    ) -> Result<bool, StoreError> {
        let key = keys::index_key(self.kind, account, block_number);
        let fresh = match self.read(kv, &key)? {
            None => {
                let entry = RangeEntry {
                    offset: next_offset,
                    count: 1,
                };
                kv.put(key, encode("range entry", &entry)?);
                true
            }
            Some(stored) => {
                if stored.end() != next_offset {
                    tracing::error!(
                        "[mn-02] range desync for {}/{:?} block {}: stored end {} != incoming offset {}",
                        account,
                        self.kind,
                        block_number,
                        stored.end(),
                        next_offset
                    );
                    panic!(
                        "range desync: block {} of account {}",
                        block_number, account
                    );
                }
                let entry = RangeEntry {
                    offset: stored.offset,
                    count: stored.count + 1,
                };
                kv.put(key, encode("range entry", &entry)?);
                false
            }
        };
        Ok(fresh)
    }

    /// Unindexes the row that `insert` placed at `expected_next_offset - 1`,
    /// the exact inverse of the most recent insert for this block.
    pub fn remove_one<B: KeyValue>(
        &self,
        kv: &mut StagedKv<B>,
        account: &str,
        block_number: u64,
        expected_next_offset: u64,
    ) -> Result<(), StoreError> {
        let key = keys::index_key(self.kind, account, block_number);
        let stored = match self.read(kv, &key)? {
            Some(stored) => stored,
            None => {
                tracing::error!(
                    "[mn-02] range desync for {}/{:?}: removing from unindexed block {}",
                    account,
                    self.kind,
                    block_number
                );
                panic!(
                    "range desync: block {} of account {} not indexed",
                    block_number, account
                );
            }
        };
        if stored.end() != expected_next_offset {
            tracing::error!(
                "[mn-02] range desync for {}/{:?} block {}: stored end {} != expected {}",
                account,
                self.kind,
                block_number,
                stored.end(),
                expected_next_offset
            );
            panic!(
                "range desync: block {} of account {}",
                block_number, account
            );
        }
        if stored.count == 1 {
            kv.delete(key);
        } else {
            let entry = RangeEntry {
                offset: stored.offset,
                count: stored.count - 1,
            };
            kv.put(key, encode("range entry", &entry)?);
        }
        Ok(())
    }

    /// The indexed range of one block, if any rows landed in it.
    pub fn lookup<B: KeyValue>(
        &self,
        kv: &StagedKv<B>,
        account: &str,
        block_number: u64,
    ) -> Result<Option<RangeEntry>, StoreError> {
        let key = keys::index_key(self.kind, account, block_number);
        self.read(kv, &key)
    }

    /// Lowest and highest indexed block inside `range`, scanning the
    /// account's index rows in ascending block order.
    pub fn block_span<B: KeyValue>(
        &self,
        kv: &StagedKv<B>,
        account: &str,
        range: std::ops::Range<u64>,
    ) -> Result<Option<(u64, u64)>, StoreError> {
        let prefix = keys::index_prefix(self.kind, account);
        let mut span: Option<(u64, u64)> = None;
        for (key, _) in kv.scan_prefix(&prefix)? {
            let block = match keys::block_of_index_key(&key) {
                Some(block) => block,
                None => continue,
            };
            if !range.contains(&block) {
                continue;
            }
            span = Some(match span {
                None => (block, block),
                Some((lo, _)) => (lo, block),
            });
        }
        Ok(span)
    }

    fn read<B: KeyValue>(
        &self,
        kv: &StagedKv<B>,
        key: &[u8],
    ) -> Result<Option<RangeEntry>, StoreError> {
        match kv.get(key)? {
            Some(bytes) => Ok(Some(decode("range entry", &bytes)?)),
            None => Ok(None),
        }
    }
}
