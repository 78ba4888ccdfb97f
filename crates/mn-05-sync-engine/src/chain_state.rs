//! # Chain State Store
//!
//! The consumer's own bookkeeping: the log cursor, the list of currently
//! applied blocks, and the registry of tracked accounts. Lives in a store
//! of its own and commits LAST in every cycle, so a crash between two
//! commits can leave the cursor behind the derived data but never ahead
//! of it.
//!
//! The block list mirrors the daemon's current chain: applying a block
//! pushes one row, reverting pops it. Reverts arrive tip-first, so a pop
//! that does not meet its own block number means the mirror and the
//! daemon disagree about chain order, which is fatal.

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Bookkeeping row for one applied block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Height of the block in the daemon's chain.
    pub block_number: u64,
    /// Authority that produced it.
    pub authority: Address,
    /// Transactions the block carried.
    pub transactions: u64,
    /// Rewards it paid.
    pub rewards: u64,
}

const CURSOR_KEY: &[u8] = b"cur:next";
const BLOCK_COUNT_KEY: &[u8] = b"blk:len";
const BLOCK_PREFIX: &[u8] = b"blk:info:";
const ACCOUNT_PREFIX: &[u8] = b"acc:";

fn block_key(position: u64) -> Vec<u8> {
    let mut key = BLOCK_PREFIX.to_vec();
    key.extend_from_slice(&position.to_be_bytes());
    key
}

fn account_key(address: &str) -> Vec<u8> {
    let mut key = ACCOUNT_PREFIX.to_vec();
    key.extend_from_slice(address.as_bytes());
    key
}

/// Cursor, applied-block list and tracked-account registry.
pub struct ChainStateStore<B: KeyValue> {
    kv: StagedKv<B>,
}

impl<B: KeyValue> ChainStateStore<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(ChainStateStore {
            kv: StagedKv::open("chain-state", backing)?,
        })
    }

    /// Next global index to request from the daemon. Zero before the
    /// first committed cycle.
    pub fn next_index(&self) -> Result<u64, StoreError> {
        Ok(self.read_u64(CURSOR_KEY, "cursor")?.unwrap_or(0))
    }

    /// Moves the cursor; persisted with the enclosing cycle's commit.
    pub fn set_next_index(&mut self, index: u64) {
        self.kv.put(CURSOR_KEY.to_vec(), index.to_be_bytes().to_vec());
    }

    /// Number of blocks currently applied.
    pub fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.read_u64(BLOCK_COUNT_KEY, "block count")?.unwrap_or(0))
    }

    /// Appends one applied block's bookkeeping.
    pub fn push_block(&mut self, info: BlockInfo) -> Result<(), StoreError> {
        let count = self.block_count()?;
        let bytes = bincode::serialize(&info)
            .map_err(|e| StoreError::corruption(format!("encoding block info: {}", e)))?;
        self.kv.put(block_key(count), bytes);
        self.kv
            .put(BLOCK_COUNT_KEY.to_vec(), (count + 1).to_be_bytes().to_vec());
        Ok(())
    }

    /// Removes the most recent block's bookkeeping; exact inverse of
    /// [`push_block`](Self::push_block). The reverted block must be the
    /// one on top.
    pub fn pop_block(&mut self, block_number: u64) -> Result<BlockInfo, StoreError> {
        let count = self.block_count()?;
        let last = match count.checked_sub(1) {
            Some(last) => last,
            None => {
                tracing::error!(
                    "[mn-05] chain state desync: reverting block {} with no block applied",
                    block_number
                );
                panic!("chain state desync: revert on empty chain");
            }
        };
        let info = self.block_info(last)?.ok_or_else(|| {
            StoreError::corruption(format!("block info {} of {} is missing", last, count))
        })?;
        if info.block_number != block_number {
            tracing::error!(
                "[mn-05] chain state desync: reverting block {} but {} is on top",
                block_number,
                info.block_number
            );
            panic!("chain state desync: revert of block {}", block_number);
        }
        self.kv.delete(block_key(last));
        if last == 0 {
            self.kv.delete(BLOCK_COUNT_KEY.to_vec());
        } else {
            self.kv
                .put(BLOCK_COUNT_KEY.to_vec(), last.to_be_bytes().to_vec());
        }
        Ok(info)
    }

    /// Bookkeeping of the block at `position`, oldest applied first.
    pub fn block_info(&self, position: u64) -> Result<Option<BlockInfo>, StoreError> {
        match self.kv.get(&block_key(position))? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| StoreError::corruption(format!("decoding block info: {}", e))),
            None => Ok(None),
        }
    }

    /// Height of the most recently applied block; `None` before any.
    pub fn head_block_number(&self) -> Result<Option<u64>, StoreError> {
        let count = self.block_count()?;
        match count.checked_sub(1) {
            Some(last) => {
                let info = self.block_info(last)?.ok_or_else(|| {
                    StoreError::corruption(format!("block info {} of {} is missing", last, count))
                })?;
                Ok(Some(info.block_number))
            }
            None => Ok(None),
        }
    }

    /// Registers an account whose per-account logs this mirror maintains.
    pub fn track_account(&mut self, address: &str) {
        self.kv.put(account_key(address), vec![1]);
    }

    /// Whether `address` is in the tracked set.
    pub fn is_tracked(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.kv.get(&account_key(address))?.is_some())
    }

    /// Every tracked account, ascending.
    pub fn tracked_accounts(&self) -> Result<Vec<Address>, StoreError> {
        let mut accounts = Vec::new();
        for (key, _) in self.kv.scan_prefix(ACCOUNT_PREFIX)? {
            let address = String::from_utf8(key[ACCOUNT_PREFIX.len()..].to_vec())
                .map_err(|_| StoreError::corruption("account key holds a non-utf8 address".to_string()))?;
            accounts.push(address);
        }
        Ok(accounts)
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }

    fn read_u64(&self, key: &[u8], what: &str) -> Result<Option<u64>, StoreError> {
        match self.kv.get(key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::corruption(format!(
                        "{} has {} bytes, expected 8",
                        what,
                        bytes.len()
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }
}

impl<B: KeyValue> Staged for ChainStateStore<B> {
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
