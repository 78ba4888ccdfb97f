//! # Account Log Store
//!
//! Facade pairing each per-account append log with its block range index.
//! Both logs and both indexes live in ONE store, so one commit covers them
//! and a crash can never persist a log row without its index entry or the
//! other way round.

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use serde::{Deserialize, Serialize};
use shared_types::{Address, RewardEntry, TransactionLog};

use crate::append_log::AppendLog;
use crate::keys::LogKind;
use crate::range_index::{BlockRangeIndex, RangeEntry};

/// One row of a per-account transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    /// The logged transaction.
    pub transaction: TransactionLog,
    /// Authority of the containing block; collects the fee.
    pub authority: Address,
}

/// Per-account transaction and reward logs with their range indexes.
pub struct AccountLogStore<B: KeyValue> {
    kv: StagedKv<B>,
    transactions: AppendLog,
    rewards: AppendLog,
    transaction_index: BlockRangeIndex,
    reward_index: BlockRangeIndex,
}

impl<B: KeyValue> AccountLogStore<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(AccountLogStore {
            kv: StagedKv::open("account-log", backing)?,
            transactions: AppendLog::new(LogKind::Transactions),
            rewards: AppendLog::new(LogKind::Rewards),
            transaction_index: BlockRangeIndex::new(LogKind::Transactions),
            reward_index: BlockRangeIndex::new(LogKind::Rewards),
        })
    }

    /// Appends a transaction row and indexes it under its block.
    pub fn append_transaction(
        &mut self,
        account: &str,
        block_number: u64,
        row: &TransactionRow,
    ) -> Result<(), StoreError> {
        let offset = self.transactions.append(&mut self.kv, account, row)?;
        self.transaction_index
            .insert(&mut self.kv, account, block_number, offset)?;
        Ok(())
    }

    /// Removes the most recent transaction row, unindexing it from `block_number`.
    ///
    /// Exact inverse of `append_transaction` for the same block.
    pub fn pop_transaction(
        &mut self,
        account: &str,
        block_number: u64,
    ) -> Result<TransactionRow, StoreError> {
        let len_before = self.transactions.len(&self.kv, account)?;
        let row = self.transactions.pop(&mut self.kv, account)?;
        self.transaction_index
            .remove_one(&mut self.kv, account, block_number, len_before)?;
        Ok(row)
    }

    /// Appends a reward row and indexes it under its block.
    pub fn append_reward(
        &mut self,
        account: &str,
        block_number: u64,
        reward: &RewardEntry,
    ) -> Result<(), StoreError> {
        let offset = self.rewards.append(&mut self.kv, account, reward)?;
        self.reward_index
            .insert(&mut self.kv, account, block_number, offset)?;
        Ok(())
    }

    /// Removes the most recent reward row, unindexing it from `block_number`.
    pub fn pop_reward(
        &mut self,
        account: &str,
        block_number: u64,
    ) -> Result<RewardEntry, StoreError> {
        let len_before = self.rewards.len(&self.kv, account)?;
        let reward = self.rewards.pop(&mut self.kv, account)?;
        self.reward_index
            .remove_one(&mut self.kv, account, block_number, len_before)?;
        Ok(reward)
    }

    /// All transaction rows of one block, in log order. Empty when the
    /// block left no rows for this account.
    pub fn transactions_in_block(
        &self,
        account: &str,
        block_number: u64,
    ) -> Result<Vec<TransactionRow>, StoreError> {
        match self
            .transaction_index
            .lookup(&self.kv, account, block_number)?
        {
            Some(range) => self.read_rows(&self.transactions, account, range),
            None => Ok(Vec::new()),
        }
    }

    /// All reward rows of one block, in log order.
    pub fn rewards_in_block(
        &self,
        account: &str,
        block_number: u64,
    ) -> Result<Vec<RewardEntry>, StoreError> {
        match self.reward_index.lookup(&self.kv, account, block_number)? {
            Some(range) => self.read_rows(&self.rewards, account, range),
            None => Ok(Vec::new()),
        }
    }

    /// Lowest and highest indexed block of one log inside `range`.
    pub fn block_span(
        &self,
        account: &str,
        kind: LogKind,
        range: std::ops::Range<u64>,
    ) -> Result<Option<(u64, u64)>, StoreError> {
        let index = match kind {
            LogKind::Transactions => &self.transaction_index,
            LogKind::Rewards => &self.reward_index,
        };
        index.block_span(&self.kv, account, range)
    }

    /// Length of the account's transaction log.
    pub fn transaction_log_len(&self, account: &str) -> Result<u64, StoreError> {
        self.transactions.len(&self.kv, account)
    }

    /// Length of the account's reward log.
    pub fn reward_log_len(&self, account: &str) -> Result<u64, StoreError> {
        self.rewards.len(&self.kv, account)
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }

    fn read_rows<T: serde::de::DeserializeOwned>(
        &self,
        log: &AppendLog,
        account: &str,
        range: RangeEntry,
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::with_capacity(range.count as usize);
        for offset in range.offset..range.end() {
            let row = log.get(&self.kv, account, offset)?.ok_or_else(|| {
                StoreError::corruption(format!(
                    "indexed log row {} of {} is missing",
                    offset, account
                ))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl<B: KeyValue> Staged for AccountLogStore<B> {
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
