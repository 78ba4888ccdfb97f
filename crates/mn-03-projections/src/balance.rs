//! # Balance Projection
//!
//! Account balances derived from transfer principals, fees and rewards.
//! Rows are lazy: an account gets one on its first non-zero delta and
//! loses it when its balance returns to zero, so an absent row and a zero
//! balance are the same state and reverting an account's first credit
//! leaves no trace behind.
//!
//! A decrease below zero cannot be produced by a log the daemon validated;
//! hitting one means the mirror has drifted and the process stops.

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use shared_types::Coin;

/// Which way a delta moves a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDirection {
    Increase,
    Decrease,
}

impl BalanceDirection {
    /// The direction that exactly undoes this one.
    pub fn inverted(self) -> Self {
        match self {
            BalanceDirection::Increase => BalanceDirection::Decrease,
            BalanceDirection::Decrease => BalanceDirection::Increase,
        }
    }
}

/// Balances of every account seen in the log.
pub struct BalanceProjection<B: KeyValue> {
    kv: StagedKv<B>,
}

fn balance_key(address: &str) -> Vec<u8> {
    format!("bal:{}", address).into_bytes()
}

impl<B: KeyValue> BalanceProjection<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(BalanceProjection {
            kv: StagedKv::open("balances", backing)?,
        })
    }

    /// Applies one delta to one account.
    ///
    /// Zero deltas are no-ops and create no row. The address must name an
    /// account: "no party" sides are skipped by the caller, never applied.
    pub fn apply_delta(
        &mut self,
        address: &str,
        amount: Coin,
        direction: BalanceDirection,
    ) -> Result<(), StoreError> {
        assert!(!address.is_empty(), "balance delta without an account");
        if amount.is_zero() {
            return Ok(());
        }

        let current = self.balance(address)?;
        let updated = match direction {
            BalanceDirection::Increase => current.checked_add(amount),
            BalanceDirection::Decrease => current.checked_sub(amount),
        };
        let updated = match updated {
            Some(updated) => updated,
            None => {
                tracing::error!(
                    "[mn-03] balance desync for {}: {} {:?} {} leaves the representable range",
                    address,
                    current,
                    direction,
                    amount
                );
                panic!("balance desync for account {}", address);
            }
        };

        let key = balance_key(address);
        if updated.is_zero() {
            self.kv.delete(key);
        } else {
            self.kv.put(
                key,
                bincode::serialize(&updated)
                    .map_err(|e| StoreError::corruption(format!("encoding balance: {}", e)))?,
            );
        }
        Ok(())
    }

    /// Current balance; zero for accounts without a row.
    pub fn balance(&self, address: &str) -> Result<Coin, StoreError> {
        match self.kv.get(&balance_key(address))? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| StoreError::corruption(format!("decoding balance: {}", e))),
            None => Ok(Coin::ZERO),
        }
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }
}

impl<B: KeyValue> Staged for BalanceProjection<B> {
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
