//! # Feed Items
//!
//! One log row becomes feed items according to the queried account's role
//! in it. A transaction row yields up to four: the receiving side, the
//! sending side (sponsorships keep their own kind), the fee leaving the
//! sender and the fee reaching the block authority. A reward row yields
//! exactly one.

use mn_02_account_log::TransactionRow;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Coin, LedgerAction, RewardEntry, RewardKind};

/// The queried account's role in one feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    /// The account was the receiving side of the action.
    Received,
    /// The account was the sending side.
    Sent,
    /// The account sponsored a content unit; the sent amount went to the
    /// channel.
    Sponsored,
    /// The fee the account paid, separate from the principal it sent.
    SentFee,
    /// The fee the account collected as the block authority.
    ReceivedFee,
    /// The account was paid a reward for the named service.
    Rewarded(RewardKind),
}

/// One line of an account's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub kind: FeedKind,
    pub block_number: u64,
    /// The principal of the action; zero for fee-only items.
    pub amount: Coin,
    /// The action's fee; zero for rewards.
    pub fee: Coin,
    /// The other side of the item. Empty for rewards and for actions
    /// without a counterparty.
    pub counterparty: Address,
    pub confirmations: u64,
}

pub(crate) fn confirmations(head_block: u64, block_number: u64) -> u64 {
    head_block.saturating_sub(block_number) + 1
}

/// The feed items `address` derives from one of its transaction rows.
pub(crate) fn items_from_transaction(
    address: &str,
    block_number: u64,
    head_block: u64,
    row: &TransactionRow,
) -> Vec<FeedItem> {
    let tx = &row.transaction;
    let confirmations = confirmations(head_block, block_number);
    let from = tx.from_address();
    let to = tx.to_address();
    let mut items = Vec::new();

    if to == address {
        items.push(FeedItem {
            kind: FeedKind::Received,
            block_number,
            amount: tx.principal(),
            fee: tx.fee,
            counterparty: from.to_string(),
            confirmations,
        });
    }
    if from == address {
        let kind = if matches!(tx.action, LedgerAction::SponsorContentUnit { .. }) {
            FeedKind::Sponsored
        } else {
            FeedKind::Sent
        };
        items.push(FeedItem {
            kind,
            block_number,
            amount: tx.principal(),
            fee: tx.fee,
            counterparty: to.to_string(),
            confirmations,
        });
        if !tx.fee.is_zero() {
            items.push(FeedItem {
                kind: FeedKind::SentFee,
                block_number,
                amount: Coin::ZERO,
                fee: tx.fee,
                counterparty: row.authority.clone(),
                confirmations,
            });
        }
    }
    if row.authority == address && !tx.fee.is_zero() {
        items.push(FeedItem {
            kind: FeedKind::ReceivedFee,
            block_number,
            amount: Coin::ZERO,
            fee: tx.fee,
            counterparty: from.to_string(),
            confirmations,
        });
    }
    items
}

/// The single feed item of one reward row.
pub(crate) fn item_from_reward(
    block_number: u64,
    head_block: u64,
    reward: &RewardEntry,
) -> FeedItem {
    FeedItem {
        kind: FeedKind::Rewarded(reward.reward_type),
        block_number,
        amount: reward.amount,
        fee: Coin::ZERO,
        counterparty: String::new(),
        confirmations: confirmations(head_block, block_number),
    }
}
