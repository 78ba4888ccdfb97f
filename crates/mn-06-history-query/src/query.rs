//! # History Queries
//!
//! Merges one account's transaction log and reward log into a single
//! chronological feed over a requested block range. The range indexes
//! bound the walk: only blocks inside a covered sub-range are visited,
//! and a visited block contributes items only when its log actually holds
//! rows there.

use mn_01_staged_store::KeyValue;
use mn_02_account_log::{AccountLogStore, LogKind};
use shared_types::validate_address;

use crate::errors::HistoryError;
use crate::feed::{item_from_reward, items_from_transaction, FeedItem};
use crate::partition::partition_block_ranges;

/// Read-only feed queries over the per-account logs.
pub struct HistoryQueryEngine;

impl HistoryQueryEngine {
    /// The account's activity feed over `[block_start, block_start +
    /// block_count)`, ascending by block, transactions before rewards
    /// inside one block.
    ///
    /// `head_block` is the caller's view of the chain tip and only feeds
    /// the confirmation counts; it does not clip the range.
    pub fn account_history<B: KeyValue>(
        store: &AccountLogStore<B>,
        address: &str,
        block_start: u64,
        block_count: u64,
        head_block: u64,
    ) -> Result<Vec<FeedItem>, HistoryError> {
        validate_address(address)?;
        let requested = block_start..block_start.saturating_add(block_count);
        let transaction_span =
            store.block_span(address, LogKind::Transactions, requested.clone())?;
        let reward_span = store.block_span(address, LogKind::Rewards, requested.clone())?;

        let mut feed = Vec::new();
        for sub_range in partition_block_ranges(transaction_span, reward_span, requested) {
            for block_number in sub_range.lo..=sub_range.hi {
                if sub_range.source.includes_transactions() {
                    for row in store.transactions_in_block(address, block_number)? {
                        feed.extend(items_from_transaction(
                            address,
                            block_number,
                            head_block,
                            &row,
                        ));
                    }
                }
                if sub_range.source.includes_rewards() {
                    for reward in store.rewards_in_block(address, block_number)? {
                        feed.push(item_from_reward(block_number, head_block, &reward));
                    }
                }
            }
        }
        tracing::debug!(
            "[mn-06] history for {} over blocks {}..{}: {} item(s)",
            address,
            block_start,
            block_start.saturating_add(block_count),
            feed.len()
        );
        Ok(feed)
    }
}
