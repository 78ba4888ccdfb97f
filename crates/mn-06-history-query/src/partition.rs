//! # Range Partition
//!
//! The transaction log and the reward log of one account cover block
//! spans that may overlap, nest, touch or miss each other entirely. To
//! merge them in one ascending pass, the requested range is split into
//! disjoint sub-ranges, each labeled with the log(s) that cover it, so
//! the reader opens only the logs that can hold rows there.
//!
//! Pure arithmetic over inclusive spans; nothing here touches a store.

use std::ops::Range;

/// Which log(s) cover a sub-range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    TransactionsOnly,
    RewardsOnly,
    Both,
}

impl FeedSource {
    pub fn includes_transactions(self) -> bool {
        matches!(self, FeedSource::TransactionsOnly | FeedSource::Both)
    }

    pub fn includes_rewards(self) -> bool {
        matches!(self, FeedSource::RewardsOnly | FeedSource::Both)
    }
}

/// One covered slice of the requested range, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub source: FeedSource,
    pub lo: u64,
    pub hi: u64,
}

/// Splits `requested` into the disjoint sub-ranges covered by the two
/// spans, ascending by block.
///
/// At most three sub-ranges come back: whichever span starts earlier
/// contributes a single-source prefix, the overlap carries both, and
/// whichever span ends later contributes a single-source suffix. Disjoint
/// spans yield two sub-ranges with the uncovered gap skipped; absent
/// spans degrade to one sub-range or none.
pub fn partition_block_ranges(
    transaction_span: Option<(u64, u64)>,
    reward_span: Option<(u64, u64)>,
    requested: Range<u64>,
) -> Vec<SubRange> {
    let transactions = clip(transaction_span, &requested);
    let rewards = clip(reward_span, &requested);
    match (transactions, rewards) {
        (None, None) => Vec::new(),
        (Some((lo, hi)), None) => vec![SubRange {
            source: FeedSource::TransactionsOnly,
            lo,
            hi,
        }],
        (None, Some((lo, hi))) => vec![SubRange {
            source: FeedSource::RewardsOnly,
            lo,
            hi,
        }],
        (Some(transactions), Some(rewards)) => partition_covered(transactions, rewards),
    }
}

fn clip(span: Option<(u64, u64)>, requested: &Range<u64>) -> Option<(u64, u64)> {
    let (lo, hi) = span?;
    if requested.is_empty() {
        return None;
    }
    let lo = lo.max(requested.start);
    let hi = hi.min(requested.end - 1);
    if lo > hi {
        None
    } else {
        Some((lo, hi))
    }
}

fn partition_covered(transactions: (u64, u64), rewards: (u64, u64)) -> Vec<SubRange> {
    let overlap_lo = transactions.0.max(rewards.0);
    let overlap_hi = transactions.1.min(rewards.1);

    if overlap_lo > overlap_hi {
        // Disjoint spans. The gap between them holds no rows of either
        // log, so it is skipped rather than walked.
        let (earlier_source, (earlier_lo, earlier_hi), later_source, (later_lo, later_hi)) =
            if transactions.1 < rewards.0 {
                (
                    FeedSource::TransactionsOnly,
                    transactions,
                    FeedSource::RewardsOnly,
                    rewards,
                )
            } else {
                (
                    FeedSource::RewardsOnly,
                    rewards,
                    FeedSource::TransactionsOnly,
                    transactions,
                )
            };
        return vec![
            SubRange {
                source: earlier_source,
                lo: earlier_lo,
                hi: earlier_hi,
            },
            SubRange {
                source: later_source,
                lo: later_lo,
                hi: later_hi,
            },
        ];
    }

    let mut ranges = Vec::with_capacity(3);
    if transactions.0 < overlap_lo {
        ranges.push(SubRange {
            source: FeedSource::TransactionsOnly,
            lo: transactions.0,
            hi: overlap_lo - 1,
        });
    } else if rewards.0 < overlap_lo {
        ranges.push(SubRange {
            source: FeedSource::RewardsOnly,
            lo: rewards.0,
            hi: overlap_lo - 1,
        });
    }
    ranges.push(SubRange {
        source: FeedSource::Both,
        lo: overlap_lo,
        hi: overlap_hi,
    });
    if transactions.1 > overlap_hi {
        ranges.push(SubRange {
            source: FeedSource::TransactionsOnly,
            lo: overlap_hi + 1,
            hi: transactions.1,
        });
    } else if rewards.1 > overlap_hi {
        ranges.push(SubRange {
            source: FeedSource::RewardsOnly,
            lo: overlap_hi + 1,
            hi: rewards.1,
        });
    }
    ranges
}
