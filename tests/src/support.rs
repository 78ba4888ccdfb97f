//! Log entry builders shared by the integration tests and benchmarks.
//!
//! Every builder produces the daemon-side shapes from `shared-types`, so a
//! scripted `MockDaemon` log reads like the traffic a real daemon emits.

use shared_types::{
    ActionLogEntry, ActionRecord, BlockLog, Coin, ContentUnitBody, LedgerAction, LoggingType,
    RewardEntry, RewardKind, StorageStatus, TransactionLog,
};

/// A transfer with a fee, both in whole units.
pub fn transfer(from: &str, to: &str, units: u64, fee: u64) -> TransactionLog {
    TransactionLog {
        action: LedgerAction::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount: Coin::from_units(units),
        },
        fee: Coin::from_units(fee),
    }
}

/// Credits an account out of nothing: the empty from-side is skipped.
pub fn mint(to: &str, units: u64) -> TransactionLog {
    transfer("", to, units, 0)
}

/// Wraps any action into a fee-free transaction.
pub fn action_tx(action: LedgerAction) -> TransactionLog {
    TransactionLog {
        action,
        fee: Coin::ZERO,
    }
}

/// A storage node announcing it stores or dropped a file.
pub fn store_update(storage_address: &str, file_uri: &str, status: StorageStatus) -> TransactionLog {
    action_tx(LedgerAction::StorageUpdate {
        storage_address: storage_address.to_string(),
        file_uri: file_uri.to_string(),
        status,
    })
}

/// A service node reporting per-file view counts for one block.
pub fn views(reporter: &str, block_number: u64, counts: &[(&str, u64)]) -> TransactionLog {
    action_tx(LedgerAction::ServiceStatistics {
        reporter: reporter.to_string(),
        block_number,
        views: counts
            .iter()
            .map(|(uri, count)| (uri.to_string(), *count))
            .collect(),
    })
}

/// Publishes one content unit made of `files` under a channel.
pub fn publication(
    channel: &str,
    content_id: u64,
    uri: &str,
    author: &str,
    files: &[&str],
) -> TransactionLog {
    action_tx(LedgerAction::ContentUnit {
        channel_address: channel.to_string(),
        content_id,
        uri: uri.to_string(),
        unit: ContentUnitBody {
            author_addresses: vec![author.to_string()],
            file_uris: files.iter().map(|f| f.to_string()).collect(),
        },
    })
}

/// Approves the named revisions of one content.
pub fn approval(channel: &str, content_id: u64, approver: &str, uris: &[&str]) -> TransactionLog {
    action_tx(LedgerAction::ContentApprove {
        approver: approver.to_string(),
        channel_address: channel.to_string(),
        content_id,
        uris: uris.iter().map(|u| u.to_string()).collect(),
    })
}

/// A reward paid to one account.
pub fn reward(to: &str, units: u64, reward_type: RewardKind) -> RewardEntry {
    RewardEntry {
        to: to.to_string(),
        amount: Coin::from_units(units),
        reward_type,
    }
}

/// An applied block entry at `global_index`.
pub fn block(
    global_index: u64,
    block_number: u64,
    authority: &str,
    transactions: Vec<TransactionLog>,
    rewards: Vec<RewardEntry>,
) -> ActionLogEntry {
    ActionLogEntry {
        global_index,
        logging_type: LoggingType::Apply,
        record: ActionRecord::Block(BlockLog {
            block_number,
            authority: authority.to_string(),
            transactions,
            rewards,
        }),
    }
}

/// The revert of an earlier entry, logged at its own later index.
pub fn revert(global_index: u64, applied: &ActionLogEntry) -> ActionLogEntry {
    ActionLogEntry {
        global_index,
        logging_type: LoggingType::Revert,
        record: applied.record.clone(),
    }
}

/// A transaction logged outside block context.
pub fn bare_tx(global_index: u64, tx: TransactionLog) -> ActionLogEntry {
    ActionLogEntry {
        global_index,
        logging_type: LoggingType::Apply,
        record: ActionRecord::Transaction(tx),
    }
}
