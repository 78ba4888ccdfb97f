//! # Entry Dispatch
//!
//! Routes one action log entry to every store its payload concerns.
//! Apply entries run the forward operations; revert entries run the exact
//! inverses in exactly reversed order, so an apply followed by its revert
//! leaves every row byte-identical. The action kinds are matched
//! exhaustively: a new kind fails compilation here instead of being
//! silently skipped.
//!
//! Every store is gated by its own committed watermark. After a crash the
//! stores may have committed different cycles, and the replay from the
//! cursor must touch only the stores that have not absorbed an entry yet.

use mn_01_staged_store::{KeyValue, Staged, StoreError};
use mn_02_account_log::TransactionRow;
use mn_03_projections::BalanceDirection;
use shared_types::{
    ActionLogEntry, ActionRecord, Address, BlockLog, Coin, LedgerAction, LoggingType, RewardEntry,
    TransactionLog,
};

use crate::chain_state::BlockInfo;
use crate::stores::MirrorStores;

/// A store's replay gate: entries at or below its committed watermark
/// were already absorbed and must be skipped.
#[derive(Debug, Clone, Copy)]
struct Gate(Option<u64>);

impl Gate {
    fn admits(self, global_index: u64) -> bool {
        self.0.map_or(true, |watermark| global_index > watermark)
    }
}

/// The per-store gates of one cycle, captured before its first entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoreGates {
    account_log: Gate,
    balances: Gate,
    replication: Gate,
    statistics: Gate,
    content: Gate,
    chain_state: Gate,
}

impl StoreGates {
    pub(crate) fn capture<B: KeyValue>(stores: &MirrorStores<B>) -> Self {
        StoreGates {
            account_log: Gate(stores.account_log.watermark()),
            balances: Gate(stores.balances.watermark()),
            replication: Gate(stores.replication.watermark()),
            statistics: Gate(stores.statistics.watermark()),
            content: Gate(stores.content.watermark()),
            chain_state: Gate(stores.chain_state.watermark()),
        }
    }
}

/// Applies one log entry to every store whose gate admits it.
pub(crate) fn dispatch_entry<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    entry: &ActionLogEntry,
) -> Result<(), StoreError> {
    match (&entry.record, entry.logging_type) {
        (ActionRecord::Block(block), LoggingType::Apply) => {
            apply_block(stores, gates, entry.global_index, block)
        }
        (ActionRecord::Block(block), LoggingType::Revert) => {
            revert_block(stores, gates, entry.global_index, block)
        }
        (ActionRecord::Transaction(tx), logging_type) => {
            // A bare transaction is logged under the current head block
            // and has no authority side. Reverts unwind tip-first, so at
            // revert time the head is back to what it was at apply time.
            let block_number = stores.chain_state.head_block_number()?.unwrap_or(0);
            dispatch_transaction(
                stores,
                gates,
                entry.global_index,
                block_number,
                "",
                tx,
                logging_type,
            )
        }
    }
}

fn apply_block<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    index: u64,
    block: &BlockLog,
) -> Result<(), StoreError> {
    if gates.chain_state.admits(index) {
        stores.chain_state.push_block(BlockInfo {
            block_number: block.block_number,
            authority: block.authority.clone(),
            transactions: block.transactions.len() as u64,
            rewards: block.rewards.len() as u64,
        })?;
    }
    for tx in &block.transactions {
        dispatch_transaction(
            stores,
            gates,
            index,
            block.block_number,
            &block.authority,
            tx,
            LoggingType::Apply,
        )?;
    }
    for reward in &block.rewards {
        dispatch_reward(stores, gates, index, block.block_number, reward, LoggingType::Apply)?;
    }
    Ok(())
}

/// Exact mirror of [`apply_block`], so the per-account log pops meet
/// their rows in LIFO order.
fn revert_block<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    index: u64,
    block: &BlockLog,
) -> Result<(), StoreError> {
    for reward in block.rewards.iter().rev() {
        dispatch_reward(stores, gates, index, block.block_number, reward, LoggingType::Revert)?;
    }
    for tx in block.transactions.iter().rev() {
        dispatch_transaction(
            stores,
            gates,
            index,
            block.block_number,
            &block.authority,
            tx,
            LoggingType::Revert,
        )?;
    }
    if gates.chain_state.admits(index) {
        stores.chain_state.pop_block(block.block_number)?;
    }
    Ok(())
}

fn dispatch_transaction<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    index: u64,
    block_number: u64,
    authority: &str,
    tx: &TransactionLog,
    logging_type: LoggingType,
) -> Result<(), StoreError> {
    match logging_type {
        LoggingType::Apply => {
            if gates.account_log.admits(index) {
                log_transaction_rows(stores, block_number, authority, tx)?;
            }
            if gates.balances.admits(index) {
                apply_balance_deltas(stores, authority, tx, logging_type)?;
            }
            dispatch_action(stores, gates, index, tx, logging_type)?;
        }
        LoggingType::Revert => {
            dispatch_action(stores, gates, index, tx, logging_type)?;
            if gates.balances.admits(index) {
                apply_balance_deltas(stores, authority, tx, logging_type)?;
            }
            if gates.account_log.admits(index) {
                unlog_transaction_rows(stores, block_number, authority, tx)?;
            }
        }
    }
    Ok(())
}

/// Accounts whose logs record this transaction: the distinct tracked
/// parties among from, to and the block authority.
fn logged_parties<B: KeyValue>(
    stores: &MirrorStores<B>,
    authority: &str,
    tx: &TransactionLog,
) -> Result<Vec<Address>, StoreError> {
    let mut parties: Vec<Address> = Vec::with_capacity(3);
    for party in [tx.from_address(), tx.to_address(), authority] {
        if party.is_empty() || parties.iter().any(|seen| seen == party) {
            continue;
        }
        if stores.chain_state.is_tracked(party)? {
            parties.push(party.to_string());
        }
    }
    Ok(parties)
}

fn log_transaction_rows<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    block_number: u64,
    authority: &str,
    tx: &TransactionLog,
) -> Result<(), StoreError> {
    let row = TransactionRow {
        transaction: tx.clone(),
        authority: authority.to_string(),
    };
    for party in logged_parties(stores, authority, tx)? {
        stores.account_log.append_transaction(&party, block_number, &row)?;
    }
    Ok(())
}

fn unlog_transaction_rows<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    block_number: u64,
    authority: &str,
    tx: &TransactionLog,
) -> Result<(), StoreError> {
    let row = TransactionRow {
        transaction: tx.clone(),
        authority: authority.to_string(),
    };
    for party in logged_parties(stores, authority, tx)?.into_iter().rev() {
        let popped = stores.account_log.pop_transaction(&party, block_number)?;
        if popped != row {
            tracing::error!(
                "[mn-05] log desync for {}: popped row does not match the reverted transaction",
                party
            );
            panic!("log desync for account {}", party);
        }
    }
    Ok(())
}

/// The balance moves of one transaction, in forward order: principal
/// from the from-side to the to-side, then the fee from the from-side to
/// the block authority. Sides without a party are absent.
fn balance_deltas(authority: &str, tx: &TransactionLog) -> Vec<(Address, Coin, BalanceDirection)> {
    let mut deltas: Vec<(Address, Coin, BalanceDirection)> = Vec::with_capacity(4);
    let from = tx.from_address();
    let to = tx.to_address();
    if !from.is_empty() {
        deltas.push((from.to_string(), tx.principal(), BalanceDirection::Decrease));
    }
    if !to.is_empty() {
        deltas.push((to.to_string(), tx.principal(), BalanceDirection::Increase));
    }
    if !from.is_empty() {
        deltas.push((from.to_string(), tx.fee, BalanceDirection::Decrease));
    }
    if !authority.is_empty() {
        deltas.push((authority.to_string(), tx.fee, BalanceDirection::Increase));
    }
    deltas
}

fn apply_balance_deltas<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    authority: &str,
    tx: &TransactionLog,
    logging_type: LoggingType,
) -> Result<(), StoreError> {
    let deltas = balance_deltas(authority, tx);
    match logging_type {
        LoggingType::Apply => {
            for (address, amount, direction) in deltas {
                stores.balances.apply_delta(&address, amount, direction)?;
            }
        }
        LoggingType::Revert => {
            for (address, amount, direction) in deltas.into_iter().rev() {
                stores.balances.apply_delta(&address, amount, direction.inverted())?;
            }
        }
    }
    Ok(())
}

/// The action-specific projection of one transaction. Transfers, role
/// grants and sponsorships move nothing beyond balances and log rows.
fn dispatch_action<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    index: u64,
    tx: &TransactionLog,
    logging_type: LoggingType,
) -> Result<(), StoreError> {
    match &tx.action {
        LedgerAction::StorageUpdate {
            storage_address,
            file_uri,
            status,
        } => {
            if gates.replication.admits(index) {
                stores
                    .replication
                    .update(storage_address, file_uri, *status, logging_type)?;
            }
        }
        LedgerAction::ContentUnit {
            channel_address,
            content_id,
            uri,
            unit,
        } => {
            if gates.content.admits(index) {
                match logging_type {
                    LoggingType::Apply => stores.content.apply_content_unit(
                        channel_address,
                        *content_id,
                        uri,
                        unit.clone(),
                    )?,
                    LoggingType::Revert => {
                        stores.content.revert_content_unit(channel_address, *content_id, uri)?
                    }
                }
            }
        }
        LedgerAction::ContentApprove {
            channel_address,
            content_id,
            uris,
            ..
        } => {
            if gates.content.admits(index) {
                match logging_type {
                    LoggingType::Apply => {
                        stores.content.apply_approve(channel_address, *content_id, uris)?
                    }
                    LoggingType::Revert => {
                        stores.content.revert_approve(channel_address, *content_id, uris)?
                    }
                }
            }
        }
        LedgerAction::ServiceStatistics {
            block_number,
            views,
            ..
        } => {
            // The report names the block the views were counted in, which
            // need not be the containing block.
            if gates.statistics.admits(index) {
                stores.statistics.record(*block_number, views, logging_type)?;
            }
        }
        LedgerAction::Transfer { .. }
        | LedgerAction::RoleGrant { .. }
        | LedgerAction::SponsorContentUnit { .. } => {}
    }
    Ok(())
}

fn dispatch_reward<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    gates: &StoreGates,
    index: u64,
    block_number: u64,
    reward: &RewardEntry,
    logging_type: LoggingType,
) -> Result<(), StoreError> {
    match logging_type {
        LoggingType::Apply => {
            if gates.account_log.admits(index) && stores.chain_state.is_tracked(&reward.to)? {
                stores.account_log.append_reward(&reward.to, block_number, reward)?;
            }
            if gates.balances.admits(index) {
                stores
                    .balances
                    .apply_delta(&reward.to, reward.amount, BalanceDirection::Increase)?;
            }
        }
        LoggingType::Revert => {
            if gates.balances.admits(index) {
                stores
                    .balances
                    .apply_delta(&reward.to, reward.amount, BalanceDirection::Decrease)?;
            }
            if gates.account_log.admits(index) && stores.chain_state.is_tracked(&reward.to)? {
                let popped = stores.account_log.pop_reward(&reward.to, block_number)?;
                if popped != *reward {
                    tracing::error!(
                        "[mn-05] log desync for {}: popped reward does not match the reverted one",
                        reward.to
                    );
                    panic!("log desync for account {}", reward.to);
                }
            }
        }
    }
    Ok(())
}

/// Applies to `address`'s per-account logs the slice of one entry that
/// concerns it, using the same membership rules as live dispatch.
/// `applied_blocks` is the import's transient chain: block numbers pushed
/// and popped as the scan meets block entries, so bare transactions land
/// under the head block they were originally logged under.
pub(crate) fn import_entry<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    address: &str,
    applied_blocks: &mut Vec<u64>,
    entry: &ActionLogEntry,
) -> Result<(), StoreError> {
    match (&entry.record, entry.logging_type) {
        (ActionRecord::Block(block), LoggingType::Apply) => {
            applied_blocks.push(block.block_number);
            for tx in &block.transactions {
                import_transaction(
                    stores,
                    address,
                    block.block_number,
                    &block.authority,
                    tx,
                    LoggingType::Apply,
                )?;
            }
            for reward in &block.rewards {
                if reward.to == address {
                    stores.account_log.append_reward(address, block.block_number, reward)?;
                }
            }
            Ok(())
        }
        (ActionRecord::Block(block), LoggingType::Revert) => {
            for reward in block.rewards.iter().rev() {
                if reward.to == address {
                    stores.account_log.pop_reward(address, block.block_number)?;
                }
            }
            for tx in block.transactions.iter().rev() {
                import_transaction(
                    stores,
                    address,
                    block.block_number,
                    &block.authority,
                    tx,
                    LoggingType::Revert,
                )?;
            }
            applied_blocks.pop();
            Ok(())
        }
        (ActionRecord::Transaction(tx), logging_type) => {
            let block_number = applied_blocks.last().copied().unwrap_or(0);
            import_transaction(stores, address, block_number, "", tx, logging_type)
        }
    }
}

fn import_transaction<B: KeyValue>(
    stores: &mut MirrorStores<B>,
    address: &str,
    block_number: u64,
    authority: &str,
    tx: &TransactionLog,
    logging_type: LoggingType,
) -> Result<(), StoreError> {
    let concerned = [tx.from_address(), tx.to_address(), authority]
        .into_iter()
        .any(|party| party == address);
    if !concerned {
        return Ok(());
    }
    let row = TransactionRow {
        transaction: tx.clone(),
        authority: authority.to_string(),
    };
    match logging_type {
        LoggingType::Apply => stores.account_log.append_transaction(address, block_number, &row),
        LoggingType::Revert => {
            stores.account_log.pop_transaction(address, block_number)?;
            Ok(())
        }
    }
}
