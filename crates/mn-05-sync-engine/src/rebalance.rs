//! # Storage Rebalancing
//!
//! The storage-manager profile's write path. Plans storage updates from
//! the mirrored projections: files with heavy recent viewing get stored
//! here, files nobody viewed in the window get dropped, both bounded by
//! replica targets so the cluster neither hoards nor starves a file.
//!
//! Planned updates are broadcast to the daemon; the mirror itself is
//! never written. An accepted update comes back through the action log
//! and lands in the replication store like any other entry.

use mn_01_staged_store::KeyValue;
use serde::{Deserialize, Serialize};
use shared_types::{Address, StorageStatus};

use crate::engine::SyncEngine;
use crate::errors::SyncError;
use crate::ports::{ActionLogClient, BroadcastOutcome, StorageUpdateCommand, UpdateBroadcaster};
use crate::stores::MirrorStores;

/// Tuning knobs of the rebalance planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    /// The storage account this node stores files under.
    pub storage_address: Address,
    /// Views inside the window at which a file counts as hot.
    pub hot_view_threshold: u64,
    /// Stop storing copies of a file once it has this many replicas.
    pub target_replicas: u64,
    /// Never drop a file below this many replicas, however cold.
    pub min_replicas: u64,
    /// Blocks of view history the planner considers.
    pub statistics_window: u64,
}

impl RebalanceConfig {
    pub fn new(storage_address: &str) -> Self {
        RebalanceConfig {
            storage_address: storage_address.to_string(),
            hot_view_threshold: 100,
            target_replicas: 3,
            min_replicas: 1,
            statistics_window: 144,
        }
    }

    /// Low thresholds so tests can trip every rule with a handful of views.
    pub fn for_testing(storage_address: &str) -> Self {
        RebalanceConfig {
            storage_address: storage_address.to_string(),
            hot_view_threshold: 5,
            target_replicas: 2,
            min_replicas: 1,
            statistics_window: 1_000,
        }
    }
}

/// What one rebalance pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceReport {
    pub planned: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Plans the storage updates this node should broadcast, given the view
/// window ending at `head_block`.
///
/// Store commands come first, ascending by file, then remove commands in
/// the order the replication store lists them. A file this node already
/// stores is never planned for storing again, and a file at or below the
/// replica floor is never planned for removal.
pub fn plan_rebalance<B: KeyValue>(
    stores: &MirrorStores<B>,
    config: &RebalanceConfig,
    head_block: u64,
) -> Result<Vec<StorageUpdateCommand>, SyncError> {
    let mut commands = Vec::new();
    let totals = stores
        .statistics
        .window_totals(head_block, config.statistics_window)?;

    for (uri, views) in &totals {
        if *views < config.hot_view_threshold {
            continue;
        }
        if stores.replication.is_stored(&config.storage_address, uri)? {
            continue;
        }
        if stores.replication.replica_count(uri)? >= config.target_replicas {
            continue;
        }
        commands.push(StorageUpdateCommand {
            status: StorageStatus::Store,
            file_uri: uri.clone(),
            storage_address: config.storage_address.clone(),
            channel_address: stores.content.channel_of_file(uri)?.unwrap_or_default(),
        });
    }

    for uri in stores.replication.stored_uris(&config.storage_address)? {
        if totals.get(&uri).copied().unwrap_or(0) > 0 {
            continue;
        }
        if stores.replication.replica_count(&uri)? <= config.min_replicas {
            continue;
        }
        commands.push(StorageUpdateCommand {
            status: StorageStatus::Remove,
            channel_address: stores.content.channel_of_file(&uri)?.unwrap_or_default(),
            storage_address: config.storage_address.clone(),
            file_uri: uri,
        });
    }

    Ok(commands)
}

impl<B: KeyValue, C: ActionLogClient + UpdateBroadcaster> SyncEngine<B, C> {
    /// Runs one rebalance pass: plan against the mirrored window, then
    /// broadcast every planned update over the daemon connection.
    ///
    /// Rejections are counted, not fatal: the daemon is the authority on
    /// what a storage account may do, and the mirror replans from fresher
    /// state on the next pass anyway.
    pub async fn run_rebalance(
        &self,
        config: &RebalanceConfig,
    ) -> Result<RebalanceReport, SyncError> {
        let head = match self.stores.chain_state.head_block_number()? {
            Some(head) => head,
            None => {
                // Nothing mirrored yet; nothing to plan from.
                return Ok(RebalanceReport {
                    planned: 0,
                    accepted: 0,
                    rejected: 0,
                });
            }
        };

        let commands = plan_rebalance(&self.stores, config, head)?;
        let planned = commands.len();
        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for command in commands {
            match self.client.broadcast_storage_update(command.clone()).await? {
                BroadcastOutcome::Accepted => accepted += 1,
                BroadcastOutcome::Rejected(envelope) => {
                    tracing::warn!(
                        "[mn-05] daemon refused {:?} of {} (code {}): {}",
                        command.status,
                        command.file_uri,
                        envelope.code,
                        envelope.message
                    );
                    rejected += 1;
                }
            }
        }

        tracing::info!(
            "[mn-05] rebalance for {}: {} planned, {} accepted, {} rejected",
            config.storage_address,
            planned,
            accepted,
            rejected
        );
        Ok(RebalanceReport {
            planned,
            accepted,
            rejected,
        })
    }
}
