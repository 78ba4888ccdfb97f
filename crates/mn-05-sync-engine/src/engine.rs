//! # Sync Engine
//!
//! Drives the mirror: each cycle pages the daemon's action log from the
//! committed cursor, routes every entry through the dispatcher into the
//! staged stores, and commits everything at once when the log is drained.
//! A cycle that fails anywhere is discarded whole; the next tick starts
//! again from the committed cursor.
//!
//! Account imports run the same pagination against the already-absorbed
//! prefix of the log, but touch only the new account's own logs and never
//! move the cursor or the watermarks.

use mn_01_staged_store::KeyValue;
use shared_types::validate_address;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::dispatch::{dispatch_entry, import_entry, StoreGates};
use crate::errors::SyncError;
use crate::pagination::{page_exhausts_log, validate_page};
use crate::ports::{ActionLogClient, LogFetchRequest};
use crate::stores::{MirrorStores, UnitOfWork};

/// Where the engine currently is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No cycle running. Also the parking state after a failed cycle.
    Idle,
    /// A page request is in flight.
    RequestSent,
    /// A received page is being dispatched.
    Draining,
    /// The last cycle finished and committed.
    Done,
}

/// What one sync cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Pages fetched, including a final empty one.
    pub pages: u32,
    /// Entries absorbed.
    pub entries: u64,
    /// Committed cursor after the cycle.
    pub next_index: u64,
}

/// What one account import did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub pages: u32,
    /// Entries scanned, whether or not they concerned the account.
    pub entries: u64,
}

/// The mirror's consumer of one daemon connection.
pub struct SyncEngine<B: KeyValue, C> {
    pub(crate) config: SyncConfig,
    pub(crate) client: C,
    pub(crate) stores: MirrorStores<B>,
    pub(crate) phase: SyncPhase,
}

impl<B: KeyValue, C: ActionLogClient> SyncEngine<B, C> {
    pub fn new(config: SyncConfig, client: C, stores: MirrorStores<B>) -> Self {
        SyncEngine {
            config,
            client,
            stores,
            phase: SyncPhase::Idle,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn stores(&self) -> &MirrorStores<B> {
        &self.stores
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn into_stores(self) -> MirrorStores<B> {
        self.stores
    }

    /// Runs one full sync cycle: drain the log from the committed cursor,
    /// then commit every store.
    ///
    /// On failure all staged work is discarded and the engine parks in
    /// [`SyncPhase::Idle`]; the committed state is exactly what it was
    /// before the call.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
        let outcome = self.cycle().await;
        if outcome.is_err() {
            self.phase = SyncPhase::Idle;
        }
        outcome
    }

    async fn cycle(&mut self) -> Result<CycleReport, SyncError> {
        let cycle_id = Uuid::new_v4();
        let mut work = UnitOfWork::begin(&mut self.stores, "sync cycle");
        let gates = StoreGates::capture(work.stores());
        let start_index = work.stores().chain_state.next_index()?;

        let mut next_index = start_index;
        let mut pages = 0u32;
        let mut entries = 0u64;
        loop {
            self.phase = SyncPhase::RequestSent;
            let request = LogFetchRequest {
                start_index: next_index,
                max_count: self.config.page_size,
            };
            let page = self.client.fetch(request.clone()).await?;
            validate_page(&request, &page)?;
            pages += 1;

            self.phase = SyncPhase::Draining;
            let exhausted = page_exhausts_log(page.actions.len(), request.max_count);
            for entry in &page.actions {
                next_index = entry.global_index + 1;
                dispatch_entry(work.stores(), &gates, entry)?;
                work.stores().chain_state.set_next_index(next_index);
                entries += 1;
            }
            if exhausted {
                break;
            }
        }

        if entries > 0 {
            if let Some(head) = work.stores().chain_state.head_block_number()? {
                let window = self.config.statistics_window;
                let pruned = work.stores().statistics.prune_outside_window(head, window)?;
                if pruned > 0 {
                    tracing::debug!(
                        "[mn-05] cycle {}: pruned {} statistics block(s) behind block {}",
                        cycle_id,
                        pruned,
                        head
                    );
                }
            }
            work.commit_at(next_index - 1)?;
        } else {
            work.commit()?;
        }

        self.phase = SyncPhase::Done;
        tracing::info!(
            "[mn-05] cycle {}: {} entries over {} page(s), cursor {} -> {}",
            cycle_id,
            entries,
            pages,
            start_index,
            next_index
        );
        Ok(CycleReport {
            pages,
            entries,
            next_index,
        })
    }

    /// Backfills the per-account logs of `address` from the start of the
    /// log up to (excluding) `target_index`, then marks it tracked.
    ///
    /// The target is the cursor position the account should catch up to;
    /// passing the current committed cursor makes the account's history
    /// complete, and live sync covers it from there on. Importing an
    /// already-tracked account does nothing.
    pub async fn import_account(
        &mut self,
        address: &str,
        target_index: u64,
    ) -> Result<ImportReport, SyncError> {
        validate_address(address)?;
        if self.stores.chain_state.is_tracked(address)? {
            tracing::info!("[mn-05] {} is already tracked; skipping import", address);
            return Ok(ImportReport {
                pages: 0,
                entries: 0,
            });
        }
        let outcome = self.import(address, target_index).await;
        if outcome.is_err() {
            self.phase = SyncPhase::Idle;
        }
        outcome
    }

    async fn import(
        &mut self,
        address: &str,
        target_index: u64,
    ) -> Result<ImportReport, SyncError> {
        let mut work = UnitOfWork::begin(&mut self.stores, "account import");
        let mut applied_blocks: Vec<u64> = Vec::new();

        let mut next_index = 0u64;
        let mut pages = 0u32;
        let mut entries = 0u64;
        while next_index < target_index {
            self.phase = SyncPhase::RequestSent;
            let remaining = target_index - next_index;
            let request = LogFetchRequest {
                start_index: next_index,
                max_count: remaining.min(u64::from(self.config.import_page_size)) as u32,
            };
            let page = self.client.fetch(request.clone()).await?;
            validate_page(&request, &page)?;
            pages += 1;

            self.phase = SyncPhase::Draining;
            let exhausted = page_exhausts_log(page.actions.len(), request.max_count);
            let mut reached_target = false;
            for entry in &page.actions {
                // The log may hold indexes past the target when entries
                // were skipped; they belong to live sync, not the import.
                if entry.global_index >= target_index {
                    reached_target = true;
                    break;
                }
                next_index = entry.global_index + 1;
                import_entry(work.stores(), address, &mut applied_blocks, entry)?;
                entries += 1;
            }
            if exhausted || reached_target {
                break;
            }
        }

        work.stores().chain_state.track_account(address);
        work.commit()?;

        self.phase = SyncPhase::Done;
        tracing::info!(
            "[mn-05] imported {}: {} entries over {} page(s)",
            address,
            entries,
            pages
        );
        Ok(ImportReport { pages, entries })
    }
}
