//! # Daemon Ports
//!
//! The mirror's two outbound surfaces: reading pages of the action log
//! and broadcasting storage updates back to the network. Production
//! serves both over one daemon connection; the traits stay separate so
//! each code path demands only what it uses.
//!
//! [`MockDaemon`] is the scripted double the engine tests and the
//! integration suite drive cycles against.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{ActionLogEntry, Address, StorageStatus};

use crate::errors::TransportError;

/// A bounded page request against the daemon's action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFetchRequest {
    /// Lowest global index the page may contain.
    pub start_index: u64,
    /// Upper bound on entries in the response.
    pub max_count: u32,
}

/// One page of the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    /// Entries ascending by `global_index`. Fewer entries than the
    /// requested bound means the log is exhausted.
    pub actions: Vec<ActionLogEntry>,
}

/// Read access to the daemon's action log.
#[async_trait]
pub trait ActionLogClient: Send + Sync {
    /// Fetches one page, blocking until the daemon answers or the
    /// connection fails.
    async fn fetch(&self, request: LogFetchRequest) -> Result<LogPage, TransportError>;
}

/// A replication change this node asks the network to log.
///
/// The daemon wraps it in a signed transaction; once accepted it comes
/// back through the action log as a `StorageUpdate` like anyone else's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUpdateCommand {
    /// Begin or stop storing the file.
    pub status: StorageStatus,
    /// The file the update concerns.
    pub file_uri: String,
    /// The storage node making the change.
    pub storage_address: Address,
    /// Channel whose content references the file; empty when none does.
    pub channel_address: Address,
}

/// Structured refusal the daemon returns for an update it will not log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEnvelope {
    pub code: u32,
    pub message: String,
}

/// Daemon-side verdict on a broadcast update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastOutcome {
    /// The update was accepted for inclusion.
    Accepted,
    /// The daemon refused it; the planner revisits on a later pass.
    Rejected(FailureEnvelope),
}

/// Write access to the network: submits storage updates one at a time.
#[async_trait]
pub trait UpdateBroadcaster: Send + Sync {
    async fn broadcast_storage_update(
        &self,
        command: StorageUpdateCommand,
    ) -> Result<BroadcastOutcome, TransportError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Scripted daemon for tests.
///
/// Serves pages from a fixed entry list, records every request and every
/// broadcast, and can be told to drop a specific request or reject
/// updates touching a specific file.
#[derive(Default)]
pub struct MockDaemon {
    entries: Mutex<Vec<ActionLogEntry>>,
    requests: Mutex<Vec<LogFetchRequest>>,
    fail_on_request: Mutex<Option<usize>>,
    broadcasts: Mutex<Vec<StorageUpdateCommand>>,
    rejected_uris: Mutex<HashSet<String>>,
}

impl MockDaemon {
    /// A daemon whose log holds `entries`, ascending by global index.
    pub fn new(entries: Vec<ActionLogEntry>) -> Self {
        MockDaemon {
            entries: Mutex::new(entries),
            ..MockDaemon::default()
        }
    }

    /// Appends entries to the scripted log, as if the daemon kept running
    /// between cycles.
    pub fn extend_log(&self, entries: Vec<ActionLogEntry>) {
        self.entries.lock().unwrap().extend(entries);
    }

    /// Makes the zero-based `ordinal`-th fetch fail with a dropped
    /// connection. Later fetches succeed again.
    pub fn fail_on_request(&self, ordinal: usize) {
        *self.fail_on_request.lock().unwrap() = Some(ordinal);
    }

    /// Rejects every broadcast touching `file_uri`.
    pub fn reject_uri(&self, file_uri: &str) {
        self.rejected_uris.lock().unwrap().insert(file_uri.to_string());
    }

    /// Every fetch request seen so far, in order.
    pub fn requests(&self) -> Vec<LogFetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every storage update broadcast so far, in order.
    pub fn broadcasts(&self) -> Vec<StorageUpdateCommand> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionLogClient for MockDaemon {
    async fn fetch(&self, request: LogFetchRequest) -> Result<LogPage, TransportError> {
        let ordinal = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        if *self.fail_on_request.lock().unwrap() == Some(ordinal) {
            return Err(TransportError::Disconnected(
                "scripted connection drop".to_string(),
            ));
        }

        let entries = self.entries.lock().unwrap();
        let actions = entries
            .iter()
            .filter(|entry| entry.global_index >= request.start_index)
            .take(request.max_count as usize)
            .cloned()
            .collect();
        Ok(LogPage { actions })
    }
}

#[async_trait]
impl UpdateBroadcaster for MockDaemon {
    async fn broadcast_storage_update(
        &self,
        command: StorageUpdateCommand,
    ) -> Result<BroadcastOutcome, TransportError> {
        let rejected = self.rejected_uris.lock().unwrap().contains(&command.file_uri);
        self.broadcasts.lock().unwrap().push(command);
        if rejected {
            return Ok(BroadcastOutcome::Rejected(FailureEnvelope {
                code: 409,
                message: "update refused by policy".to_string(),
            }));
        }
        Ok(BroadcastOutcome::Accepted)
    }
}
