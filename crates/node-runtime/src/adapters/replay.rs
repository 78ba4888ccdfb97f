//! Offline log replay.
//!
//! Serves a captured action log from a bincode file instead of a live
//! daemon. Useful for rebuilding a mirror from a snapshot and for soak
//! testing the sync engine against real traffic.

use std::path::Path;

use async_trait::async_trait;
use mn_05_sync_engine::{
    ActionLogClient, BroadcastOutcome, LogFetchRequest, LogPage, StorageUpdateCommand,
    TransportError, UpdateBroadcaster,
};
use shared_types::ActionLogEntry;

/// Read-only client over a captured log.
pub struct FileReplayClient {
    entries: Vec<ActionLogEntry>,
}

impl FileReplayClient {
    /// Loads a capture written by [`FileReplayClient::write_capture`].
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        let bytes = std::fs::read(path)
            .map_err(|e| TransportError::Disconnected(format!("read {}: {e}", path.display())))?;
        let entries: Vec<ActionLogEntry> = bincode::deserialize(&bytes)
            .map_err(|e| TransportError::Malformed(format!("decode {}: {e}", path.display())))?;

        tracing::info!(
            "Replaying {} captured log entries from {}",
            entries.len(),
            path.display()
        );
        Ok(FileReplayClient { entries })
    }

    /// Client over an in-memory entry list.
    pub fn from_entries(entries: Vec<ActionLogEntry>) -> Self {
        FileReplayClient { entries }
    }

    /// Writes a capture file that [`FileReplayClient::open`] can load.
    pub fn write_capture(path: &Path, entries: &[ActionLogEntry]) -> Result<(), TransportError> {
        let bytes = bincode::serialize(entries)
            .map_err(|e| TransportError::Malformed(format!("encode capture: {e}")))?;
        std::fs::write(path, bytes)
            .map_err(|e| TransportError::Disconnected(format!("write {}: {e}", path.display())))
    }

    /// Number of captured entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ActionLogClient for FileReplayClient {
    async fn fetch(&self, request: LogFetchRequest) -> Result<LogPage, TransportError> {
        let actions = self
            .entries
            .iter()
            .filter(|entry| entry.global_index >= request.start_index)
            .take(request.max_count as usize)
            .cloned()
            .collect();
        Ok(LogPage { actions })
    }
}

#[async_trait]
impl UpdateBroadcaster for FileReplayClient {
    async fn broadcast_storage_update(
        &self,
        _command: StorageUpdateCommand,
    ) -> Result<BroadcastOutcome, TransportError> {
        Err(TransportError::Unexpected(
            "a captured log cannot accept storage updates".to_string(),
        ))
    }
}
