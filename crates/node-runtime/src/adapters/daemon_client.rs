//! TCP transport to the ledger daemon.
//!
//! One request, one response, over a single lazily dialed connection.
//! Frames are a 4-byte big-endian length followed by a bincode payload.
//! Any transport error drops the connection; the next call redials, and
//! the sync engine's discard-on-error contract covers the half-done cycle.

use async_trait::async_trait;
use mn_05_sync_engine::{
    ActionLogClient, BroadcastOutcome, LogFetchRequest, LogPage, StorageUpdateCommand,
    TransportError, UpdateBroadcaster,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Upper bound on one frame. Anything larger means a desynced stream.
const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Request frame payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonRequest {
    FetchLog(LogFetchRequest),
    BroadcastUpdate(StorageUpdateCommand),
}

/// Response frame payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonResponse {
    Log(LogPage),
    Broadcast(BroadcastOutcome),
}

impl DaemonResponse {
    fn label(&self) -> &'static str {
        match self {
            DaemonResponse::Log(_) => "log page",
            DaemonResponse::Broadcast(_) => "broadcast outcome",
        }
    }
}

/// Client for the daemon's log endpoint.
pub struct TcpDaemonClient {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpDaemonClient {
    /// Client for the daemon at `addr` (`host:port`). Connects on first use.
    pub fn new(addr: impl Into<String>) -> Self {
        TcpDaemonClient {
            addr: addr.into(),
            stream: Mutex::new(None),
        }
    }

    async fn exchange(&self, request: &DaemonRequest) -> Result<DaemonResponse, TransportError> {
        let mut guard = self.stream.lock().await;

        let stream = match guard.as_mut() {
            Some(stream) => stream,
            None => {
                let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
                    TransportError::Disconnected(format!("connect {}: {e}", self.addr))
                })?;
                tracing::debug!("Connected to daemon at {}", self.addr);
                guard.insert(stream)
            }
        };

        let result = Self::exchange_on(stream, request).await;
        if result.is_err() {
            // Drop the stream; a request may have half-left on it.
            *guard = None;
        }
        result
    }

    async fn exchange_on(
        stream: &mut TcpStream,
        request: &DaemonRequest,
    ) -> Result<DaemonResponse, TransportError> {
        let payload = bincode::serialize(request)
            .map_err(|e| TransportError::Malformed(format!("encode request: {e}")))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| TransportError::Malformed("request exceeds frame size".to_string()))?;

        stream.write_u32(len).await.map_err(disconnected)?;
        stream.write_all(&payload).await.map_err(disconnected)?;

        let len = stream.read_u32().await.map_err(disconnected)?;
        if len > MAX_FRAME_BYTES {
            return Err(TransportError::Malformed(format!(
                "daemon announced a {len} byte frame"
            )));
        }
        let mut payload = vec![0u8; len as usize];
        stream.read_exact(&mut payload).await.map_err(disconnected)?;

        bincode::deserialize(&payload)
            .map_err(|e| TransportError::Malformed(format!("decode response: {e}")))
    }
}

fn disconnected(e: std::io::Error) -> TransportError {
    TransportError::Disconnected(e.to_string())
}

#[async_trait]
impl ActionLogClient for TcpDaemonClient {
    async fn fetch(&self, request: LogFetchRequest) -> Result<LogPage, TransportError> {
        match self.exchange(&DaemonRequest::FetchLog(request)).await? {
            DaemonResponse::Log(page) => Ok(page),
            other => Err(TransportError::Unexpected(format!(
                "wanted a log page, got a {}",
                other.label()
            ))),
        }
    }
}

#[async_trait]
impl UpdateBroadcaster for TcpDaemonClient {
    async fn broadcast_storage_update(
        &self,
        command: StorageUpdateCommand,
    ) -> Result<BroadcastOutcome, TransportError> {
        match self.exchange(&DaemonRequest::BroadcastUpdate(command)).await? {
            DaemonResponse::Broadcast(outcome) => Ok(outcome),
            other => Err(TransportError::Unexpected(format!(
                "wanted a broadcast outcome, got a {}",
                other.label()
            ))),
        }
    }
}
