//! # Query Handler
//!
//! Transport-free read surface over the mirror stores. Front ends are out
//! of scope for this node, so queries arrive as a method name plus JSON
//! params and leave as JSON values; whatever gateway gets bolted on owns
//! the wire.
//!
//! Failures are structured (`{code, message}`, JSON-RPC style codes) and
//! never fatal: a bad query is the caller's problem, not the mirror's.

use mn_01_staged_store::{KeyValue, StoreError};
use mn_05_sync_engine::MirrorStores;
use mn_06_history_query::{FeedKind, HistoryError, HistoryQueryEngine};
use serde::Serialize;
use shared_types::{validate_address, RewardKind};
use thiserror::Error;
use tracing::{debug, warn};

/// A structured query failure, shaped for a JSON-RPC style front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Query failed ({code}): {message}")]
pub struct QueryError {
    pub code: i32,
    pub message: String,
}

impl QueryError {
    fn unknown_method(method: &str) -> Self {
        QueryError {
            code: -32601,
            message: format!("Unknown method: {}", method),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        QueryError {
            code: -32602,
            message: message.into(),
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(error: StoreError) -> Self {
        QueryError {
            code: -32000,
            message: format!("Store read failed: {}", error),
        }
    }
}

impl From<HistoryError> for QueryError {
    fn from(error: HistoryError) -> Self {
        match error {
            HistoryError::InvalidAddress(_) => QueryError::invalid_params(error.to_string()),
            HistoryError::Store(store) => store.into(),
        }
    }
}

/// Read-only queries over one mirror's store set.
pub struct QueryHandler<'a, B: KeyValue> {
    stores: &'a MirrorStores<B>,
    statistics_window: u64,
}

impl<'a, B: KeyValue> QueryHandler<'a, B> {
    pub fn new(stores: &'a MirrorStores<B>, statistics_window: u64) -> Self {
        QueryHandler {
            stores,
            statistics_window,
        }
    }

    /// Routes one query by method name.
    pub fn handle(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, QueryError> {
        debug!("Handling query {}", method);
        match method {
            "get_balance" => self.get_balance(params),
            "get_history" => self.get_history(params),
            "get_sync_status" => self.get_sync_status(),
            "get_tracked_accounts" => self.get_tracked_accounts(),
            "get_file_status" => self.get_file_status(params),
            "get_stored_files" => self.get_stored_files(params),
            "get_channel_contents" => self.get_channel_contents(params),
            _ => {
                warn!("Unknown query method {:?}", method);
                Err(QueryError::unknown_method(method))
            }
        }
    }

    fn get_balance(&self, params: &serde_json::Value) -> Result<serde_json::Value, QueryError> {
        let account = str_param(params, "account")?;
        validate_address(account).map_err(|e| QueryError::invalid_params(e.to_string()))?;
        let balance = self.stores.balances.balance(account)?;
        Ok(serde_json::json!({
            "account": account,
            "balance": balance.to_string(),
        }))
    }

    fn get_history(&self, params: &serde_json::Value) -> Result<serde_json::Value, QueryError> {
        let account = str_param(params, "account")?;
        let block_start = u64_param(params, "block_start")?;
        let block_count = u64_param(params, "block_count")?;
        let head_block = self.stores.chain_state.head_block_number()?.unwrap_or(0);

        let items = HistoryQueryEngine::account_history(
            &self.stores.account_log,
            account,
            block_start,
            block_count,
            head_block,
        )?;
        let items: Vec<_> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "kind": kind_label(item.kind),
                    "block_number": item.block_number,
                    "amount": item.amount.to_string(),
                    "fee": item.fee.to_string(),
                    "counterparty": item.counterparty,
                    "confirmations": item.confirmations,
                })
            })
            .collect();
        Ok(serde_json::json!({ "account": account, "items": items }))
    }

    fn get_sync_status(&self) -> Result<serde_json::Value, QueryError> {
        let state = &self.stores.chain_state;
        Ok(serde_json::json!({
            "next_index": state.next_index()?,
            "blocks_applied": state.block_count()?,
            "head_block": state.head_block_number()?,
        }))
    }

    fn get_tracked_accounts(&self) -> Result<serde_json::Value, QueryError> {
        let accounts = self.stores.chain_state.tracked_accounts()?;
        Ok(serde_json::json!({ "accounts": accounts }))
    }

    fn get_file_status(&self, params: &serde_json::Value) -> Result<serde_json::Value, QueryError> {
        let file_uri = str_param(params, "file_uri")?;
        let head_block = self.stores.chain_state.head_block_number()?.unwrap_or(0);
        Ok(serde_json::json!({
            "file_uri": file_uri,
            "replicas": self.stores.replication.replica_count(file_uri)?,
            "views_in_window": self.stores.statistics.views_in_window(
                file_uri,
                head_block,
                self.statistics_window,
            )?,
            "channel": self.stores.content.channel_of_file(file_uri)?,
        }))
    }

    fn get_stored_files(
        &self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, QueryError> {
        let storage_address = str_param(params, "storage_address")?;
        let files = self.stores.replication.stored_uris(storage_address)?;
        Ok(serde_json::json!({
            "storage_address": storage_address,
            "files": files,
        }))
    }

    fn get_channel_contents(
        &self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, QueryError> {
        let channel = str_param(params, "channel")?;
        let contents = match self.stores.content.channel_contents(channel)? {
            Some(contents) => contents,
            None => return Ok(serde_json::Value::Null),
        };
        let contents: Vec<_> = contents
            .contents
            .iter()
            .map(|(content_id, chain)| {
                let versions: Vec<_> = chain
                    .iter()
                    .map(|version| {
                        serde_json::json!({
                            "approved": version.approved,
                            "uris": version.content_units.keys().collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                serde_json::json!({ "content_id": content_id, "versions": versions })
            })
            .collect();
        Ok(serde_json::json!({ "channel": channel, "contents": contents }))
    }
}

fn str_param<'p>(params: &'p serde_json::Value, name: &str) -> Result<&'p str, QueryError> {
    params
        .get(name)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| QueryError::invalid_params(format!("Missing string param {:?}", name)))
}

fn u64_param(params: &serde_json::Value, name: &str) -> Result<u64, QueryError> {
    params
        .get(name)
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| QueryError::invalid_params(format!("Missing integer param {:?}", name)))
}

fn kind_label(kind: FeedKind) -> &'static str {
    match kind {
        FeedKind::Received => "received",
        FeedKind::Sent => "sent",
        FeedKind::Sponsored => "sponsored",
        FeedKind::SentFee => "sent_fee",
        FeedKind::ReceivedFee => "received_fee",
        FeedKind::Rewarded(RewardKind::Authority) => "rewarded_authority",
        FeedKind::Rewarded(RewardKind::Storage) => "rewarded_storage",
        FeedKind::Rewarded(RewardKind::Content) => "rewarded_content",
    }
}
