//! JSON-RPC chain client.
//!
//! Requires a companion signing relay in front of the node. A stock node
//! exposes neither `relay_submit` nor `relay_watch`; the relay holds the
//! sender's keys, signs and submits extrinsics, and buffers their status
//! events for polling. Methods used:
//!
//! - `system_health`: liveness check used when connecting
//! - `system_account [address]`: `{ "data": { "free": "<raw>" } }`
//! - `relay_submit { signer, call }`: `{ "submission": "<id>" }`
//! - `relay_watch [id]`: `{ "events": [TxStatus, ...], "done": bool }`,
//!   returning only the events not yet delivered for that submission
//!
//! The client only forwards the sender's key reference. A failed
//! `relay_watch` poll is retried on the next interval; the caller bounds
//! the overall wait.

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vestdrop_types::{amount, Amount, Call, TxStatus};

use crate::client::{ChainClient, SenderAccount, TxStatusStream};
use crate::error::ChainError;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Transport ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Clone)]
struct RpcTransport {
    http: reqwest::Client,
    node_url: Arc<str>,
    next_id: Arc<AtomicU64>,
}

impl RpcTransport {
    fn new(node_url: &str) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Send a request and return its `result` field.
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(id, method, params);

        let response = self
            .http
            .post(&*self.node_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ChainError::Connection(e.to_string())
                } else {
                    ChainError::InvalidResponse(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::InvalidResponse(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("invalid JSON response: {e}")))?;

        parse_response(json)
    }
}

fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

fn parse_response(mut json: Value) -> Result<Value, ChainError> {
    if let Some(err) = json.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ChainError::Rpc { code, message });
    }
    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(ChainError::InvalidResponse("missing result field".into())),
    }
}

// ── Response shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    data: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    #[serde(with = "amount::as_raw")]
    free: Amount,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    submission: String,
}

#[derive(Debug, Deserialize)]
struct WatchResult {
    #[serde(default)]
    events: Vec<TxStatus>,
    #[serde(default)]
    done: bool,
}

// ── Client ──────────────────────────────────────────────────────────────

/// Chain client backed by a node's JSON-RPC endpoint.
#[derive(Clone)]
pub struct RpcChainClient {
    transport: RpcTransport,
    poll_interval: Duration,
}

impl RpcChainClient {
    /// Connect to `node_url` and verify the node answers a health check.
    pub async fn connect(node_url: &str, poll_interval: Duration) -> Result<Self, ChainError> {
        let transport = RpcTransport::new(node_url)?;
        let health = transport
            .call("system_health", json!([]))
            .await
            .map_err(|e| ChainError::Connection(format!("{node_url}: {e}")))?;
        info!(node = node_url, %health, "connected to node");
        Ok(Self {
            transport,
            poll_interval,
        })
    }

    /// The configured node URL.
    pub fn node_url(&self) -> &str {
        &self.transport.node_url
    }
}

/// Where a [`Watch`] gets its event batches from.
trait WatchSource: Send + Sync + 'static {
    fn poll(&self, submission: &str) -> impl Future<Output = Result<WatchResult, ChainError>> + Send;
}

impl WatchSource for RpcTransport {
    async fn poll(&self, submission: &str) -> Result<WatchResult, ChainError> {
        let result = self.call("relay_watch", json!([submission])).await?;
        serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid watch response: {e}")))
    }
}

struct Watch<S> {
    source: S,
    submission: String,
    poll_interval: Duration,
    buffered: VecDeque<TxStatus>,
    done: bool,
    failed_polls: u64,
}

impl<S: WatchSource> Watch<S> {
    fn new(source: S, submission: String, poll_interval: Duration) -> Self {
        Self {
            source,
            submission,
            poll_interval,
            buffered: VecDeque::new(),
            done: false,
            failed_polls: 0,
        }
    }

    fn into_stream(self) -> TxStatusStream {
        stream::unfold(self, Self::next_event).boxed()
    }

    async fn next_event(mut self) -> Option<(TxStatus, Self)> {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return Some((event, self));
            }
            if self.done {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
            match self.source.poll(&self.submission).await {
                Ok(batch) => {
                    debug!(submission = %self.submission, events = batch.events.len(), done = batch.done, "polled");
                    self.buffered.extend(batch.events);
                    self.done = batch.done;
                }
                // The relay already accepted the transaction, so it may still land.
                Err(e) => {
                    self.failed_polls += 1;
                    warn!(
                        submission = %self.submission,
                        failed_polls = self.failed_polls,
                        "watch poll failed, retrying: {e}"
                    );
                }
            }
        }
    }
}

impl ChainClient for RpcChainClient {
    async fn free_balance(&self, account: &str) -> Result<Amount, ChainError> {
        let result = self
            .transport
            .call("system_account", json!([account]))
            .await?;
        let info: AccountInfoResult = serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid account response: {e}")))?;
        Ok(info.data.free)
    }

    async fn submit_and_watch(
        &self,
        sender: &SenderAccount,
        call: &Call,
    ) -> Result<TxStatusStream, ChainError> {
        let result = self
            .transport
            .call(
                "relay_submit",
                json!({ "signer": sender.signer(), "call": call }),
            )
            .await
            .map_err(|e| match e {
                ChainError::Rpc { message, .. } => ChainError::Submission(message),
                other => other,
            })?;
        let SubmitResult { submission } = serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid submit response: {e}")))?;
        debug!(%submission, call = call.name(), dest = call.dest(), "submitted");

        Ok(Watch::new(self.transport.clone(), submission, self.poll_interval).into_stream())
    }
}
