//! JSON-RPC client for the execution-layer node

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::ExecutionSource;
use crate::block::{Block, RawBlock};
use crate::error::{ExplorerError, Result, Upstream};
use crate::transaction::{RawTransaction, Transaction, TxHash};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

pub struct JsonRpcExecutionClient {
    http: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl JsonRpcExecutionClient {
    /// Every call is bounded by `timeout`; hitting it counts as the upstream
    /// being unavailable.
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issues one JSON-RPC call. A `null` result comes back as `None`.
    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<R>> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        debug!(method, id, "execution.rpc");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExplorerError::from_transport(Upstream::Execution, e))?;

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ExplorerError::from_transport(Upstream::Execution, e))?;

        if let Some(error) = rpc_response.error {
            return Err(ExplorerError::unavailable(
                Upstream::Execution,
                format!("RPC error {}: {}", error.code, error.message),
            ));
        }

        match rpc_response.result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ExplorerError::malformed(Upstream::Execution, format!("{}: {}", method, e))),
        }
    }

    async fn block_by_tag(&self, tag: &str) -> Result<Option<Block>> {
        let raw: Option<RawBlock> = self
            .call("eth_getBlockByNumber", json!([tag, false]))
            .await?;
        raw.map(|raw| {
            Block::try_from(raw).map_err(|e| ExplorerError::malformed(Upstream::Execution, e))
        })
        .transpose()
    }
}

#[async_trait]
impl ExecutionSource for JsonRpcExecutionClient {
    async fn latest_block(&self) -> Result<Block> {
        self.block_by_tag("latest").await?.ok_or_else(|| {
            ExplorerError::malformed(Upstream::Execution, "node returned no latest block")
        })
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<Block>> {
        self.block_by_tag(&format!("0x{:x}", number)).await
    }

    async fn transaction(&self, hash: &TxHash) -> Result<Option<Transaction>> {
        let raw: Option<RawTransaction> = self
            .call("eth_getTransactionByHash", json!([hash.as_str()]))
            .await?;
        raw.map(|raw| {
            Transaction::try_from(raw).map_err(|e| ExplorerError::malformed(Upstream::Execution, e))
        })
        .transpose()
    }
}
