//! NEAR JSON-RPC Client
//!
//! Thin async client over the node's JSON-RPC endpoint: transaction submission,
//! contract view calls, access key lookups, and the latest block reference.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::crypto::PublicKey;
use crate::transaction::SignedTransaction;
use crate::views::{AccessKeyView, BlockView, CallFunctionView, FinalExecutionOutcome};

/// JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<JsonRpcErrorCause>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorCause {
    name: String,
    #[serde(default)]
    info: Option<serde_json::Value>,
}

/// Error envelope returned by the node.
///
/// Kept as a concrete type inside the `anyhow::Error` chain so callers can
/// tell a node-side rejection apart from a connectivity failure with
/// `downcast_ref::<RpcServerError>()`.
#[derive(Debug, Clone, Error)]
#[error("NEAR RPC error {name}: {message}")]
pub struct RpcServerError {
    /// Error class, e.g. `HANDLER_ERROR`, `REQUEST_VALIDATION_ERROR`
    pub name: String,
    /// Cause name, e.g. `INVALID_TRANSACTION`, `TIMEOUT_ERROR`
    pub cause: Option<String>,
    /// Human readable message including cause details
    pub message: String,
}

impl RpcServerError {
    fn from_body(body: JsonRpcErrorBody) -> Self {
        let cause = body.cause.as_ref().map(|c| c.name.clone());
        let mut message = body.message;
        if let Some(info) = body.cause.and_then(|c| c.info) {
            message = format!("{} ({})", message, info);
        } else if let Some(data) = body.data {
            message = format!("{} ({})", message, data);
        }
        Self {
            name: body.name.unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
            cause,
            message,
        }
    }

    /// The node gave up waiting for the transaction; it may still land.
    pub fn is_timeout(&self) -> bool {
        self.cause.as_deref() == Some("TIMEOUT_ERROR") || self.name == "TIMEOUT_ERROR"
    }
}

/// Client for a NEAR JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct NearRpcClient {
    /// HTTP client for JSON-RPC calls
    client: Client,
    /// RPC endpoint URL
    rpc_url: String,
}

impl NearRpcClient {
    /// Creates a new RPC client
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - JSON-RPC endpoint (e.g. "https://rpc.mainnet.near.org")
    ///
    /// # Returns
    ///
    /// * `Ok(NearRpcClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to create HTTP client
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Sends one JSON-RPC request and unwraps the response envelope.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "kernel-client",
            method,
            params,
        };

        tracing::trace!("NEAR RPC {} -> {}", method, self.rpc_url);

        let http_response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", method))?;

        let response: JsonRpcResponse<T> = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                anyhow::bail!("{} failed: HTTP {} - {}", method, status, body.trim())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to parse {} response", method))
            }
        };

        if let Some(error) = response.error {
            return Err(RpcServerError::from_body(error).into());
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("{} response has neither result nor error", method))
    }

    /// Submits a signed transaction and waits until it is final.
    ///
    /// # Arguments
    ///
    /// * `signed_tx_base64` - Borsh-encoded signed transaction, base64
    ///
    /// # Returns
    ///
    /// * `Ok(FinalExecutionOutcome)` - Execution trace (may still contain failures)
    /// * `Err(anyhow::Error)` - Connectivity failure or node-side rejection
    pub async fn send_tx(&self, signed_tx_base64: &str) -> Result<FinalExecutionOutcome> {
        self.call(
            "send_tx",
            serde_json::json!({
                "signed_tx_base64": signed_tx_base64,
                "wait_until": "FINAL",
            }),
        )
        .await
    }

    /// Convenience wrapper around [`send_tx`](Self::send_tx).
    pub async fn send_signed(&self, signed: &SignedTransaction) -> Result<FinalExecutionOutcome> {
        self.send_tx(&signed.to_base64()?).await
    }

    /// Calls a contract view method at the final block.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Raw return bytes
    /// * `Err(anyhow::Error)` - RPC failure or contract panic
    pub async fn view_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>> {
        let args = serde_json::to_vec(args).context("Failed to encode view args")?;
        let view: CallFunctionView = self
            .call(
                "query",
                serde_json::json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method_name,
                    "args_base64": STANDARD.encode(args),
                }),
            )
            .await
            .with_context(|| format!("View call {}.{} failed", contract_id, method_name))?;

        if let Some(error) = view.error {
            return Err(RpcServerError {
                name: "CONTRACT_EXECUTION_ERROR".to_string(),
                cause: None,
                message: error,
            }
            .into());
        }

        for log in &view.logs {
            tracing::debug!("{}.{} log: {}", contract_id, method_name, log);
        }

        Ok(view.result)
    }

    /// Looks up an access key at the final block.
    pub async fn view_access_key(&self, account_id: &str, public_key: &PublicKey) -> Result<AccessKeyView> {
        self.call(
            "query",
            serde_json::json!({
                "request_type": "view_access_key",
                "finality": "final",
                "account_id": account_id,
                "public_key": public_key.to_string(),
            }),
        )
        .await
        .with_context(|| format!("Access key lookup for {} failed", account_id))
    }

    /// Hash of the latest final block.
    pub async fn latest_block_hash(&self) -> Result<[u8; 32]> {
        let block: BlockView = self
            .call("block", serde_json::json!({ "finality": "final" }))
            .await?;

        tracing::debug!("Latest final block {} ({})", block.header.height, block.header.hash);

        let bytes = bs58::decode(&block.header.hash)
            .into_vec()
            .context("Failed to decode block hash from base58")?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid block hash length: {}", bytes.len()))
    }
}
