//! Solver Relay and Bridge Client
//!
//! JSON-RPC 2.0 over HTTP. The solver relay serves `quote` and
//! `publish_intent`; the bridge serves `deposit_address`.
//!
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "method": "quote", "params": [{ ... }]}
//! ```

use anyhow::Context;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{KernelError, KernelResult};
use crate::intents::message::SignedNep413;

const SOLVER_RELAY: &str = "solver relay";
const BRIDGE: &str = "bridge";

// ============================================================================
// REQUEST / RESPONSE STRUCTURES
// ============================================================================

/// Parameters of `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRequest {
    pub defuse_asset_identifier_in: String,
    pub defuse_asset_identifier_out: String,
    pub exact_amount_in: String,
    pub min_deadline_ms: u64,
}

/// A solver's offer for an asset pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentsSwapQuote {
    pub quote_hash: String,
    pub defuse_asset_identifier_in: String,
    pub defuse_asset_identifier_out: String,
    pub amount_in: String,
    pub amount_out: String,
    /// RFC 3339 timestamp after which solvers drop the quote
    pub expiration_time: String,
}

#[derive(Debug, Clone, Serialize)]
struct PublishIntentParams<'a> {
    quote_hashes: &'a [String],
    signed_data: &'a SignedNep413,
}

#[derive(Debug, Clone, Deserialize)]
struct PublishIntentResult {
    status: String,
    #[serde(default)]
    intent_hash: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Where to send funds so they show up in an intents account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAddress {
    pub address: String,
    pub chain: String,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: [P; 1],
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<serde_json::Value>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// HTTP client for the solver relay and bridge services.
#[derive(Debug, Clone)]
pub struct SolverRelayClient {
    client: Client,
    relay_url: String,
    bridge_url: String,
}

impl SolverRelayClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `relay_url` - Solver relay JSON-RPC endpoint
    /// * `bridge_url` - Bridge JSON-RPC endpoint
    pub fn new(relay_url: impl Into<String>, bridge_url: impl Into<String>) -> KernelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")
            .map_err(KernelError::Transport)?;

        Ok(Self {
            client,
            relay_url: relay_url.into(),
            bridge_url: bridge_url.into(),
        })
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        method: &str,
        params: P,
    ) -> KernelResult<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params: [params],
        };

        debug!("{} {} -> {}", service, method, url);

        let http_response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, service))
            .map_err(KernelError::Transport)?;

        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response from {}", method, service))
            .map_err(KernelError::Transport)?;

        if !status.is_success() {
            return Err(KernelError::RemoteRejected {
                service: service.to_string(),
                reason: format!("{} returned HTTP {}: {}", method, status, body.trim()),
            });
        }

        let response: JsonRpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| KernelError::invalid_response(format!("{} {}", service, method), e))?;

        if let Some(error) = response.error {
            return Err(KernelError::RemoteRejected {
                service: service.to_string(),
                reason: format!("{} failed: {}", method, error),
            });
        }

        Ok(response.result)
    }

    /// Asks solvers for quotes.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<IntentsSwapQuote>)` - Offers, possibly empty
    /// * `Err(KernelError)` - Relay unreachable or rejected the request
    pub async fn quote(&self, request: &QuoteRequest) -> KernelResult<Vec<IntentsSwapQuote>> {
        let quotes: Option<Vec<IntentsSwapQuote>> = self
            .call(SOLVER_RELAY, &self.relay_url, "quote", request)
            .await?;
        let quotes = quotes.unwrap_or_default();
        debug!(
            "Received {} quote(s) for {} -> {}",
            quotes.len(),
            request.defuse_asset_identifier_in,
            request.defuse_asset_identifier_out
        );
        Ok(quotes)
    }

    /// Best quote (highest `amount_out`) for an exact input amount.
    pub async fn best_quote(&self, request: &QuoteRequest) -> KernelResult<IntentsSwapQuote> {
        self.quote(request)
            .await?
            .into_iter()
            .filter_map(|quote| quote.amount_out.parse::<u128>().ok().map(|out| (out, quote)))
            .max_by_key(|(out, _)| *out)
            .map(|(_, quote)| quote)
            .ok_or_else(|| KernelError::NoQuoteAvailable {
                asset_in: request.defuse_asset_identifier_in.clone(),
                asset_out: request.defuse_asset_identifier_out.clone(),
            })
    }

    /// Publishes a signed intent for the given quotes and returns its hash.
    pub async fn publish_intent(
        &self,
        quote_hashes: &[String],
        signed_data: &SignedNep413,
    ) -> KernelResult<String> {
        let result: Option<PublishIntentResult> = self
            .call(
                SOLVER_RELAY,
                &self.relay_url,
                "publish_intent",
                PublishIntentParams {
                    quote_hashes,
                    signed_data,
                },
            )
            .await?;

        let result = result.ok_or_else(|| {
            KernelError::invalid_response("solver relay publish_intent", "missing result")
        })?;

        match (result.status.as_str(), result.intent_hash) {
            ("OK", Some(intent_hash)) if !intent_hash.is_empty() => {
                info!("Published intent {}", intent_hash);
                Ok(intent_hash)
            }
            (status, _) => Err(KernelError::RemoteRejected {
                service: SOLVER_RELAY.to_string(),
                reason: format!(
                    "publish_intent status {}: {}",
                    status,
                    result.reason.unwrap_or_else(|| "no reason given".to_string())
                ),
            }),
        }
    }

    /// Deposit address for `account_id` on `chain` (e.g. "eth:1").
    pub async fn deposit_address(&self, account_id: &str, chain: &str) -> KernelResult<DepositAddress> {
        let result: Option<DepositAddress> = self
            .call(
                BRIDGE,
                &self.bridge_url,
                "deposit_address",
                serde_json::json!({ "account_id": account_id, "chain": chain }),
            )
            .await?;
        result.ok_or_else(|| KernelError::invalid_response("bridge deposit_address", "missing result"))
    }
}
