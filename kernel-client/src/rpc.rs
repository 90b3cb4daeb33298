//! Chain RPC transport seam
//!
//! The engine only needs four capabilities from the chain node. They are
//! expressed as a trait so the orchestrator can run against the JSON-RPC
//! client in production and against scripted transports in tests.

use async_trait::async_trait;
use chain_clients_near::{FinalExecutionOutcome, NearRpcClient, PublicKey, RpcServerError};
use serde::de::DeserializeOwned;

use crate::error::{KernelError, KernelResult};

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Submits a signed transaction and waits for its terminal outcome.
    async fn send_transaction(&self, signed_tx_base64: &str) -> KernelResult<FinalExecutionOutcome>;

    /// Calls a contract view method and returns the raw result bytes.
    async fn view_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> KernelResult<Vec<u8>>;

    /// Hash of a recent final block, used as the transaction's block reference.
    async fn latest_block_hash(&self) -> KernelResult<[u8; 32]>;

    /// Current nonce of an access key.
    async fn access_key_nonce(&self, account_id: &str, public_key: &PublicKey) -> KernelResult<u64>;
}

/// Calls a view method and decodes its JSON result.
pub async fn view_json<T: DeserializeOwned>(
    rpc: &dyn ChainRpc,
    contract_id: &str,
    method_name: &str,
    args: &serde_json::Value,
) -> KernelResult<T> {
    let bytes = rpc.view_call(contract_id, method_name, args).await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        KernelError::invalid_response(format!("{}.{}", contract_id, method_name), e)
    })
}

/// Maps a chain-client error onto the engine's taxonomy: node-side rejections
/// become `Rpc`, everything else (connectivity, node timeouts) is transient.
fn classify_rpc_error(error: anyhow::Error) -> KernelError {
    let server_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RpcServerError>())
        .cloned();

    match server_error {
        Some(server) if !server.is_timeout() => KernelError::Rpc {
            name: server.cause.unwrap_or(server.name),
            message: server.message,
        },
        _ => KernelError::Transport(error),
    }
}

#[async_trait]
impl ChainRpc for NearRpcClient {
    async fn send_transaction(&self, signed_tx_base64: &str) -> KernelResult<FinalExecutionOutcome> {
        self.send_tx(signed_tx_base64).await.map_err(classify_rpc_error)
    }

    async fn view_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> KernelResult<Vec<u8>> {
        self.view_function(contract_id, method_name, args)
            .await
            .map_err(classify_rpc_error)
    }

    async fn latest_block_hash(&self) -> KernelResult<[u8; 32]> {
        NearRpcClient::latest_block_hash(self)
            .await
            .map_err(classify_rpc_error)
    }

    async fn access_key_nonce(&self, account_id: &str, public_key: &PublicKey) -> KernelResult<u64> {
        self.view_access_key(account_id, public_key)
            .await
            .map(|view| view.nonce)
            .map_err(classify_rpc_error)
    }
}
