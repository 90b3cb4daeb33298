//! Shared test helpers for kernel client tests
//!
//! Constants, execution outcome builders and a scripted in-memory chain
//! transport.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_clients_common::RetryPolicy;
use chain_clients_near::{
    ExecutionOutcomeView, ExecutionOutcomeWithId, ExecutionStatus, FinalExecutionOutcome,
    InMemorySigner, PublicKey,
};
use kernel_client::{ChainRpc, KernelCallOptions, KernelClient, KernelError, KernelResult};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Wallet account that submits proposals
pub const DUMMY_ACCOUNT_ID: &str = "alice.near";

/// Another kernel member
pub const DUMMY_OTHER_ACCOUNT_ID: &str = "bob.near";

/// Kernel contract
pub const DUMMY_KERNEL_ID: &str = "kernel.near";

/// Intents contract
pub const DUMMY_INTENTS_ID: &str = "intents.near";

/// Policy id
pub const DUMMY_POLICY_ID: &str = "treasury";

/// Proposal description used by `proposal_json`
pub const DUMMY_DESCRIPTION: &str = "pay bob";

/// Wallet key seed
pub const DUMMY_WALLET_SEED: [u8; 32] = [3u8; 32];

/// Seed of the key the kernel derives for chain signatures
pub const DUMMY_DERIVED_SEED: [u8; 32] = [9u8; 32];

/// Derivation path
pub const DUMMY_DERIVATION_PATH: &str = "swap,1";

/// Block hash returned by the scripted transport
pub const DUMMY_BLOCK_HASH: [u8; 32] = [4u8; 32];

/// Access key nonce returned by the scripted transport
pub const DUMMY_NONCE: u64 = 41;

/// Transaction hash reported in scripted outcomes
pub const DUMMY_TX_HASH: &str = "FxAm3KHmyp5Q5yNbnvn6RyHbHXnFQHSkzK6pu6zV8F9M";

/// Asset identifiers
pub const DUMMY_ASSET_IN: &str = "nep141:wrap.near";
pub const DUMMY_ASSET_OUT: &str = "nep141:usdc.near";

// ============================================================================
// KEYS
// ============================================================================

pub fn wallet_signer() -> InMemorySigner {
    InMemorySigner::from_seed(DUMMY_ACCOUNT_ID, &DUMMY_WALLET_SEED)
}

/// Signer standing in for the chain-signature service's derived key.
pub fn derived_signer() -> InMemorySigner {
    let key = InMemorySigner::from_seed("derived", &DUMMY_DERIVED_SEED).public_key();
    InMemorySigner::from_seed(derived_address(&key), &DUMMY_DERIVED_SEED)
}

pub fn derived_public_key() -> PublicKey {
    derived_signer().public_key()
}

fn derived_address(key: &PublicKey) -> String {
    key.implicit_account_id().unwrap()
}

/// `derived_address_and_public_key` view result for the derived key.
pub fn derived_account_json() -> Value {
    let key = derived_public_key();
    json!({ "address": derived_address(&key), "public_key": key.to_string() })
}

// ============================================================================
// OUTCOME BUILDERS
// ============================================================================

/// `EVENT_JSON:` log line for a kernel event.
pub fn event_log(event: &str, proposal_id: Value) -> String {
    format!(
        "EVENT_JSON:{}",
        json!({
            "standard": "kernel",
            "version": "1.0.0",
            "event": event,
            "data": [{ "proposal_id": proposal_id }]
        })
    )
}

/// Successful outcome whose kernel receipt emitted `logs` and returned `return_value`.
pub fn outcome(logs: &[String], return_value: Option<&[u8]>) -> FinalExecutionOutcome {
    let return_status =
        ExecutionStatus::SuccessValue(STANDARD.encode(return_value.unwrap_or_default()));
    FinalExecutionOutcome {
        status: return_status.clone(),
        transaction_outcome: ExecutionOutcomeWithId {
            id: DUMMY_TX_HASH.to_string(),
            outcome: ExecutionOutcomeView {
                logs: vec![],
                receipt_ids: vec!["receipt-1".to_string()],
                executor_id: DUMMY_ACCOUNT_ID.to_string(),
                status: ExecutionStatus::SuccessReceiptId("receipt-1".to_string()),
            },
        },
        receipts_outcome: vec![ExecutionOutcomeWithId {
            id: "receipt-1".to_string(),
            outcome: ExecutionOutcomeView {
                logs: logs.to_vec(),
                receipt_ids: vec![],
                executor_id: DUMMY_KERNEL_ID.to_string(),
                status: return_status,
            },
        }],
    }
}

/// Outcome of a proposal that stays pending.
pub fn pending_outcome(proposal_id: u64) -> FinalExecutionOutcome {
    outcome(&[event_log("proposal_created", json!(proposal_id))], None)
}

/// Outcome of a proposal that executed and returned `signature` from the signer.
pub fn executed_outcome(proposal_id: u64, signature: Option<&[u8; 64]>) -> FinalExecutionOutcome {
    let logs = vec![
        event_log("proposal_created", json!(proposal_id)),
        event_log("proposal_executed", json!(proposal_id)),
    ];
    let return_value = signature.map(|sig| {
        serde_json::to_vec(&json!({ "scheme": "Ed25519", "signature": sig.to_vec() })).unwrap()
    });
    outcome(&logs, return_value.as_deref())
}

/// Outcome whose kernel receipt failed.
pub fn failed_outcome() -> FinalExecutionOutcome {
    let mut failed = outcome(&[], None);
    let failure = ExecutionStatus::Failure(json!({ "ActionError": { "index": 0 } }));
    failed.status = failure.clone();
    failed.receipts_outcome[0].outcome.status = failure;
    failed
}

/// `get_proposal` view result.
pub fn proposal_json(proposal_id: u64, proposer: &str, status: &str, approvals: &[&str]) -> Value {
    json!({
        "id": proposal_id,
        "proposer": proposer,
        "policy_id": DUMMY_POLICY_ID,
        "description": DUMMY_DESCRIPTION,
        "kind": { "Transfer": { "receiver_id": DUMMY_OTHER_ACCOUNT_ID, "amount": "1000" } },
        "status": status,
        "approvals": approvals,
        "rejections": [],
        "required_votes": 2
    })
}

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// In-memory `ChainRpc` answering from scripted queues.
///
/// View results are queued per method name; the last queued value keeps
/// being returned once the queue is drained to one entry. A `None` entry
/// answers with a transport failure.
pub struct ScriptedRpc {
    send_results: Mutex<VecDeque<KernelResult<FinalExecutionOutcome>>>,
    views: Mutex<HashMap<String, VecDeque<Option<Value>>>>,
    /// Every submitted signed transaction (base64), in order
    pub sent: Mutex<Vec<String>>,
    /// Every view call as (contract, method, args), in order
    pub view_calls: Mutex<Vec<(String, String, Value)>>,
    /// Every access key lookup as (account, key), in order
    pub nonce_lookups: Mutex<Vec<(String, PublicKey)>>,
}

impl ScriptedRpc {
    pub fn new() -> Self {
        Self {
            send_results: Mutex::new(VecDeque::new()),
            views: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            view_calls: Mutex::new(Vec::new()),
            nonce_lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn push_send(&self, result: KernelResult<FinalExecutionOutcome>) -> &Self {
        self.send_results.lock().unwrap().push_back(result);
        self
    }

    pub fn push_view(&self, method: &str, value: Value) -> &Self {
        self.push_view_entry(method, Some(value))
    }

    /// Queues a transport failure for the next `method` view.
    pub fn push_view_transport_error(&self, method: &str) -> &Self {
        self.push_view_entry(method, None)
    }

    fn push_view_entry(&self, method: &str, entry: Option<Value>) -> &Self {
        self.views
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(entry);
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn view_count(&self, method: &str) -> usize {
        self.view_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == method)
            .count()
    }
}

#[async_trait]
impl ChainRpc for ScriptedRpc {
    async fn send_transaction(&self, signed_tx_base64: &str) -> KernelResult<FinalExecutionOutcome> {
        self.sent.lock().unwrap().push(signed_tx_base64.to_string());
        self.send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(KernelError::Transport(anyhow::anyhow!("no scripted outcome"))))
    }

    async fn view_call(&self, contract_id: &str, method_name: &str, args: &Value) -> KernelResult<Vec<u8>> {
        self.view_calls.lock().unwrap().push((
            contract_id.to_string(),
            method_name.to_string(),
            args.clone(),
        ));
        let mut views = self.views.lock().unwrap();
        let queue = views.get_mut(method_name).ok_or_else(|| KernelError::Rpc {
            name: "METHOD_NOT_FOUND".to_string(),
            message: format!("no scripted view for {}", method_name),
        })?;
        let entry = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        match entry {
            Some(value) => Ok(serde_json::to_vec(&value).unwrap()),
            None => Err(KernelError::Transport(anyhow::anyhow!("connection reset"))),
        }
    }

    async fn latest_block_hash(&self) -> KernelResult<[u8; 32]> {
        Ok(DUMMY_BLOCK_HASH)
    }

    async fn access_key_nonce(&self, account_id: &str, public_key: &PublicKey) -> KernelResult<u64> {
        self.nonce_lookups
            .lock()
            .unwrap()
            .push((account_id.to_string(), public_key.clone()));
        Ok(DUMMY_NONCE)
    }
}

/// Kernel client over `rpc` with a fast retry policy.
pub fn kernel_client(rpc: Arc<ScriptedRpc>) -> KernelClient {
    let options = KernelCallOptions {
        contract_id: DUMMY_KERNEL_ID.to_string(),
        gas: 300_000_000_000_000,
        deposit: 0,
    };
    KernelClient::new(rpc, wallet_signer(), options)
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(10)))
}
