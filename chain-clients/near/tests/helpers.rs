//! Shared test helpers for NEAR client tests

#![allow(dead_code)]

use chain_clients_near::{Action, InMemorySigner, Transaction};

/// Dummy signer account
pub const DUMMY_SIGNER_ID: &str = "alice.near";

/// Dummy receiver account
pub const DUMMY_RECEIVER_ID: &str = "kernel.near";

/// Dummy 32-byte seed for the test keypair
pub const DUMMY_SEED: [u8; 32] = [7u8; 32];

/// Dummy block hash
pub const DUMMY_BLOCK_HASH: [u8; 32] = [1u8; 32];

/// Dummy transaction hash as returned by the node
pub const DUMMY_TX_HASH: &str = "9aY8mDvqAPMuJ3VXWxcX2WTGWn1sR6rUuyCquCDgNYB3";

pub fn dummy_signer() -> InMemorySigner {
    InMemorySigner::from_seed(DUMMY_SIGNER_ID, &DUMMY_SEED)
}

/// Transaction with one function call and one transfer action.
pub fn dummy_transaction() -> Transaction {
    let signer = dummy_signer();
    Transaction {
        signer_id: DUMMY_SIGNER_ID.to_string(),
        public_key: signer.public_key(),
        nonce: 42,
        receiver_id: DUMMY_RECEIVER_ID.to_string(),
        block_hash: DUMMY_BLOCK_HASH,
        actions: vec![
            Action::function_call(
                "create_proposal",
                &serde_json::json!({ "policy_id": "treasury" }),
                30_000_000_000_000,
                0,
            )
            .unwrap(),
            Action::Transfer { deposit: 1_000 },
        ],
    }
}

/// JSON-RPC success envelope around `result`.
pub fn rpc_result(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": "kernel-client", "result": result })
}

/// Minimal successful `send_tx` result with the given receipt logs.
pub fn final_outcome_json(logs: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "status": { "SuccessValue": "" },
        "transaction": {},
        "transaction_outcome": {
            "id": DUMMY_TX_HASH,
            "block_hash": "11111111111111111111111111111111",
            "outcome": {
                "logs": [],
                "receipt_ids": ["receipt-1"],
                "gas_burnt": 2428000000000u64,
                "executor_id": DUMMY_SIGNER_ID,
                "status": { "SuccessReceiptId": "receipt-1" }
            }
        },
        "receipts_outcome": [{
            "id": "receipt-1",
            "outcome": {
                "logs": logs,
                "receipt_ids": [],
                "executor_id": DUMMY_RECEIVER_ID,
                "status": { "SuccessValue": "" }
            }
        }]
    })
}
