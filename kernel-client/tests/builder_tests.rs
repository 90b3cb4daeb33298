//! Unit tests for the transaction builder

use chain_clients_near::{Action, Transaction};
use kernel_client::builder::DEFAULT_DERIVATION_CHAIN;
use kernel_client::types::methods;
use kernel_client::{KernelError, SignerDescriptor, TransactionBuilder};
use serde_json::json;
use std::sync::Arc;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    derived_account_json, derived_public_key, wallet_signer, ScriptedRpc, DUMMY_ACCOUNT_ID,
    DUMMY_BLOCK_HASH, DUMMY_DERIVATION_PATH, DUMMY_KERNEL_ID, DUMMY_NONCE, DUMMY_OTHER_ACCOUNT_ID,
};

fn builder(rpc: Arc<ScriptedRpc>) -> TransactionBuilder {
    TransactionBuilder::new(rpc, DUMMY_KERNEL_ID).with_wallet(DUMMY_ACCOUNT_ID, wallet_signer().public_key())
}

/// What is tested: Wallet signer uses the local key, nonce + 1 and the latest block hash
/// Why: A stale or reused nonce makes the node reject the transaction
#[tokio::test]
async fn test_build_with_wallet_signer() {
    let rpc = Arc::new(ScriptedRpc::new());
    let built = builder(rpc.clone())
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![Action::Transfer { deposit: 5 }],
            &SignerDescriptor::Wallet,
        )
        .await
        .unwrap();

    assert_eq!(built.transaction.signer_id, DUMMY_ACCOUNT_ID);
    assert_eq!(built.transaction.public_key, wallet_signer().public_key());
    assert_eq!(built.transaction.nonce, DUMMY_NONCE + 1);
    assert_eq!(built.transaction.block_hash, DUMMY_BLOCK_HASH);
    assert_eq!(built.transaction.receiver_id, DUMMY_OTHER_ACCOUNT_ID);

    let lookups = rpc.nonce_lookups.lock().unwrap();
    assert_eq!(lookups.as_slice(), &[(DUMMY_ACCOUNT_ID.to_string(), wallet_signer().public_key())]);
}

/// What is tested: encoded_base64 and hash describe exactly the returned transaction
/// Why: The kernel signs what it decodes from encoded_base64
#[tokio::test]
async fn test_build_encoding_matches_transaction() {
    let rpc = Arc::new(ScriptedRpc::new());
    let built = builder(rpc)
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![Action::Transfer { deposit: 5 }],
            &SignerDescriptor::Wallet,
        )
        .await
        .unwrap();

    assert_eq!(Transaction::from_base64(&built.encoded_base64).unwrap(), built.transaction);
    assert_eq!(built.hash, built.transaction.hash_base58().unwrap());
}

/// What is tested: ChainSig signer resolves account and key through the kernel view
/// Why: Derived accounts exist only as kernel-side derivations
#[tokio::test]
async fn test_build_with_chain_sig_signer() {
    let rpc = Arc::new(ScriptedRpc::new());
    rpc.push_view(methods::DERIVED_ADDRESS_AND_PUBLIC_KEY, derived_account_json());

    let built = builder(rpc.clone())
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![Action::Transfer { deposit: 5 }],
            &SignerDescriptor::ChainSig {
                derivation_path: DUMMY_DERIVATION_PATH.to_string(),
                network: None,
            },
        )
        .await
        .unwrap();

    let derived_key = derived_public_key();
    assert_eq!(built.transaction.signer_id, derived_key.implicit_account_id().unwrap());
    assert_eq!(built.transaction.public_key, derived_key);
    assert_eq!(built.transaction.nonce, DUMMY_NONCE + 1);

    let calls = rpc.view_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, DUMMY_KERNEL_ID);
    assert_eq!(
        calls[0].2,
        json!({ "path": DUMMY_DERIVATION_PATH, "chain": DEFAULT_DERIVATION_CHAIN })
    );
}

/// What is tested: Explicit signer data is used without any RPC lookup
/// Why: Callers that already know the key state skip the round trip
#[tokio::test]
async fn test_build_with_explicit_signer() {
    let rpc = Arc::new(ScriptedRpc::new());
    let built = builder(rpc.clone())
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![],
            &SignerDescriptor::Explicit {
                signer_id: "carol.near".to_string(),
                public_key: derived_public_key(),
                nonce: 99,
            },
        )
        .await
        .unwrap();

    assert_eq!(built.transaction.signer_id, "carol.near");
    assert_eq!(built.transaction.nonce, 100);
    assert!(rpc.nonce_lookups.lock().unwrap().is_empty());
}

/// What is tested: Wallet descriptor without a configured wallet fails
/// Why: Falling back to another account would sign as the wrong party
#[tokio::test]
async fn test_wallet_signer_requires_wallet() {
    let rpc = Arc::new(ScriptedRpc::new());
    let error = TransactionBuilder::new(rpc, DUMMY_KERNEL_ID)
        .build(DUMMY_OTHER_ACCOUNT_ID, vec![], &SignerDescriptor::Wallet)
        .await
        .unwrap_err();

    assert!(matches!(error, KernelError::Config(_)));
}

/// What is tested: A failing derivation view propagates unchanged
/// Why: The builder does not retry or mask chain errors
#[tokio::test]
async fn test_chain_sig_lookup_failure_propagates() {
    let rpc = Arc::new(ScriptedRpc::new());
    let error = builder(rpc)
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![],
            &SignerDescriptor::ChainSig {
                derivation_path: DUMMY_DERIVATION_PATH.to_string(),
                network: Some("near".to_string()),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(error, KernelError::Rpc { .. }));
}

/// What is tested: An explicit nonce at u64::MAX fails with NonceExhausted instead of overflowing
/// Why: Caller-supplied nonces are not validated anywhere else
#[tokio::test]
async fn test_explicit_nonce_overflow() {
    let rpc = Arc::new(ScriptedRpc::new());
    let error = builder(rpc)
        .build(
            DUMMY_OTHER_ACCOUNT_ID,
            vec![],
            &SignerDescriptor::Explicit {
                signer_id: "carol.near".to_string(),
                public_key: derived_public_key(),
                nonce: u64::MAX,
            },
        )
        .await
        .unwrap_err();

    match error {
        KernelError::NonceExhausted { account_id } => assert_eq!(account_id, "carol.near"),
        other => panic!("expected NonceExhausted, got {:?}", other),
    }
}
