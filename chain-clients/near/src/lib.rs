//! NEAR chain client
//!
//! JSON-RPC transport, borsh transaction encoding, and execution outcome views
//! for NEAR-compatible chains.

pub mod client;
pub mod crypto;
pub mod signer;
pub mod transaction;
pub mod views;

// Re-export for convenience
pub use client::{NearRpcClient, RpcServerError};
pub use crypto::{PublicKey, Signature};
pub use signer::InMemorySigner;
pub use transaction::{
    AccessKey, AccessKeyPermission, Action, FunctionCallPermission, SignedTransaction, Transaction,
};
pub use views::{
    AccessKeyView, ExecutionOutcomeView, ExecutionOutcomeWithId, ExecutionStatus,
    FinalExecutionOutcome,
};
