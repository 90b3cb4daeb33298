//! Kernel Client
//!
//! Client-side engine for a policy-gated kernel contract: proposal
//! submission and voting, outcome classification, threshold signature
//! extraction, chain-signature finalization and NEAR Intents swaps.

pub mod builder;
pub mod chainsig;
pub mod config;
pub mod error;
pub mod intents;
pub mod outcome;
pub mod proposal;
pub mod rpc;
pub mod signature;
pub mod types;

// Re-export for convenience
pub use builder::{BuiltTransaction, ResolvedSigner, SignerDescriptor, TransactionBuilder};
pub use chainsig::{BroadcastReceipt, ChainFamily, ChainSigAdapter, NearChainSigAdapter};
pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use outcome::{classify, extract_proposal_id, extract_signatures, pick_ed25519, OutcomeClass};
pub use proposal::{ChainSigTransaction, KernelCallOptions, KernelClient, ProposalExecutionResult, SignedProposal};
pub use rpc::ChainRpc;
pub use signature::ThresholdSignature;
pub use types::{ChainSigPayload, Policy, Proposal, ProposalId, ProposalKind, ProposalStatus, SignatureScheme, Vote};
