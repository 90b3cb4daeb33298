//! Kernel contract types
//!
//! JSON shapes of the kernel's call arguments and view results. Amounts and
//! gas are carried as decimal strings, matching the contract's JSON ABI.

use chain_clients_near::PublicKey;
use serde::{Deserialize, Serialize};

pub type ProposalId = u64;

/// Kernel contract method names.
pub mod methods {
    pub const CREATE_PROPOSAL: &str = "create_proposal";
    pub const VOTE_ON_PROPOSAL: &str = "vote_on_proposal";
    pub const CANCEL_PROPOSAL: &str = "cancel_proposal";
    pub const GET_PROPOSAL: &str = "get_proposal";
    pub const GET_LAST_PROPOSAL_ID: &str = "get_last_proposal_id";
    pub const GET_POLICY: &str = "get_policy";
    pub const DERIVED_ADDRESS_AND_PUBLIC_KEY: &str = "derived_address_and_public_key";
}

// ============================================================================
// PROPOSAL REQUESTS
// ============================================================================

/// What a proposal asks the kernel to do once its policy is satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Native token transfer from the kernel account
    Transfer { receiver_id: String, amount: String },
    /// Function calls from the kernel account
    FunctionCall {
        receiver_id: String,
        actions: Vec<FunctionCallSpec>,
    },
    /// Chain-signature request for a derived account
    ChainSig {
        derivation_path: String,
        payload: ChainSigPayload,
    },
    /// Replace a policy
    ChangePolicy { policy: Policy },
}

impl ProposalKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalKind::Transfer { .. } => "transfer",
            ProposalKind::FunctionCall { .. } => "function_call",
            ProposalKind::ChainSig { .. } => "chain_sig",
            ProposalKind::ChangePolicy { .. } => "change_policy",
        }
    }
}

/// One function call executed by the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallSpec {
    pub method_name: String,
    /// Base64-encoded JSON arguments
    pub args: String,
    pub gas: String,
    pub deposit: String,
}

/// Payload handed to the threshold signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainSigPayload {
    /// Borsh-encoded unsigned NEAR transaction (base64). Signed over its sha256.
    NearTransaction { tx_base64: String },
    /// NEP-413 off-chain message.
    Nep413 {
        message: String,
        /// Base64 of the 32-byte nonce
        nonce: String,
        recipient: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        callback_url: Option<String>,
    },
    /// Pre-hashed payload for foreign chain families (hex, 32 bytes).
    Hash {
        payload_hex: String,
        scheme: SignatureScheme,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    Ed25519,
    Secp256k1,
}

impl SignatureScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureScheme::Ed25519 => "ed25519",
            SignatureScheme::Secp256k1 => "secp256k1",
        }
    }
}

/// Arguments of `create_proposal`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateProposalArgs<'a> {
    pub policy_id: &'a str,
    pub description: &'a str,
    pub kind: &'a ProposalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Approve,
    Reject,
}

// ============================================================================
// VIEW RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Executed,
    Rejected,
    Cancelled,
    Failed,
}

/// On-chain proposal snapshot, as returned by `get_proposal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: String,
    pub policy_id: String,
    #[serde(default)]
    pub description: String,
    pub kind: serde_json::Value,
    pub status: ProposalStatus,
    #[serde(default)]
    pub approvals: Vec<String>,
    #[serde(default)]
    pub rejections: Vec<String>,
    pub required_votes: u32,
}

impl Proposal {
    /// Approvals still needed before the kernel executes the proposal.
    pub fn remaining_votes(&self) -> u32 {
        let approvals = u32::try_from(self.approvals.len()).unwrap_or(u32::MAX);
        self.required_votes.saturating_sub(approvals)
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }
}

/// Policy descriptor, as returned by `get_policy`. Consumed read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub required_role: String,
    pub required_votes: u32,
    /// Restriction schema, opaque to the client
    #[serde(default)]
    pub restrictions: serde_json::Value,
}

/// Derived chain-signature account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAccount {
    pub address: String,
    pub public_key: PublicKey,
}
