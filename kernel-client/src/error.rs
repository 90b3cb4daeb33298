//! Error definitions for the kernel client.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    /// Connectivity failure talking to the chain node. The only retryable class.
    #[error("Transport failure: {0:#}")]
    Transport(anyhow::Error),

    /// The node answered with an error envelope.
    #[error("RPC rejected request ({name}): {message}")]
    Rpc { name: String, message: String },

    /// Transaction or receipt finished with a failure status.
    #[error("Transaction {tx_hash} failed: {reason}")]
    ExecutionFailed { tx_hash: String, reason: String },

    #[error("Execution outcome contains no proposal id")]
    MissingProposalId,

    #[error("Execution outcome contains no {scheme} signature")]
    MissingSignature { scheme: &'static str },

    #[error("Proposal {0} not found")]
    ProposalNotFound(u64),

    /// A retried submission found that an earlier attempt already created a
    /// proposal whose outcome can no longer be observed.
    #[error("Earlier submission already created proposal {proposal_id}; re-query it instead of retrying")]
    AmbiguousSubmission { proposal_id: u64 },

    #[error("Access key nonce of {account_id} cannot be incremented")]
    NonceExhausted { account_id: String },

    #[error("Broadcast failed: {reason}")]
    BroadcastFailed { reason: String },

    #[error("No quote available for {asset_in} -> {asset_out}")]
    NoQuoteAvailable { asset_in: String, asset_out: String },

    #[error("Swap proposal {proposal_id} is pending votes; only auto-executed swaps are supported")]
    SwapRequiresVoting { proposal_id: u64 },

    #[error("{service} rejected request: {reason}")]
    RemoteRejected { service: String, reason: String },

    /// Polling deadline hit. The awaited state is unknown, not failed.
    #[error("Timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The intent was published but its settlement could not be observed.
    #[error("Intent {intent_hash} (proposal {proposal_id}) published, settlement unconfirmed: {source}")]
    SettlementUnconfirmed {
        proposal_id: u64,
        intent_hash: String,
        #[source]
        source: Box<KernelError>,
    },

    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    #[error("Invalid response from {context}: {reason}")]
    InvalidResponse { context: String, reason: String },

    #[error("Encoding error: {0:#}")]
    Encoding(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KernelError {
    /// Whether the bounded-retry wrapper may re-run the failed step.
    pub fn is_transient(&self) -> bool {
        matches!(self, KernelError::Transport(_))
    }

    pub(crate) fn invalid_response(context: impl Into<String>, reason: impl ToString) -> Self {
        KernelError::InvalidResponse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;
