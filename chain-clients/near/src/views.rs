//! RPC view types
//!
//! Only the fields the kernel client reads are modelled; everything else in
//! the node's responses is ignored.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Terminal (or intermediate) status of a transaction or receipt.
///
/// Covers both the receipt-level `ExecutionStatusView` (`Unknown`,
/// `SuccessReceiptId`) and the transaction-level `FinalExecutionStatus`
/// (`NotStarted`, `Started`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[default]
    Unknown,
    NotStarted,
    Started,
    Failure(serde_json::Value),
    /// Base64-encoded return value
    SuccessValue(String),
    SuccessReceiptId(String),
}

impl ExecutionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionStatus::Failure(_))
    }

    /// Decoded success value. `None` for non-success statuses and for values
    /// that are not valid base64.
    pub fn success_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ExecutionStatus::SuccessValue(encoded) => STANDARD.decode(encoded).ok(),
            _ => None,
        }
    }

    /// Failure reason as compact JSON, if this is a failure.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            ExecutionStatus::Failure(reason) => Some(reason.to_string()),
            _ => None,
        }
    }
}

/// Outcome of a single receipt (or of the transaction-to-receipt conversion).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcomeView {
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub receipt_ids: Vec<String>,
    #[serde(default)]
    pub executor_id: String,
    #[serde(default)]
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcomeWithId {
    #[serde(default)]
    pub id: String,
    pub outcome: ExecutionOutcomeView,
}

/// Result of `send_tx` / `tx`: the full execution trace of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub transaction_outcome: ExecutionOutcomeWithId,
    #[serde(default)]
    pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
}

impl FinalExecutionOutcome {
    /// Transaction outcome followed by every receipt outcome, in order.
    pub fn receipts(&self) -> impl Iterator<Item = &ExecutionOutcomeView> {
        std::iter::once(&self.transaction_outcome.outcome)
            .chain(self.receipts_outcome.iter().map(|r| &r.outcome))
    }

    /// All log lines across the trace, in order.
    pub fn logs(&self) -> impl Iterator<Item = &str> {
        self.receipts()
            .flat_map(|outcome| outcome.logs.iter().map(String::as_str))
    }

    /// Transaction hash (the id of the transaction outcome).
    pub fn transaction_hash(&self) -> &str {
        &self.transaction_outcome.id
    }

    /// First failure reason found at the top level or in any receipt.
    pub fn failure_reason(&self) -> Option<String> {
        self.status
            .failure_reason()
            .or_else(|| self.receipts().find_map(|r| r.status.failure_reason()))
    }
}

/// Result of `query` / `view_access_key`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    #[serde(default)]
    pub permission: serde_json::Value,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
}

/// Result of `query` / `call_function`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CallFunctionView {
    #[serde(default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    /// Older nodes report contract panics here instead of as an RPC error
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlockHeaderView {
    pub hash: String,
    pub height: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlockView {
    pub header: BlockHeaderView,
}
