//! Execution outcome inspection
//!
//! Everything that reads meaning out of an execution trace lives here:
//! event envelope parsing, the executed-vs-pending classification, proposal
//! id recovery and threshold signature collection.
//!
//! Kernel events follow the NEP-297 log format:
//!
//! ```text
//! EVENT_JSON:{"standard":"kernel","version":"1.0.0","event":"proposal_created","data":[{"proposal_id":7}]}
//! ```
//!
//! The classification is a heuristic over logs and return values, not a
//! contract-level status read. Callers that need certainty re-query the
//! proposal through `get_proposal`.

use chain_clients_near::FinalExecutionOutcome;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{KernelError, KernelResult};
use crate::signature::ThresholdSignature;
use crate::types::ProposalId;

pub const EVENT_JSON_PREFIX: &str = "EVENT_JSON:";

/// Event emitted when a proposal's action ran.
pub const PROPOSAL_EXECUTED_EVENT: &str = "proposal_executed";

/// Lifecycle events that carry `data[0].proposal_id`.
pub const PROPOSAL_EVENTS: &[&str] = &[
    "proposal_created",
    PROPOSAL_EXECUTED_EVENT,
    "proposal_approved",
    "proposal_voted",
    "proposal_rejected",
    "proposal_cancelled",
];

/// Substrings that mark a log line as possibly carrying a signature.
const SIGNATURE_MARKERS: &[&str] = &["big_r", "\"signature\""];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub version: String,
    pub event: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Parses an `EVENT_JSON:` log line. Anything else yields `None`.
pub fn parse_event(log: &str) -> Option<EventEnvelope> {
    let body = log.trim().strip_prefix(EVENT_JSON_PREFIX)?;
    serde_json::from_str(body.trim()).ok()
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    /// The proposal's action ran in this transaction.
    Executed,
    /// A proposal was recorded (or voted on) but is still waiting for votes.
    ProposalOnly,
}

impl OutcomeClass {
    pub fn is_executed(self) -> bool {
        self == OutcomeClass::Executed
    }
}

/// Classifies an outcome. Executed when any of these holds:
///
/// - a log is an event envelope for `proposal_executed`
/// - a log mentions `big_r` or `"signature"`
/// - a receipt returned a non-empty, non-`null` JSON value
pub fn classify(outcome: &FinalExecutionOutcome) -> OutcomeClass {
    let completion_event = outcome
        .logs()
        .filter_map(parse_event)
        .any(|event| event.event == PROPOSAL_EXECUTED_EVENT);

    if completion_event || outcome.logs().any(is_signature_shaped) || has_json_return_value(outcome) {
        OutcomeClass::Executed
    } else {
        OutcomeClass::ProposalOnly
    }
}

fn is_signature_shaped(log: &str) -> bool {
    SIGNATURE_MARKERS.iter().any(|marker| log.contains(marker))
}

fn has_json_return_value(outcome: &FinalExecutionOutcome) -> bool {
    outcome
        .receipts()
        .filter_map(|receipt| receipt.status.success_bytes())
        .filter(|bytes| !bytes.is_empty())
        .any(|bytes| matches!(serde_json::from_slice::<Value>(&bytes), Ok(value) if !value.is_null()))
}

/// Fails with `ExecutionFailed` if the transaction or any receipt failed.
pub fn ensure_success(outcome: &FinalExecutionOutcome) -> KernelResult<()> {
    match outcome.failure_reason() {
        Some(reason) => Err(KernelError::ExecutionFailed {
            tx_hash: outcome.transaction_hash().to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Proposal id from the first lifecycle event in the trace.
pub fn extract_proposal_id(outcome: &FinalExecutionOutcome) -> KernelResult<ProposalId> {
    outcome
        .logs()
        .filter_map(parse_event)
        .filter(|event| PROPOSAL_EVENTS.contains(&event.event.as_str()))
        .find_map(|event| event.data.first().and_then(proposal_id_field))
        .ok_or(KernelError::MissingProposalId)
}

/// Reads `proposal_id` as a JSON number or a digit-only string.
fn proposal_id_field(data: &Value) -> Option<ProposalId> {
    match data.get("proposal_id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

/// Every threshold signature found in the trace, logs first, then return
/// values, without duplicates. Unparsable candidates are skipped.
pub fn extract_signatures(outcome: &FinalExecutionOutcome) -> Vec<ThresholdSignature> {
    let mut found = Vec::new();

    for log in outcome.logs().filter(|log| is_signature_shaped(log)) {
        if let Some(value) = log_json(log) {
            ThresholdSignature::collect(&value, &mut found);
        }
    }

    for bytes in outcome.receipts().filter_map(|r| r.status.success_bytes()) {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            ThresholdSignature::collect(&value, &mut found);
        }
    }

    found
}

/// JSON carried by a log line: the event data for envelopes, otherwise the
/// whole line, otherwise everything from the first `{`.
fn log_json(log: &str) -> Option<Value> {
    if let Some(event) = parse_event(log) {
        return Some(Value::Array(event.data));
    }
    let line = log.trim();
    serde_json::from_str(line)
        .ok()
        .or_else(|| line.find('{').and_then(|start| serde_json::from_str(&line[start..]).ok()))
}

/// First ed25519 signature in the list.
pub fn pick_ed25519(signatures: &[ThresholdSignature]) -> Option<[u8; 64]> {
    signatures.iter().find_map(|signature| match signature {
        ThresholdSignature::Ed25519 { signature } => Some(*signature),
        ThresholdSignature::Secp256k1 { .. } => None,
    })
}
