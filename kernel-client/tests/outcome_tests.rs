//! Unit tests for outcome classification and extraction
//!
//! These tests pin the heuristics that decide executed vs pending and the
//! structural matching of threshold signatures in logs and return values.

use kernel_client::outcome::{ensure_success, parse_event, EVENT_JSON_PREFIX};
use kernel_client::{
    classify, extract_proposal_id, extract_signatures, pick_ed25519, KernelError, OutcomeClass,
    ThresholdSignature,
};
use serde_json::json;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{event_log, failed_outcome, outcome, pending_outcome};

fn secp_json() -> serde_json::Value {
    json!({
        "big_r": { "affine_point": format!("02{}", "11".repeat(32)) },
        "s": { "scalar": "22".repeat(32) },
        "recovery_id": 1
    })
}

fn secp_signature() -> ThresholdSignature {
    ThresholdSignature::Secp256k1 {
        big_r: format!("02{}", "11".repeat(32)),
        s: "22".repeat(32),
        recovery_id: 1,
    }
}

// ============================================================================
// EVENT PARSING
// ============================================================================

/// What is tested: parse_event reads NEP-297 envelopes and ignores other lines
/// Why: Only prefixed envelopes are trusted as kernel events
#[test]
fn test_parse_event() {
    let event = parse_event(&event_log("proposal_created", json!(3))).unwrap();
    assert_eq!(event.event, "proposal_created");
    assert_eq!(event.standard, "kernel");
    assert_eq!(event.data[0]["proposal_id"], 3);

    assert!(parse_event("proposal_created 3").is_none());
    assert!(parse_event(&format!("{}not json", EVENT_JSON_PREFIX)).is_none());
    assert!(parse_event(r#"{"event":"proposal_created","data":[]}"#).is_none());
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// What is tested: A proposal_executed event classifies the outcome as executed
/// Why: The completion event is the primary executed signal
#[test]
fn test_completion_event_is_executed() {
    let logs = vec![
        event_log("proposal_created", json!(1)),
        event_log("proposal_executed", json!(1)),
    ];
    assert_eq!(classify(&outcome(&logs, None)), OutcomeClass::Executed);
}

/// What is tested: A created-only outcome with empty return value is pending
/// Why: Proposals below their vote threshold must not look executed
#[test]
fn test_created_only_is_pending() {
    assert_eq!(classify(&pending_outcome(1)), OutcomeClass::ProposalOnly);
}

/// What is tested: Empty and `null` return values do not count as executed
/// Why: Many kernel methods return nothing or null on the pending path
#[test]
fn test_empty_or_null_return_is_not_executed() {
    let logs = vec![event_log("proposal_created", json!(1))];
    assert_eq!(classify(&outcome(&logs, Some(b"".as_slice()))), OutcomeClass::ProposalOnly);
    assert_eq!(classify(&outcome(&logs, Some(b"null".as_slice()))), OutcomeClass::ProposalOnly);
    assert_eq!(classify(&outcome(&logs, Some(b"not json".as_slice()))), OutcomeClass::ProposalOnly);
}

/// What is tested: A non-null JSON return value counts as executed
/// Why: Executed actions return their result through the receipt
#[test]
fn test_json_return_value_is_executed() {
    let logs = vec![event_log("proposal_created", json!(1))];
    assert_eq!(classify(&outcome(&logs, Some(b"\"ok\"".as_slice()))), OutcomeClass::Executed);
}

/// What is tested: Logs mentioning big_r or "signature" count as executed
/// Why: The signer logs its response before any event is emitted
#[test]
fn test_signature_log_is_executed() {
    let big_r = vec![format!("sign response {}", secp_json())];
    let signature = vec![r#"{"signature": "pending"}"#.to_string()];

    assert!(classify(&outcome(&big_r, None)).is_executed());
    assert!(classify(&outcome(&signature, None)).is_executed());
}

/// What is tested: ensure_success rejects failed outcomes with the failure reason
/// Why: A failed create_proposal must never be classified
#[test]
fn test_ensure_success() {
    assert!(ensure_success(&pending_outcome(1)).is_ok());
    match ensure_success(&failed_outcome()) {
        Err(KernelError::ExecutionFailed { reason, .. }) => assert!(reason.contains("ActionError")),
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }
}

// ============================================================================
// PROPOSAL ID
// ============================================================================

/// What is tested: proposal_id is read from numbers and digit-only strings alike
/// Why: Kernel versions differ in how they serialize u64 ids
#[test]
fn test_proposal_id_number_or_string() {
    for id in [0u64, 7, 18_446_744_073_709_551_615] {
        let numeric = outcome(&[event_log("proposal_created", json!(id))], None);
        let string = outcome(&[event_log("proposal_created", json!(id.to_string()))], None);
        assert_eq!(extract_proposal_id(&numeric).unwrap(), id);
        assert_eq!(extract_proposal_id(&string).unwrap(), id);
    }
}

/// What is tested: Non-numeric ids and unrelated events are ignored
/// Why: A wrong id would route votes to another proposal
#[test]
fn test_proposal_id_ignores_invalid_candidates() {
    let logs = vec![
        event_log("ft_transfer", json!(5)),
        event_log("proposal_created", json!("12a")),
        event_log("proposal_created", json!(-1)),
        "proposal_id: 9".to_string(),
    ];
    assert!(matches!(
        extract_proposal_id(&outcome(&logs, None)),
        Err(KernelError::MissingProposalId)
    ));
}

/// What is tested: The first lifecycle event wins, whatever its kind
/// Why: Vote outcomes carry proposal_voted before proposal_executed
#[test]
fn test_proposal_id_first_lifecycle_event() {
    let logs = vec![
        "unrelated log".to_string(),
        event_log("proposal_voted", json!(4)),
        event_log("proposal_executed", json!(4)),
    ];
    assert_eq!(extract_proposal_id(&outcome(&logs, None)).unwrap(), 4);
}

// ============================================================================
// SIGNATURES
// ============================================================================

/// What is tested: Mixed logs and return values yield exactly the signature-shaped items
/// Why: Extraction scans a superset of candidates and must skip everything else
#[test]
fn test_extract_mixed_signatures() {
    let logs = vec![
        event_log("proposal_executed", json!(1)),
        format!("Chain signature response: {}", secp_json()),
        r#"{"signature": "not-a-signature"}"#.to_string(),
        r#"{"big_r": 5}"#.to_string(),
    ];
    let return_value = serde_json::to_vec(&json!({
        "results": [
            { "unrelated": true },
            { "signature": vec![5u8; 64] }
        ]
    }))
    .unwrap();

    let signatures = extract_signatures(&outcome(&logs, Some(return_value.as_slice())));

    assert_eq!(
        signatures,
        vec![secp_signature(), ThresholdSignature::Ed25519 { signature: [5u8; 64] }]
    );
}

/// What is tested: Signatures inside event envelope data are found
/// Why: Newer kernels emit the signer response as an event
#[test]
fn test_extract_signature_from_event_data() {
    let log = format!(
        "EVENT_JSON:{}",
        json!({
            "standard": "kernel",
            "version": "1.0.0",
            "event": "signature_produced",
            "data": [{ "proposal_id": 2, "response": secp_json() }]
        })
    );
    assert_eq!(extract_signatures(&outcome(&[log], None)), vec![secp_signature()]);
}

/// What is tested: The same signature in a log and a return value is reported once
/// Why: Duplicates would make finalization ambiguous
#[test]
fn test_extract_signatures_deduplicates() {
    let log = json!({ "signature": vec![8u8; 64] }).to_string();
    let return_value = serde_json::to_vec(&json!({ "signature": vec![8u8; 64] })).unwrap();

    let signatures = extract_signatures(&outcome(&[log], Some(return_value.as_slice())));
    assert_eq!(signatures.len(), 1);
}

/// What is tested: Ed25519 signatures given as `ed25519:<base58>` strings are accepted
/// Why: Some signer versions render signatures in NEAR string form
#[test]
fn test_extract_string_ed25519_signature() {
    let encoded = format!("ed25519:{}", bs58::encode([6u8; 64]).into_string());
    let return_value = serde_json::to_vec(&json!({ "signature": encoded })).unwrap();

    assert_eq!(
        extract_signatures(&outcome(&[], Some(return_value.as_slice()))),
        vec![ThresholdSignature::Ed25519 { signature: [6u8; 64] }]
    );
}

/// What is tested: pick_ed25519 returns the first ed25519 entry and is repeatable
/// Why: Finalization must pick the same signature every time
#[test]
fn test_pick_ed25519() {
    let signatures = vec![
        secp_signature(),
        ThresholdSignature::Ed25519 { signature: [1u8; 64] },
        ThresholdSignature::Ed25519 { signature: [2u8; 64] },
    ];

    assert_eq!(pick_ed25519(&signatures), Some([1u8; 64]));
    assert_eq!(pick_ed25519(&signatures), pick_ed25519(&signatures));
    assert_eq!(pick_ed25519(&[secp_signature()]), None);
    assert_eq!(pick_ed25519(&[]), None);
}

/// What is tested: secp256k1 signatures convert to 65-byte r || s || v
/// Why: Foreign-chain adapters consume this form
#[test]
fn test_secp256k1_to_rsv() {
    let rsv = secp_signature().to_rsv().unwrap();
    assert_eq!(&rsv[..32], &[0x11; 32]);
    assert_eq!(&rsv[32..64], &[0x22; 32]);
    assert_eq!(rsv[64], 1);

    let short = ThresholdSignature::Secp256k1 {
        big_r: "02ff".to_string(),
        s: "22".repeat(32),
        recovery_id: 0,
    };
    assert!(matches!(short.to_rsv(), Err(KernelError::Encoding(_))));
}

/// What is tested: Bare-string secp256k1 components are accepted
/// Why: Older signer deployments do not wrap big_r and s in objects
#[test]
fn test_secp256k1_bare_strings() {
    let value = json!({ "big_r": "02aa", "s": "bb", "recovery_id": 0 });
    assert_eq!(
        ThresholdSignature::from_json(&value),
        Some(ThresholdSignature::Secp256k1 {
            big_r: "02aa".to_string(),
            s: "bb".to_string(),
            recovery_id: 0
        })
    );
}
