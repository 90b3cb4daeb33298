//! Threshold signatures emitted by the kernel
//!
//! The chain-signature service answers with one of two JSON shapes:
//!
//! - secp256k1: `{"big_r": {"affine_point": "<hex>"}, "s": {"scalar": "<hex>"}, "recovery_id": 0}`
//!   (older deployments use bare strings for `big_r` and `s`)
//! - ed25519: `{"signature": [u8; 64]}` or `{"signature": "ed25519:<base58>"}`
//!
//! The variant is decided by structure, secp256k1 first.

use chain_clients_near::Signature;
use serde_json::Value;
use std::fmt;

use crate::error::{KernelError, KernelResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdSignature {
    Ed25519 {
        signature: [u8; 64],
    },
    Secp256k1 {
        /// Compressed R point, hex
        big_r: String,
        /// Scalar, hex
        s: String,
        recovery_id: u8,
    },
}

impl ThresholdSignature {
    /// Structural match of a single JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        Self::secp256k1_from_json(value).or_else(|| Self::ed25519_from_json(value))
    }

    fn secp256k1_from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let big_r = nested_str(object.get("big_r")?, "affine_point")?;
        let s = nested_str(object.get("s")?, "scalar")?;
        let recovery_id = object
            .get("recovery_id")
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())?;
        Some(ThresholdSignature::Secp256k1 {
            big_r: big_r.to_string(),
            s: s.to_string(),
            recovery_id,
        })
    }

    fn ed25519_from_json(value: &Value) -> Option<Self> {
        let signature = value.as_object()?.get("signature")?;
        let bytes: Vec<u8> = match signature {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()?,
            Value::String(encoded) => match encoded.parse::<Signature>().ok()? {
                Signature::Ed25519(bytes) => bytes.to_vec(),
                Signature::Secp256k1(_) => return None,
            },
            _ => return None,
        };
        let signature: [u8; 64] = bytes.try_into().ok()?;
        Some(ThresholdSignature::Ed25519 { signature })
    }

    /// Walks a JSON document and collects every signature-shaped object,
    /// in document order. Matched objects are not searched further.
    pub fn collect(value: &Value, found: &mut Vec<ThresholdSignature>) {
        if let Some(signature) = Self::from_json(value) {
            if !found.contains(&signature) {
                found.push(signature);
            }
            return;
        }
        match value {
            Value::Array(items) => items.iter().for_each(|item| Self::collect(item, found)),
            Value::Object(map) => map.values().for_each(|item| Self::collect(item, found)),
            _ => {}
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            ThresholdSignature::Ed25519 { .. } => "ed25519",
            ThresholdSignature::Secp256k1 { .. } => "secp256k1",
        }
    }

    /// 65-byte `r || s || v` form of a secp256k1 signature.
    pub fn to_rsv(&self) -> KernelResult<[u8; 65]> {
        let ThresholdSignature::Secp256k1 { big_r, s, recovery_id } = self else {
            return Err(KernelError::MissingSignature { scheme: "secp256k1" });
        };
        let big_r = decode_hex(big_r, "big_r")?;
        let s = decode_hex(s, "s")?;
        // compressed point: parity byte followed by the x coordinate
        if big_r.len() != 33 || s.len() != 32 {
            return Err(KernelError::Encoding(anyhow::anyhow!(
                "Unexpected secp256k1 component lengths: big_r {} bytes, s {} bytes",
                big_r.len(),
                s.len()
            )));
        }
        let mut rsv = [0u8; 65];
        rsv[..32].copy_from_slice(&big_r[1..]);
        rsv[32..64].copy_from_slice(&s);
        rsv[64] = *recovery_id;
        Ok(rsv)
    }
}

impl fmt::Display for ThresholdSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdSignature::Ed25519 { signature } => {
                write!(f, "ed25519:{}", bs58::encode(signature).into_string())
            }
            ThresholdSignature::Secp256k1 { big_r, s, recovery_id } => {
                write!(f, "secp256k1(big_r={}, s={}, v={})", big_r, s, recovery_id)
            }
        }
    }
}

/// Accepts either `"<hex>"` or `{"<key>": "<hex>"}`.
fn nested_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(key).and_then(Value::as_str),
        _ => None,
    }
}

fn decode_hex(value: &str, what: &str) -> KernelResult<Vec<u8>> {
    hex::decode(value.trim_start_matches("0x")).map_err(|e| {
        KernelError::Encoding(anyhow::anyhow!("Invalid hex in {}: {}", what, e))
    })
}
