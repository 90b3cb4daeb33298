//! Public keys and signatures in NEAR encoding
//!
//! Both types have a borsh form (one tag byte followed by the raw key material)
//! and a string form `<curve>:<base58>`, e.g. `ed25519:8fWHD35...`.

use anyhow::{Context, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const ED25519_PREFIX: &str = "ed25519";
const SECP256K1_PREFIX: &str = "secp256k1";

/// Splits `<curve>:<base58>` into curve and decoded bytes. A missing curve
/// prefix means ed25519.
fn split_key_string(value: &str) -> Result<(&str, Vec<u8>)> {
    let (curve, data) = match value.split_once(':') {
        Some((curve, data)) => (curve, data),
        None => (ED25519_PREFIX, value),
    };
    let bytes = bs58::decode(data)
        .into_vec()
        .with_context(|| format!("Invalid base58 in '{}'", value))?;
    Ok((curve, bytes))
}

fn to_array<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        anyhow::anyhow!("Invalid {} length: expected {} bytes, got {}", what, N, bytes.len())
    })
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

/// Account access key.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PublicKey {
    Ed25519([u8; 32]),
    Secp256k1([u8; 64]),
}

impl PublicKey {
    pub fn key_data(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes,
            PublicKey::Secp256k1(bytes) => bytes,
        }
    }

    /// Implicit account id for an ed25519 key (lowercase hex of the key bytes).
    pub fn implicit_account_id(&self) -> Option<String> {
        match self {
            PublicKey::Ed25519(bytes) => Some(hex::encode(bytes)),
            PublicKey::Secp256k1(_) => None,
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            PublicKey::Ed25519(_) => ED25519_PREFIX,
            PublicKey::Secp256k1(_) => SECP256K1_PREFIX,
        };
        write!(f, "{}:{}", prefix, bs58::encode(self.key_data()).into_string())
    }
}

impl FromStr for PublicKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (curve, bytes) = split_key_string(value)?;
        match curve {
            ED25519_PREFIX => Ok(PublicKey::Ed25519(to_array(&bytes, "ed25519 public key")?)),
            SECP256K1_PREFIX => Ok(PublicKey::Secp256k1(to_array(&bytes, "secp256k1 public key")?)),
            other => anyhow::bail!("Unknown key type '{}'", other),
        }
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = <String as Deserialize>::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SIGNATURE
// ============================================================================

/// Transaction signature.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Ed25519([u8; 64]),
    /// r (32) || s (32) || v (1)
    Secp256k1([u8; 65]),
}

impl Signature {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Signature::Ed25519(bytes) => bytes,
            Signature::Secp256k1(bytes) => bytes,
        }
    }

    /// Verifies an ed25519 signature over `message`. Secp256k1 signatures are
    /// not verified here and always return `false`.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        match (self, public_key) {
            (Signature::Ed25519(sig), PublicKey::Ed25519(key)) => {
                let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(key) else {
                    return false;
                };
                let signature = ed25519_dalek::Signature::from_bytes(sig);
                verifying_key.verify_strict(message, &signature).is_ok()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            Signature::Ed25519(_) => ED25519_PREFIX,
            Signature::Secp256k1(_) => SECP256K1_PREFIX,
        };
        write!(f, "{}:{}", prefix, bs58::encode(self.bytes()).into_string())
    }
}

impl FromStr for Signature {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (curve, bytes) = split_key_string(value)?;
        match curve {
            ED25519_PREFIX => Ok(Signature::Ed25519(to_array(&bytes, "ed25519 signature")?)),
            SECP256K1_PREFIX => Ok(Signature::Secp256k1(to_array(&bytes, "secp256k1 signature")?)),
            other => anyhow::bail!("Unknown signature type '{}'", other),
        }
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = <String as Deserialize>::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
