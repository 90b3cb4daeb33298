//! Local ed25519 keypair signer

use anyhow::{Context, Result};
use ed25519_dalek::{Signer, SigningKey};

use crate::crypto::{PublicKey, Signature};
use crate::transaction::{SignedTransaction, Transaction};

/// Account id plus its full-access ed25519 key held in memory.
#[derive(Clone)]
pub struct InMemorySigner {
    pub account_id: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key().to_string())
            .finish()
    }
}

impl InMemorySigner {
    pub fn from_seed(account_id: impl Into<String>, seed: &[u8; 32]) -> Self {
        Self {
            account_id: account_id.into(),
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a secret key in `ed25519:<base58>` form. Both the 64-byte
    /// (seed || public key) layout used by NEAR key files and a bare 32-byte
    /// seed are accepted.
    pub fn from_secret_key(account_id: impl Into<String>, secret_key: &str) -> Result<Self> {
        let encoded = secret_key.strip_prefix("ed25519:").ok_or_else(|| {
            anyhow::anyhow!("Secret key must be an ed25519 key ('ed25519:<base58>')")
        })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .context("Failed to decode secret key from base58")?;
        if bytes.len() != 32 && bytes.len() != 64 {
            anyhow::bail!(
                "Invalid secret key length: expected 32 or 64 bytes, got {}",
                bytes.len()
            );
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        Ok(Self::from_seed(account_id, &seed))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_bytes(&self, message: &[u8]) -> Signature {
        Signature::Ed25519(self.signing_key.sign(message).to_bytes())
    }

    /// Signs the transaction hash and attaches the signature.
    pub fn sign_transaction(&self, transaction: Transaction) -> Result<SignedTransaction> {
        let hash = transaction.hash()?;
        let signature = self.sign_bytes(&hash);
        Ok(transaction.into_signed(signature))
    }
}
