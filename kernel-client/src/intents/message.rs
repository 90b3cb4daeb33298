//! NEP-413 signed messages and token-diff intents
//!
//! The signed bytes are `sha256(borsh(u32 tag) || borsh(payload))` with
//! `tag = 2^31 + 413`, which keeps NEP-413 messages from ever being valid
//! transactions.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use borsh::BorshSerialize;
use chain_clients_near::{PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{KernelError, KernelResult};
use crate::types::ChainSigPayload;

pub const NEP413_TAG: u32 = (1 << 31) + 413;

/// NEP-413 message as signed.
#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct Nep413Payload {
    pub message: String,
    pub nonce: [u8; 32],
    pub recipient: String,
    pub callback_url: Option<String>,
}

impl Nep413Payload {
    pub fn new(message: String, nonce: [u8; 32], recipient: impl Into<String>) -> Self {
        Self {
            message,
            nonce,
            recipient: recipient.into(),
            callback_url: None,
        }
    }

    /// Fresh random nonce.
    pub fn random_nonce() -> [u8; 32] {
        rand::random()
    }

    /// The 32 bytes that get signed.
    pub fn hash(&self) -> KernelResult<[u8; 32]> {
        let mut bytes = NEP413_TAG
            .try_to_vec()
            .map_err(|e| KernelError::Encoding(e.into()))?;
        bytes.extend(self.try_to_vec().map_err(|e| KernelError::Encoding(e.into()))?);
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn verify(&self, signature: &Signature, public_key: &PublicKey) -> KernelResult<bool> {
        Ok(signature.verify(&self.hash()?, public_key))
    }

    pub fn nonce_base64(&self) -> String {
        STANDARD.encode(self.nonce)
    }

    /// Kernel chain-signature payload for this message.
    pub fn to_chain_sig_payload(&self) -> ChainSigPayload {
        ChainSigPayload::Nep413 {
            message: self.message.clone(),
            nonce: self.nonce_base64(),
            recipient: self.recipient.clone(),
            callback_url: self.callback_url.clone(),
        }
    }
}

/// One intent inside an intents message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Signed balance changes per asset; negative amounts are paid out.
    TokenDiff { diff: BTreeMap<String, String> },
}

/// JSON body carried in the NEP-413 `message` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMessage {
    pub signer_id: String,
    pub deadline: String,
    pub intents: Vec<Intent>,
}

impl IntentMessage {
    /// Token-diff swapping `amount_in` of `asset_in` for `amount_out` of `asset_out`.
    pub fn token_diff(
        signer_id: impl Into<String>,
        deadline: impl Into<String>,
        asset_in: &str,
        amount_in: u128,
        asset_out: &str,
        amount_out: u128,
    ) -> Self {
        let mut diff = BTreeMap::new();
        diff.insert(asset_in.to_string(), format!("-{}", amount_in));
        diff.insert(asset_out.to_string(), amount_out.to_string());
        Self {
            signer_id: signer_id.into(),
            deadline: deadline.into(),
            intents: vec![Intent::TokenDiff { diff }],
        }
    }

    pub fn to_json(&self) -> KernelResult<String> {
        serde_json::to_string(self).map_err(|e| KernelError::Encoding(e.into()))
    }
}

/// Payload part of a signed NEP-413 envelope, in the relay's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nep413PayloadJson {
    pub message: String,
    /// Base64
    pub nonce: String,
    pub recipient: String,
    #[serde(rename = "callbackUrl", default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Signed NEP-413 envelope as published to the solver relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedNep413 {
    pub standard: String,
    pub payload: Nep413PayloadJson,
    /// `ed25519:<base58>`
    pub public_key: String,
    /// `ed25519:<base58>`
    pub signature: String,
}

impl SignedNep413 {
    pub fn new(payload: &Nep413Payload, public_key: &PublicKey, signature: String) -> Self {
        Self {
            standard: "nep413".to_string(),
            payload: Nep413PayloadJson {
                message: payload.message.clone(),
                nonce: payload.nonce_base64(),
                recipient: payload.recipient.clone(),
                callback_url: payload.callback_url.clone(),
            },
            public_key: public_key.to_string(),
            signature,
        }
    }
}
