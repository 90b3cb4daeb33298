//! NEAR transaction (v0) in borsh encoding
//!
//! Variant order of every enum below is part of the wire format and must not
//! be changed.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use crate::crypto::{PublicKey, Signature};

/// Permission attached to an access key.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum AccessKeyPermission {
    FunctionCall(FunctionCallPermission),
    FullAccess,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallPermission {
    pub allowance: Option<u128>,
    pub receiver_id: String,
    pub method_names: Vec<String>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub nonce: u64,
    pub permission: AccessKeyPermission,
}

/// Transaction action.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateAccount,
    DeployContract {
        code: Vec<u8>,
    },
    FunctionCall {
        method_name: String,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    },
    Transfer {
        deposit: u128,
    },
    Stake {
        stake: u128,
        public_key: PublicKey,
    },
    AddKey {
        public_key: PublicKey,
        access_key: AccessKey,
    },
    DeleteKey {
        public_key: PublicKey,
    },
    DeleteAccount {
        beneficiary_id: String,
    },
}

impl Action {
    /// Function call with JSON-encoded arguments.
    pub fn function_call(
        method_name: impl Into<String>,
        args: &serde_json::Value,
        gas: u64,
        deposit: u128,
    ) -> Result<Self> {
        let args = serde_json::to_vec(args).context("Failed to encode function call args")?;
        Ok(Action::FunctionCall {
            method_name: method_name.into(),
            args,
            gas,
            deposit,
        })
    }
}

/// Unsigned transaction.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.try_to_vec().context("Failed to borsh-encode transaction")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Transaction::try_from_slice(bytes).context("Failed to borsh-decode transaction")
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .context("Failed to decode transaction from base64")?;
        Self::from_bytes(&bytes)
    }

    /// sha256 of the borsh encoding; this is the message that gets signed.
    pub fn hash(&self) -> Result<[u8; 32]> {
        Ok(Sha256::digest(self.to_bytes()?).into())
    }

    /// Transaction hash rendered the way explorers and RPC nodes show it.
    pub fn hash_base58(&self) -> Result<String> {
        Ok(bs58::encode(self.hash()?).into_string())
    }

    pub fn into_signed(self, signature: Signature) -> SignedTransaction {
        SignedTransaction {
            transaction: self,
            signature,
        }
    }
}

/// Transaction with its signature attached.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn to_base64(&self) -> Result<String> {
        let bytes = self
            .try_to_vec()
            .context("Failed to borsh-encode signed transaction")?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .context("Failed to decode signed transaction from base64")?;
        SignedTransaction::try_from_slice(&bytes).context("Failed to borsh-decode signed transaction")
    }

    pub fn hash_base58(&self) -> Result<String> {
        self.transaction.hash_base58()
    }
}
