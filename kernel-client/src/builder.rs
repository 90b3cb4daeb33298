//! Transaction Builder
//!
//! Resolves who signs a transaction, fetches the key nonce and a recent block
//! reference, and produces the borsh-encoded unsigned transaction.

use chain_clients_near::{Action, PublicKey, Transaction};
use std::sync::Arc;
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::rpc::{view_json, ChainRpc};
use crate::types::{methods, DerivedAccount};

/// Chain label passed to `derived_address_and_public_key` when none is given.
pub const DEFAULT_DERIVATION_CHAIN: &str = "near";

/// Who signs the transaction being built.
#[derive(Debug, Clone, PartialEq)]
pub enum SignerDescriptor {
    /// The configured wallet account and its local key.
    Wallet,
    /// An account derived by the kernel's chain-signature service.
    ChainSig {
        derivation_path: String,
        network: Option<String>,
    },
    /// Caller-provided signer data, used as is.
    Explicit {
        signer_id: String,
        public_key: PublicKey,
        nonce: u64,
    },
}

/// Signer account, key and current key nonce.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSigner {
    pub account_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTransaction {
    pub transaction: Transaction,
    /// Base64 of the borsh encoding
    pub encoded_base64: String,
    /// Base58 sha256 of the borsh encoding
    pub hash: String,
}

/// Builds unsigned transactions against a chain transport.
#[derive(Clone)]
pub struct TransactionBuilder {
    rpc: Arc<dyn ChainRpc>,
    kernel_contract_id: String,
    wallet: Option<(String, PublicKey)>,
}

impl TransactionBuilder {
    pub fn new(rpc: Arc<dyn ChainRpc>, kernel_contract_id: impl Into<String>) -> Self {
        Self {
            rpc,
            kernel_contract_id: kernel_contract_id.into(),
            wallet: None,
        }
    }

    /// Sets the account used for `SignerDescriptor::Wallet`.
    pub fn with_wallet(mut self, account_id: impl Into<String>, public_key: PublicKey) -> Self {
        self.wallet = Some((account_id.into(), public_key));
        self
    }

    /// Resolves a signer descriptor to account, key and current nonce.
    pub async fn resolve_signer(&self, signer: &SignerDescriptor) -> KernelResult<ResolvedSigner> {
        match signer {
            SignerDescriptor::Wallet => {
                let (account_id, public_key) = self.wallet.clone().ok_or_else(|| {
                    KernelError::Config("no wallet account configured".to_string())
                })?;
                let nonce = self.rpc.access_key_nonce(&account_id, &public_key).await?;
                Ok(ResolvedSigner {
                    account_id,
                    public_key,
                    nonce,
                })
            }
            SignerDescriptor::ChainSig {
                derivation_path,
                network,
            } => {
                let derived = fetch_derived_account(
                    self.rpc.as_ref(),
                    &self.kernel_contract_id,
                    derivation_path,
                    network.as_deref(),
                )
                .await?;
                let nonce = self
                    .rpc
                    .access_key_nonce(&derived.address, &derived.public_key)
                    .await?;
                Ok(ResolvedSigner {
                    account_id: derived.address,
                    public_key: derived.public_key,
                    nonce,
                })
            }
            SignerDescriptor::Explicit {
                signer_id,
                public_key,
                nonce,
            } => Ok(ResolvedSigner {
                account_id: signer_id.clone(),
                public_key: public_key.clone(),
                nonce: *nonce,
            }),
        }
    }

    /// Builds an unsigned transaction with `nonce = current + 1` and the
    /// latest final block as reference.
    pub async fn build(
        &self,
        receiver_id: &str,
        actions: Vec<Action>,
        signer: &SignerDescriptor,
    ) -> KernelResult<BuiltTransaction> {
        let resolved = self.resolve_signer(signer).await?;
        let nonce = resolved
            .nonce
            .checked_add(1)
            .ok_or_else(|| KernelError::NonceExhausted {
                account_id: resolved.account_id.clone(),
            })?;
        let block_hash = self.rpc.latest_block_hash().await?;

        let transaction = Transaction {
            signer_id: resolved.account_id,
            public_key: resolved.public_key,
            nonce,
            receiver_id: receiver_id.to_string(),
            block_hash,
            actions,
        };
        let encoded_base64 = transaction.to_base64().map_err(KernelError::Encoding)?;
        let hash = transaction.hash_base58().map_err(KernelError::Encoding)?;

        debug!(
            "Built transaction {} from {} to {} (nonce {}, {} actions)",
            hash,
            transaction.signer_id,
            transaction.receiver_id,
            transaction.nonce,
            transaction.actions.len()
        );

        Ok(BuiltTransaction {
            transaction,
            encoded_base64,
            hash,
        })
    }
}

/// Queries the kernel for the account derived at `derivation_path`.
pub async fn fetch_derived_account(
    rpc: &dyn ChainRpc,
    kernel_contract_id: &str,
    derivation_path: &str,
    chain: Option<&str>,
) -> KernelResult<DerivedAccount> {
    view_json(
        rpc,
        kernel_contract_id,
        methods::DERIVED_ADDRESS_AND_PUBLIC_KEY,
        &serde_json::json!({
            "path": derivation_path,
            "chain": chain.unwrap_or(DEFAULT_DERIVATION_CHAIN),
        }),
    )
    .await
}
