//! ChainSig Finalizer
//!
//! Attaches threshold signatures produced by the kernel to unsigned
//! transactions and broadcasts the result to the target chain. Each chain
//! family plugs in through [`ChainSigAdapter`]; the NEAR adapter is built in.

use async_trait::async_trait;
use chain_clients_near::{FinalExecutionOutcome, Signature, SignedTransaction, Transaction};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{KernelError, KernelResult};
use crate::outcome::pick_ed25519;
use crate::rpc::ChainRpc;
use crate::signature::ThresholdSignature;
use crate::types::SignatureScheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Near,
    Evm,
    Bitcoin,
    Solana,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastReceipt<O> {
    pub tx_hash: String,
    pub outcome: O,
}

/// Finalizes and broadcasts transactions for one chain family.
#[async_trait]
pub trait ChainSigAdapter: Send + Sync {
    type Unsigned: Send + Sync;
    type Signed: Send + Sync;
    type Outcome: Send;

    fn family(&self) -> ChainFamily;

    /// Scheme the kernel signs this family's payloads with.
    fn scheme(&self) -> SignatureScheme;

    /// Attaches the matching signature from `signatures` to `unsigned`.
    fn finalize(
        &self,
        unsigned: Self::Unsigned,
        signatures: &[ThresholdSignature],
    ) -> KernelResult<Self::Signed>;

    async fn broadcast(&self, signed: &Self::Signed) -> KernelResult<BroadcastReceipt<Self::Outcome>>;
}

/// Same-family adapter: NEAR transactions signed by a kernel-derived ed25519 key.
#[derive(Clone)]
pub struct NearChainSigAdapter {
    rpc: Arc<dyn ChainRpc>,
}

impl NearChainSigAdapter {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    /// Decodes a base64 borsh unsigned transaction.
    pub fn decode_unsigned(encoded_base64: &str) -> KernelResult<Transaction> {
        Transaction::from_base64(encoded_base64).map_err(KernelError::Encoding)
    }
}

#[async_trait]
impl ChainSigAdapter for NearChainSigAdapter {
    type Unsigned = Transaction;
    type Signed = SignedTransaction;
    type Outcome = FinalExecutionOutcome;

    fn family(&self) -> ChainFamily {
        ChainFamily::Near
    }

    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Ed25519
    }

    fn finalize(
        &self,
        unsigned: Transaction,
        signatures: &[ThresholdSignature],
    ) -> KernelResult<SignedTransaction> {
        let signature = Signature::Ed25519(
            pick_ed25519(signatures).ok_or(KernelError::MissingSignature { scheme: "ed25519" })?,
        );

        let hash = unsigned.hash().map_err(KernelError::Encoding)?;
        if !signature.verify(&hash, &unsigned.public_key) {
            warn!(
                "Signature does not verify against signer key {} of {}",
                unsigned.public_key, unsigned.signer_id
            );
        }

        Ok(unsigned.into_signed(signature))
    }

    async fn broadcast(
        &self,
        signed: &SignedTransaction,
    ) -> KernelResult<BroadcastReceipt<FinalExecutionOutcome>> {
        let encoded = signed.to_base64().map_err(KernelError::Encoding)?;
        let local_hash = signed.hash_base58().map_err(KernelError::Encoding)?;

        info!(
            "Broadcasting {} from {} to {}",
            local_hash, signed.transaction.signer_id, signed.transaction.receiver_id
        );

        let outcome = self.rpc.send_transaction(&encoded).await?;
        if let Some(reason) = outcome.failure_reason() {
            return Err(KernelError::BroadcastFailed { reason });
        }

        let tx_hash = if outcome.transaction_hash().is_empty() {
            local_hash
        } else {
            outcome.transaction_hash().to_string()
        };
        info!("Broadcast {} succeeded", tx_hash);

        Ok(BroadcastReceipt { tx_hash, outcome })
    }
}
