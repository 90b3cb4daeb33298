//! Intents Swap Protocol
//!
//! Fixed pipeline, one quote per attempt:
//!
//! 1. quote (supplied or fetched)
//! 2. derive the signing account
//! 3. build the token-diff intent and its NEP-413 envelope
//! 4. propose the envelope for signing; pending proposals are not supported
//! 5. extract the ed25519 signature
//! 6. publish the signed intent
//! 7. optionally wait for the output balance to grow

use chain_clients_common::{poll_until, PollError, PollSchedule};
use chain_clients_near::Signature;
use tracing::{debug, info, warn};

use crate::config::IntentsConfig;
use crate::error::{KernelError, KernelResult};
use crate::intents::message::{IntentMessage, Nep413Payload, SignedNep413};
use crate::intents::relay::{IntentsSwapQuote, QuoteRequest, SolverRelayClient};
use crate::outcome::pick_ed25519;
use crate::proposal::{KernelClient, ProposalExecutionResult};
use crate::rpc::{view_json, ChainRpc};
use crate::types::{DerivedAccount, ProposalId, ProposalKind};

pub const MT_BALANCE_OF: &str = "mt_balance_of";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub asset_in: String,
    pub asset_out: String,
    pub amount_in: u128,
    /// Use this quote instead of asking the relay
    pub quote: Option<IntentsSwapQuote>,
    /// NEP-413 nonce; random when `None`
    pub nonce: Option<[u8; 32]>,
    pub wait_for_settlement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub proposal_id: ProposalId,
    pub intent_hash: String,
    pub quote: IntentsSwapQuote,
    pub signer: DerivedAccount,
    /// Balance increase observed on `asset_out`, when settlement was awaited
    pub settled_amount: Option<u128>,
}

/// Swaps through the intents solver network using a kernel-derived account.
pub struct IntentsSwap {
    kernel: KernelClient,
    relay: SolverRelayClient,
    config: IntentsConfig,
}

impl IntentsSwap {
    pub fn new(kernel: KernelClient, relay: SolverRelayClient, config: IntentsConfig) -> Self {
        Self {
            kernel,
            relay,
            config,
        }
    }

    pub fn from_config(kernel: KernelClient, config: IntentsConfig) -> KernelResult<Self> {
        let relay = SolverRelayClient::new(&config.solver_relay_url, &config.bridge_url)?;
        Ok(Self::new(kernel, relay, config))
    }

    pub fn relay(&self) -> &SolverRelayClient {
        &self.relay
    }

    /// Runs the full swap pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(SwapOutcome)` - Intent published (and settled, if awaited)
    /// * `Err(KernelError)` - First failing step; nothing is retried here. A
///   failed settlement wait is `SettlementUnconfirmed`, carrying the
///   published intent hash
    pub async fn execute(&self, request: SwapRequest) -> KernelResult<SwapOutcome> {
        let quote = match request.quote.clone() {
            Some(quote) => quote,
            None => {
                self.relay
                    .best_quote(&QuoteRequest {
                        defuse_asset_identifier_in: request.asset_in.clone(),
                        defuse_asset_identifier_out: request.asset_out.clone(),
                        exact_amount_in: request.amount_in.to_string(),
                        min_deadline_ms: self.config.min_deadline_ms,
                    })
                    .await?
            }
        };
        let (amount_in, amount_out) = check_quote(&quote, &request)?;
        info!(
            "Swapping {} {} for {} {} (quote {})",
            amount_in, quote.defuse_asset_identifier_in, amount_out, quote.defuse_asset_identifier_out, quote.quote_hash
        );

        let signer = self
            .kernel
            .derived_account(&self.config.derivation_path, None)
            .await?;
        debug!("Intent signer {} ({})", signer.address, signer.public_key);

        let message = IntentMessage::token_diff(
            &signer.address,
            &quote.expiration_time,
            &quote.defuse_asset_identifier_in,
            amount_in,
            &quote.defuse_asset_identifier_out,
            amount_out,
        )
        .to_json()?;
        let payload = Nep413Payload::new(
            message,
            request.nonce.unwrap_or_else(Nep413Payload::random_nonce),
            &self.config.intents_contract_id,
        );

        let baseline = if request.wait_for_settlement {
            Some(
                balance_of(
                    self.kernel.rpc().as_ref(),
                    &self.config.intents_contract_id,
                    &signer.address,
                    &quote.defuse_asset_identifier_out,
                )
                .await?,
            )
        } else {
            None
        };

        let kind = ProposalKind::ChainSig {
            derivation_path: self.config.derivation_path.clone(),
            payload: payload.to_chain_sig_payload(),
        };
        let description = format!(
            "Swap {} {} for {}",
            amount_in, quote.defuse_asset_identifier_in, quote.defuse_asset_identifier_out
        );

        let (proposal_id, signatures) = match self
            .kernel
            .propose(&self.config.policy_id, &description, &kind)
            .await?
        {
            ProposalExecutionResult::Executed {
                proposal_id,
                signatures,
                ..
            } => (proposal_id, signatures),
            ProposalExecutionResult::Pending { proposal_id, .. } => {
                return Err(KernelError::SwapRequiresVoting { proposal_id })
            }
        };

        let signature = Signature::Ed25519(
            pick_ed25519(&signatures).ok_or(KernelError::MissingSignature { scheme: "ed25519" })?,
        );
        if !payload.verify(&signature, &signer.public_key)? {
            warn!(
                "Intent signature from proposal {} does not verify against {}",
                proposal_id, signer.public_key
            );
        }

        let signed = SignedNep413::new(&payload, &signer.public_key, signature.to_string());
        let intent_hash = self
            .relay
            .publish_intent(std::slice::from_ref(&quote.quote_hash), &signed)
            .await?;

        let settled_amount = match baseline {
            Some(baseline) => Some(
                wait_for_balance(
                    self.kernel.rpc().as_ref(),
                    &self.config.intents_contract_id,
                    &signer.address,
                    &quote.defuse_asset_identifier_out,
                    baseline,
                    &self.config.settle_schedule(),
                )
                .await
                .map_err(|e| KernelError::SettlementUnconfirmed {
                    proposal_id,
                    intent_hash: intent_hash.clone(),
                    source: Box::new(e),
                })?,
            ),
            None => None,
        };

        Ok(SwapOutcome {
            proposal_id,
            intent_hash,
            quote,
            signer,
            settled_amount,
        })
    }
}

/// Checks a quote against the request and parses its amounts.
fn check_quote(quote: &IntentsSwapQuote, request: &SwapRequest) -> KernelResult<(u128, u128)> {
    if quote.defuse_asset_identifier_in != request.asset_in
        || quote.defuse_asset_identifier_out != request.asset_out
    {
        return Err(KernelError::InvalidQuote(format!(
            "quote {} is for {} -> {}, requested {} -> {}",
            quote.quote_hash,
            quote.defuse_asset_identifier_in,
            quote.defuse_asset_identifier_out,
            request.asset_in,
            request.asset_out
        )));
    }
    let parse = |value: &str, field: &str| {
        value.parse::<u128>().map_err(|_| {
            KernelError::InvalidQuote(format!("{} '{}' is not a decimal amount", field, value))
        })
    };
    Ok((parse(&quote.amount_in, "amount_in")?, parse(&quote.amount_out, "amount_out")?))
}

/// Intents balance of `account_id` for `token_id`.
pub async fn balance_of(
    rpc: &dyn ChainRpc,
    intents_contract_id: &str,
    account_id: &str,
    token_id: &str,
) -> KernelResult<u128> {
    let balance: String = view_json(
        rpc,
        intents_contract_id,
        MT_BALANCE_OF,
        &serde_json::json!({ "account_id": account_id, "token_id": token_id }),
    )
    .await?;
    balance.parse().map_err(|_| {
        KernelError::invalid_response(
            format!("{}.{}", intents_contract_id, MT_BALANCE_OF),
            format!("'{}' is not a decimal amount", balance),
        )
    })
}

/// Polls the intents balance until it exceeds `baseline` and returns the
/// increase. Transport failures count as "not yet" until the deadline.
pub async fn wait_for_balance(
    rpc: &dyn ChainRpc,
    intents_contract_id: &str,
    account_id: &str,
    token_id: &str,
    baseline: u128,
    schedule: &PollSchedule,
) -> KernelResult<u128> {
    info!(
        "Waiting for {} balance of {} to exceed {}",
        token_id, account_id, baseline
    );
    let delta = poll_until(schedule, || async {
        let balance = match balance_of(rpc, intents_contract_id, account_id, token_id).await {
            Ok(balance) => balance,
            Err(e) if e.is_transient() => {
                warn!("Balance check failed, polling again: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok::<_, KernelError>(balance.checked_sub(baseline).filter(|delta| *delta > 0))
    })
    .await
    .map_err(|e| match e {
        PollError::Timeout { elapsed } => KernelError::Timeout { elapsed },
        PollError::Check(e) => e,
    })?;

    info!("Settled: {} {} received", delta, token_id);
    Ok(delta)
}
