//! Proposal Lifecycle Orchestrator
//!
//! Drives a kernel proposal from submission to a terminal client-side state:
//!
//! ```text
//! Start -> Submitted -> Executed     (signatures extracted, optionally finalized)
//!                    -> PendingVotes -> vote -> Executed | PendingVotes
//!                                    -> cancel
//! ```
//!
//! Nothing is cached between calls. Pending proposals are always returned
//! together with a snapshot fetched after the transaction landed.

use chain_clients_common::{retry, RetryPolicy};
use chain_clients_near::{Action, FinalExecutionOutcome, InMemorySigner, NearRpcClient, SignedTransaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builder::{fetch_derived_account, BuiltTransaction, SignerDescriptor, TransactionBuilder};
use crate::chainsig::{BroadcastReceipt, ChainSigAdapter, NearChainSigAdapter};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::outcome::{classify, ensure_success, extract_proposal_id, extract_signatures};
use crate::rpc::{view_json, ChainRpc};
use crate::signature::ThresholdSignature;
use crate::types::{
    methods, ChainSigPayload, CreateProposalArgs, DerivedAccount, Policy, Proposal, ProposalId,
    ProposalKind, Vote,
};

/// Client-side result of a proposal transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalExecutionResult {
    /// The proposal's action ran; any threshold signatures it produced are attached.
    Executed {
        proposal_id: ProposalId,
        signatures: Vec<ThresholdSignature>,
        tx_hash: String,
    },
    /// The proposal is waiting for votes.
    Pending {
        proposal_id: ProposalId,
        proposal: Proposal,
    },
}

impl ProposalExecutionResult {
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            ProposalExecutionResult::Executed { proposal_id, .. }
            | ProposalExecutionResult::Pending { proposal_id, .. } => *proposal_id,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, ProposalExecutionResult::Executed { .. })
    }
}

/// Result of a chain-signature transaction request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSigTransaction {
    /// Signing proposal awaits votes; finish with [`KernelClient::vote_and_finalize`].
    Pending {
        proposal_id: ProposalId,
        proposal: Proposal,
        unsigned: BuiltTransaction,
    },
    Signed {
        proposal_id: ProposalId,
        signed: SignedTransaction,
        /// `None` when broadcasting was not requested
        broadcast: Option<BroadcastReceipt<FinalExecutionOutcome>>,
    },
}

/// Signing proposal finished through a [`ChainSigAdapter`].
pub enum SignedProposal<A: ChainSigAdapter> {
    /// Waiting for votes; `unsigned` is handed back for a later
    /// [`KernelClient::vote_and_finalize_with`].
    Pending {
        proposal_id: ProposalId,
        proposal: Proposal,
        unsigned: A::Unsigned,
    },
    Signed {
        proposal_id: ProposalId,
        signed: A::Signed,
        broadcast: Option<BroadcastReceipt<A::Outcome>>,
    },
}

/// Kernel contract call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelCallOptions {
    pub contract_id: String,
    pub gas: u64,
    pub deposit: u128,
}

/// Entry point for every kernel interaction.
#[derive(Clone)]
pub struct KernelClient {
    rpc: Arc<dyn ChainRpc>,
    signer: InMemorySigner,
    options: KernelCallOptions,
    retry_policy: RetryPolicy,
    builder: TransactionBuilder,
}

impl KernelClient {
    pub fn new(rpc: Arc<dyn ChainRpc>, signer: InMemorySigner, options: KernelCallOptions) -> Self {
        let builder = TransactionBuilder::new(rpc.clone(), options.contract_id.clone())
            .with_wallet(signer.account_id.clone(), signer.public_key());
        Self {
            rpc,
            signer,
            options,
            retry_policy: RetryPolicy::default(),
            builder,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Creates a client over NEAR JSON-RPC from a loaded configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(KernelClient)` - Ready-to-use client
    /// * `Err(anyhow::Error)` - HTTP client or wallet key could not be created
    pub fn from_config(config: &KernelConfig) -> anyhow::Result<Self> {
        let rpc: Arc<dyn ChainRpc> = Arc::new(NearRpcClient::new(&config.network.rpc_url)?);
        let signer = config.wallet_signer()?;
        let options = KernelCallOptions {
            contract_id: config.kernel.contract_id.clone(),
            gas: config.kernel.gas,
            deposit: config.deposit(),
        };
        Ok(Self::new(rpc, signer, options).with_retry_policy(config.retry_policy()))
    }

    pub fn rpc(&self) -> Arc<dyn ChainRpc> {
        self.rpc.clone()
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn kernel_contract_id(&self) -> &str {
        &self.options.contract_id
    }

    /// Account that signs kernel calls.
    pub fn account_id(&self) -> &str {
        &self.signer.account_id
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    /// Signs and submits one kernel function call with the wallet key.
    async fn call_kernel(&self, method: &str, args: serde_json::Value) -> KernelResult<FinalExecutionOutcome> {
        let action = Action::function_call(method, &args, self.options.gas, self.options.deposit)
            .map_err(KernelError::Encoding)?;
        let built = self
            .builder
            .build(&self.options.contract_id, vec![action], &SignerDescriptor::Wallet)
            .await?;
        let signed = self
            .signer
            .sign_transaction(built.transaction)
            .map_err(KernelError::Encoding)?;
        let encoded = signed.to_base64().map_err(KernelError::Encoding)?;

        debug!("Submitting {}.{} ({})", self.options.contract_id, method, built.hash);
        let outcome = self.rpc.send_transaction(&encoded).await?;
        ensure_success(&outcome)?;
        Ok(outcome)
    }

    /// Submits a proposal under `policy_id` and classifies the result.
    ///
    /// Submission is retried on transport failures only. Before every retry
    /// the proposals created since the first attempt are fetched. If one of
    /// them is this exact request from this account, no second proposal is
    /// created: a pending one is returned as is, anything else fails with
    /// `AmbiguousSubmission`.
    pub async fn propose(
        &self,
        policy_id: &str,
        description: &str,
        kind: &ProposalKind,
    ) -> KernelResult<ProposalExecutionResult> {
        info!(
            "Proposing {} under policy {} on {}",
            kind.label(),
            policy_id,
            self.options.contract_id
        );

        let baseline = match self.last_proposal_id().await {
            Ok(last) => Some(last),
            Err(e) => {
                warn!("Could not read last proposal id, retries will not be de-duplicated: {}", e);
                None
            }
        };

        let result = retry(&self.retry_policy, KernelError::is_transient, |attempt| {
            self.propose_attempt(attempt, baseline, policy_id, description, kind)
        })
        .await?;

        match &result {
            ProposalExecutionResult::Executed { proposal_id, signatures, .. } => info!(
                "Proposal {} executed ({} signature(s))",
                proposal_id,
                signatures.len()
            ),
            ProposalExecutionResult::Pending { proposal_id, proposal } => info!(
                "Proposal {} pending, {} more approval(s) needed",
                proposal_id,
                proposal.remaining_votes()
            ),
        }
        Ok(result)
    }

    async fn propose_attempt(
        &self,
        attempt: u32,
        baseline: Option<Option<ProposalId>>,
        policy_id: &str,
        description: &str,
        kind: &ProposalKind,
    ) -> KernelResult<ProposalExecutionResult> {
        if attempt > 1 {
            if let Some(existing) = self
                .find_landed_proposal(baseline, policy_id, description, kind)
                .await?
            {
                return Ok(existing);
            }
        }

        let args = serde_json::to_value(CreateProposalArgs {
            policy_id,
            description,
            kind,
        })
        .map_err(|e| KernelError::Encoding(e.into()))?;
        let outcome = self.call_kernel(methods::CREATE_PROPOSAL, args).await?;
        self.resolve_outcome(&outcome, None).await
    }

    /// Looks for a proposal created after `baseline` that matches this
    /// request: same proposer, policy, description and kind. Every id in
    /// `(baseline, latest]` is checked, oldest first.
    async fn find_landed_proposal(
        &self,
        baseline: Option<Option<ProposalId>>,
        policy_id: &str,
        description: &str,
        kind: &ProposalKind,
    ) -> KernelResult<Option<ProposalExecutionResult>> {
        let Some(baseline) = baseline else {
            return Ok(None);
        };
        let Some(latest) = self.last_proposal_id().await? else {
            return Ok(None);
        };
        let first = match baseline {
            Some(id) => id.saturating_add(1),
            None => 0,
        };
        if first > latest {
            return Ok(None);
        }

        let expected_kind = serde_json::to_value(kind).map_err(|e| KernelError::Encoding(e.into()))?;
        debug!("Re-checking proposals {}..={} for an earlier attempt", first, latest);

        for id in first..=latest {
            let proposal = match self.get_proposal(id).await {
                Ok(proposal) => proposal,
                Err(KernelError::ProposalNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let matches = proposal.proposer == self.signer.account_id
                && proposal.policy_id == policy_id
                && proposal.description == description
                && proposal.kind == expected_kind;
            if !matches {
                continue;
            }

            warn!("Earlier attempt already created proposal {}", id);
            return if proposal.is_pending() {
                Ok(Some(ProposalExecutionResult::Pending {
                    proposal_id: id,
                    proposal,
                }))
            } else {
                Err(KernelError::AmbiguousSubmission { proposal_id: id })
            };
        }
        Ok(None)
    }

    /// Turns a proposal or vote outcome into a lifecycle result.
    ///
    /// `known_id` is used when the outcome carries no lifecycle event (votes
    /// on some kernel versions only log on state changes).
    pub async fn resolve_outcome(
        &self,
        outcome: &FinalExecutionOutcome,
        known_id: Option<ProposalId>,
    ) -> KernelResult<ProposalExecutionResult> {
        let proposal_id = match extract_proposal_id(outcome) {
            Ok(id) => id,
            Err(e) => known_id.ok_or(e)?,
        };

        if classify(outcome).is_executed() {
            return Ok(ProposalExecutionResult::Executed {
                proposal_id,
                signatures: extract_signatures(outcome),
                tx_hash: outcome.transaction_hash().to_string(),
            });
        }

        let proposal = self.get_proposal(proposal_id).await?;
        if !proposal.is_pending() {
            warn!(
                "Proposal {} classified as pending but on-chain status is {:?}",
                proposal_id, proposal.status
            );
        }
        Ok(ProposalExecutionResult::Pending {
            proposal_id,
            proposal,
        })
    }

    /// Votes on a pending proposal and re-classifies.
    pub async fn vote(&self, proposal_id: ProposalId, vote: Vote) -> KernelResult<ProposalExecutionResult> {
        info!("Voting {:?} on proposal {}", vote, proposal_id);
        let outcome = self
            .call_kernel(
                methods::VOTE_ON_PROPOSAL,
                serde_json::json!({ "proposal_id": proposal_id, "vote": vote }),
            )
            .await?;
        self.resolve_outcome(&outcome, Some(proposal_id)).await
    }

    pub async fn approve(&self, proposal_id: ProposalId) -> KernelResult<ProposalExecutionResult> {
        self.vote(proposal_id, Vote::Approve).await
    }

    /// Cancels a pending proposal and returns its final snapshot.
    pub async fn cancel(&self, proposal_id: ProposalId) -> KernelResult<Proposal> {
        info!("Cancelling proposal {}", proposal_id);
        self.call_kernel(
            methods::CANCEL_PROPOSAL,
            serde_json::json!({ "proposal_id": proposal_id }),
        )
        .await?;
        self.get_proposal(proposal_id).await
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub async fn get_proposal(&self, proposal_id: ProposalId) -> KernelResult<Proposal> {
        let proposal: Option<Proposal> = view_json(
            self.rpc.as_ref(),
            &self.options.contract_id,
            methods::GET_PROPOSAL,
            &serde_json::json!({ "proposal_id": proposal_id }),
        )
        .await?;
        proposal.ok_or(KernelError::ProposalNotFound(proposal_id))
    }

    pub async fn last_proposal_id(&self) -> KernelResult<Option<ProposalId>> {
        view_json(
            self.rpc.as_ref(),
            &self.options.contract_id,
            methods::GET_LAST_PROPOSAL_ID,
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn policy(&self, policy_id: &str) -> KernelResult<Option<Policy>> {
        view_json(
            self.rpc.as_ref(),
            &self.options.contract_id,
            methods::GET_POLICY,
            &serde_json::json!({ "policy_id": policy_id }),
        )
        .await
    }

    pub async fn derived_account(&self, derivation_path: &str, chain: Option<&str>) -> KernelResult<DerivedAccount> {
        fetch_derived_account(self.rpc.as_ref(), &self.options.contract_id, derivation_path, chain).await
    }

    // ------------------------------------------------------------------------
    // Chain signatures
    // ------------------------------------------------------------------------

    /// Finalizes `unsigned` with the signatures of an executed proposal.
    /// `None` when the proposal is pending or produced no signatures.
    pub fn finalize_with<A: ChainSigAdapter>(
        adapter: &A,
        unsigned: A::Unsigned,
        result: &ProposalExecutionResult,
    ) -> KernelResult<Option<A::Signed>> {
        match result {
            ProposalExecutionResult::Executed { signatures, .. } if !signatures.is_empty() => {
                adapter.finalize(unsigned, signatures).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Proposes a chain-signature request and, when the proposal executes,
    /// finalizes `unsigned` with `adapter` and broadcasts it if asked to.
    pub async fn propose_and_finalize<A: ChainSigAdapter>(
        &self,
        adapter: &A,
        policy_id: &str,
        description: &str,
        kind: &ProposalKind,
        unsigned: A::Unsigned,
        broadcast: bool,
    ) -> KernelResult<SignedProposal<A>> {
        let result = self.propose(policy_id, description, kind).await?;
        self.finish_with(adapter, result, unsigned, broadcast).await
    }

    /// Approves a pending signing proposal and finalizes it with `adapter`
    /// if the vote executed it.
    pub async fn vote_and_finalize_with<A: ChainSigAdapter>(
        &self,
        adapter: &A,
        proposal_id: ProposalId,
        unsigned: A::Unsigned,
        broadcast: bool,
    ) -> KernelResult<SignedProposal<A>> {
        let result = self.approve(proposal_id).await?;
        self.finish_with(adapter, result, unsigned, broadcast).await
    }

    async fn finish_with<A: ChainSigAdapter>(
        &self,
        adapter: &A,
        result: ProposalExecutionResult,
        unsigned: A::Unsigned,
        broadcast: bool,
    ) -> KernelResult<SignedProposal<A>> {
        if let ProposalExecutionResult::Pending { proposal_id, proposal } = result {
            return Ok(SignedProposal::Pending {
                proposal_id,
                proposal,
                unsigned,
            });
        }

        let proposal_id = result.proposal_id();
        let signed = Self::finalize_with(adapter, unsigned, &result)?.ok_or(KernelError::MissingSignature {
            scheme: adapter.scheme().as_str(),
        })?;
        debug!("Finalized proposal {} for {:?}", proposal_id, adapter.family());

        let broadcast = if broadcast {
            Some(adapter.broadcast(&signed).await?)
        } else {
            None
        };

        Ok(SignedProposal::Signed {
            proposal_id,
            signed,
            broadcast,
        })
    }

    /// Requests a kernel signature for a NEAR transaction sent from the
    /// account derived at `derivation_path`.
    ///
    /// Flow: build unsigned -> propose `ChainSig` -> (executed) finalize ->
    /// broadcast if requested.
    pub async fn sign_transaction(
        &self,
        policy_id: &str,
        description: &str,
        derivation_path: &str,
        receiver_id: &str,
        actions: Vec<Action>,
        broadcast: bool,
    ) -> KernelResult<ChainSigTransaction> {
        let unsigned = self
            .builder
            .build(
                receiver_id,
                actions,
                &SignerDescriptor::ChainSig {
                    derivation_path: derivation_path.to_string(),
                    network: None,
                },
            )
            .await?;

        let kind = ProposalKind::ChainSig {
            derivation_path: derivation_path.to_string(),
            payload: ChainSigPayload::NearTransaction {
                tx_base64: unsigned.encoded_base64.clone(),
            },
        };

        let adapter = NearChainSigAdapter::new(self.rpc.clone());
        let finished = self
            .propose_and_finalize(
                &adapter,
                policy_id,
                description,
                &kind,
                unsigned.transaction.clone(),
                broadcast,
            )
            .await?;
        Ok(near_transaction(finished, unsigned))
    }

    /// [`Self::vote_and_finalize_with`] for NEAR transactions from
    /// [`Self::sign_transaction`].
    pub async fn vote_and_finalize(
        &self,
        proposal_id: ProposalId,
        unsigned: BuiltTransaction,
        broadcast: bool,
    ) -> KernelResult<ChainSigTransaction> {
        let adapter = NearChainSigAdapter::new(self.rpc.clone());
        let finished = self
            .vote_and_finalize_with(&adapter, proposal_id, unsigned.transaction.clone(), broadcast)
            .await?;
        Ok(near_transaction(finished, unsigned))
    }
}

fn near_transaction(finished: SignedProposal<NearChainSigAdapter>, unsigned: BuiltTransaction) -> ChainSigTransaction {
    match finished {
        SignedProposal::Pending {
            proposal_id,
            proposal,
            ..
        } => ChainSigTransaction::Pending {
            proposal_id,
            proposal,
            unsigned,
        },
        SignedProposal::Signed {
            proposal_id,
            signed,
            broadcast,
        } => ChainSigTransaction::Signed {
            proposal_id,
            signed,
            broadcast,
        },
    }
}
