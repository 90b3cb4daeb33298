//! Kernel CLI
//!
//! Submits, votes on and inspects kernel proposals, requests chain signatures
//! and runs intents swaps.
//!
//! ## Usage
//!
//! ```bash
//! kernel --config config/kernel.toml propose-transfer --policy treasury --receiver bob.near --amount 1000
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! KERNEL_CONFIG_PATH=config/kernel.toml kernel status --proposal-id 7
//! ```

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_clients_near::Action;
use clap::{Parser, Subcommand};
use kernel_client::{
    config::CONFIG_PATH_ENV,
    intents::{IntentsSwap, SwapRequest},
    types::FunctionCallSpec,
    ChainSigTransaction, KernelClient, KernelConfig, ProposalExecutionResult, ProposalKind, Vote,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kernel")]
#[command(about = "Client for the policy kernel contract")]
struct Args {
    /// Path to configuration file (default: config/kernel.toml or KERNEL_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propose a native token transfer from the kernel account
    ProposeTransfer {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        receiver: String,
        /// Amount in yoctoNEAR
        #[arg(long)]
        amount: u128,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Propose a function call from the kernel account
    ProposeCall {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        receiver: String,
        #[arg(long)]
        method: String,
        /// JSON arguments
        #[arg(long, default_value = "{}")]
        args: String,
        #[arg(long, default_value_t = 100_000_000_000_000)]
        gas: u64,
        #[arg(long, default_value_t = 0)]
        deposit: u128,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Vote on a pending proposal (approve unless --reject)
    Vote {
        #[arg(long)]
        proposal_id: u64,
        #[arg(long)]
        reject: bool,
    },
    /// Cancel a pending proposal
    Cancel {
        #[arg(long)]
        proposal_id: u64,
    },
    /// Show a proposal (the latest one when no id is given)
    Status {
        #[arg(long)]
        proposal_id: Option<u64>,
    },
    /// Show a policy
    Policy {
        #[arg(long)]
        policy_id: String,
    },
    /// Transfer from a kernel-derived account through a chain-signature proposal
    SignTx {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        derivation_path: String,
        #[arg(long)]
        receiver: String,
        /// Amount in yoctoNEAR
        #[arg(long)]
        amount: u128,
        #[arg(long, default_value = "")]
        description: String,
        /// Print the signed transaction instead of sending it
        #[arg(long)]
        no_broadcast: bool,
    },
    /// Swap through the intents solver network
    Swap {
        #[arg(long)]
        asset_in: String,
        #[arg(long)]
        asset_out: String,
        #[arg(long)]
        amount_in: u128,
        /// Wait for the output balance to arrive
        #[arg(long)]
        wait: bool,
    },
    /// Look up a bridge deposit address
    DepositAddress {
        #[arg(long)]
        account: String,
        /// Chain identifier, e.g. "eth:1"
        #[arg(long)]
        chain: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if args.config.is_none() {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path);
        }
    }
    let config = KernelConfig::load_from_path(args.config.as_deref())?;
    info!(
        "Kernel {} on {} ({}) as {}",
        config.kernel.contract_id, config.network.network_id, config.network.rpc_url, config.account.account_id
    );

    let client = KernelClient::from_config(&config)?;

    match args.command {
        Command::ProposeTransfer {
            policy,
            receiver,
            amount,
            description,
        } => {
            let kind = ProposalKind::Transfer {
                receiver_id: receiver,
                amount: amount.to_string(),
            };
            print_result(&client.propose(&policy, &description, &kind).await?);
        }
        Command::ProposeCall {
            policy,
            receiver,
            method,
            args,
            gas,
            deposit,
            description,
        } => {
            let parsed: serde_json::Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            let kind = ProposalKind::FunctionCall {
                receiver_id: receiver,
                actions: vec![FunctionCallSpec {
                    method_name: method,
                    args: STANDARD.encode(serde_json::to_vec(&parsed)?),
                    gas: gas.to_string(),
                    deposit: deposit.to_string(),
                }],
            };
            print_result(&client.propose(&policy, &description, &kind).await?);
        }
        Command::Vote { proposal_id, reject } => {
            let vote = if reject { Vote::Reject } else { Vote::Approve };
            print_result(&client.vote(proposal_id, vote).await?);
        }
        Command::Cancel { proposal_id } => {
            let proposal = client.cancel(proposal_id).await?;
            println!("{}", serde_json::to_string_pretty(&proposal)?);
        }
        Command::Status { proposal_id } => {
            let proposal_id = match proposal_id {
                Some(id) => id,
                None => client
                    .last_proposal_id()
                    .await?
                    .context("Kernel has no proposals yet")?,
            };
            let proposal = client.get_proposal(proposal_id).await?;
            println!("{}", serde_json::to_string_pretty(&proposal)?);
            println!("Remaining approvals: {}", proposal.remaining_votes());
        }
        Command::Policy { policy_id } => match client.policy(&policy_id).await? {
            Some(policy) => println!("{}", serde_json::to_string_pretty(&policy)?),
            None => println!("Policy {} not found", policy_id),
        },
        Command::SignTx {
            policy,
            derivation_path,
            receiver,
            amount,
            description,
            no_broadcast,
        } => {
            let result = client
                .sign_transaction(
                    &policy,
                    &description,
                    &derivation_path,
                    &receiver,
                    vec![Action::Transfer { deposit: amount }],
                    !no_broadcast,
                )
                .await?;
            match result {
                ChainSigTransaction::Pending {
                    proposal_id,
                    proposal,
                    unsigned,
                } => {
                    println!(
                        "Proposal {} pending ({} more approval(s) needed)",
                        proposal_id,
                        proposal.remaining_votes()
                    );
                    println!("Unsigned transaction: {}", unsigned.encoded_base64);
                }
                ChainSigTransaction::Signed {
                    proposal_id,
                    signed,
                    broadcast,
                } => {
                    println!("Proposal {} executed", proposal_id);
                    match broadcast {
                        Some(receipt) => println!("Broadcast transaction: {}", receipt.tx_hash),
                        None => println!("Signed transaction: {}", signed.to_base64()?),
                    }
                }
            }
        }
        Command::Swap {
            asset_in,
            asset_out,
            amount_in,
            wait,
        } => {
            let intents = config
                .intents
                .clone()
                .context("[intents] section is required for swaps")?;
            let swap = IntentsSwap::from_config(client, intents)?;
            let outcome = swap
                .execute(SwapRequest {
                    asset_in,
                    asset_out,
                    amount_in,
                    quote: None,
                    nonce: None,
                    wait_for_settlement: wait,
                })
                .await?;
            println!("Proposal: {}", outcome.proposal_id);
            println!("Intent hash: {}", outcome.intent_hash);
            println!("Quote: {} ({} -> {})", outcome.quote.quote_hash, outcome.quote.amount_in, outcome.quote.amount_out);
            if let Some(amount) = outcome.settled_amount {
                println!("Settled amount: {}", amount);
            }
        }
        Command::DepositAddress { account, chain } => {
            let intents = config
                .intents
                .clone()
                .context("[intents] section is required for deposit addresses")?;
            let swap = IntentsSwap::from_config(client, intents)?;
            let deposit = swap.relay().deposit_address(&account, &chain).await?;
            println!("{} ({})", deposit.address, deposit.chain);
        }
    }

    Ok(())
}

fn print_result(result: &ProposalExecutionResult) {
    match result {
        ProposalExecutionResult::Executed {
            proposal_id,
            signatures,
            tx_hash,
        } => {
            println!("Proposal {} executed in {}", proposal_id, tx_hash);
            for signature in signatures {
                println!("Signature: {}", signature);
            }
        }
        ProposalExecutionResult::Pending { proposal_id, proposal } => {
            println!(
                "Proposal {} pending: {}/{} approvals",
                proposal_id,
                proposal.approvals.len(),
                proposal.required_votes
            );
        }
    }
}
