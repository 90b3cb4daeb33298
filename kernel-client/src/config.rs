//! Configuration Management Module
//!
//! Loads and validates the kernel client configuration: chain endpoint, the
//! wallet account that submits proposals, the kernel contract, submission
//! retry policy, and the intents swap settings.

use chain_clients_common::{PollSchedule, RetryPolicy};
use chain_clients_near::InMemorySigner;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "KERNEL_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/kernel.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Chain endpoint
    pub network: NetworkConfig,
    /// Wallet account used to submit proposals and votes
    pub account: AccountConfig,
    /// Kernel contract and default call options
    pub kernel: KernelContractConfig,
    /// Retry policy around proposal submission
    #[serde(default)]
    pub submit: SubmitConfig,
    /// Intents swap settings (optional, only needed for `swap`)
    #[serde(default)]
    pub intents: Option<IntentsConfig>,
}

/// Chain RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL (e.g., "https://rpc.testnet.near.org")
    pub rpc_url: String,
    /// Network label, used for logging only (e.g., "testnet")
    #[serde(default = "default_network_id")]
    pub network_id: String,
}

/// Wallet account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account id that signs kernel calls
    pub account_id: String,
    /// Environment variable holding the account's secret key (`ed25519:<base58>`)
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

/// Kernel contract and default function-call options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelContractConfig {
    /// Kernel contract account id
    pub contract_id: String,
    /// Gas attached to kernel calls
    #[serde(default = "default_gas")]
    pub gas: u64,
    /// Deposit (yoctoNEAR) attached to kernel calls, as a decimal string
    #[serde(default = "default_deposit")]
    pub deposit: String,
}

/// Bounded retry around proposal submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Intents swap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentsConfig {
    /// Solver relay JSON-RPC endpoint (quote, publish_intent)
    #[serde(default = "default_solver_relay_url")]
    pub solver_relay_url: String,
    /// Bridge service JSON-RPC endpoint (deposit_address)
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Intents contract; also the NEP-413 recipient
    #[serde(default = "default_intents_contract_id")]
    pub intents_contract_id: String,
    /// Derivation path of the chain-signature account that signs intents
    pub derivation_path: String,
    /// Policy the signing proposal is submitted under
    pub policy_id: String,
    /// Minimum quote validity requested from solvers
    #[serde(default = "default_min_deadline_ms")]
    pub min_deadline_ms: u64,
    /// Upper bound on waiting for settlement
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    /// Balance polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl IntentsConfig {
    pub fn settle_schedule(&self) -> PollSchedule {
        PollSchedule::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.settle_timeout_ms),
        )
    }
}

fn default_network_id() -> String {
    "mainnet".to_string()
}

fn default_private_key_env() -> String {
    "KERNEL_ACCOUNT_PRIVATE_KEY".to_string()
}

fn default_gas() -> u64 {
    300_000_000_000_000
}

fn default_deposit() -> String {
    "0".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_solver_relay_url() -> String {
    "https://solver-relay-v2.chaindefuser.com/rpc".to_string()
}

fn default_bridge_url() -> String {
    "https://bridge.chaindefuser.com/rpc".to_string()
}

fn default_intents_contract_id() -> String {
    "intents.near".to_string()
}

fn default_min_deadline_ms() -> u64 {
    60_000
}

fn default_settle_timeout_ms() -> u64 {
    120_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl KernelConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Path priority: explicit `path`, then the `KERNEL_CONFIG_PATH`
    /// environment variable, then `config/kernel.toml`.
    ///
    /// # Returns
    ///
    /// * `Ok(KernelConfig)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/kernel.template.toml config/kernel.toml\n\
                Then edit config/kernel.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: KernelConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - RPC, relay and bridge URLs parse
    /// - Account and contract ids are valid NEAR account ids
    /// - Deposit is a decimal u128
    /// - Retry and polling settings are non-zero
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_url(&self.network.rpc_url, "network.rpc_url")?;
        validate_account_id(&self.account.account_id, "account.account_id")?;
        validate_account_id(&self.kernel.contract_id, "kernel.contract_id")?;

        self.kernel.deposit.parse::<u128>().map_err(|_| {
            anyhow::anyhow!(
                "Configuration error: kernel.deposit '{}' is not a decimal amount",
                self.kernel.deposit
            )
        })?;

        if self.kernel.gas == 0 {
            anyhow::bail!("Configuration error: kernel.gas must be positive");
        }
        if self.submit.retry_attempts == 0 {
            anyhow::bail!("Configuration error: submit.retry_attempts must be at least 1");
        }

        if let Some(intents) = &self.intents {
            validate_url(&intents.solver_relay_url, "intents.solver_relay_url")?;
            validate_url(&intents.bridge_url, "intents.bridge_url")?;
            validate_account_id(&intents.intents_contract_id, "intents.intents_contract_id")?;
            if intents.derivation_path.trim().is_empty() {
                anyhow::bail!("Configuration error: intents.derivation_path must not be empty");
            }
            if intents.policy_id.trim().is_empty() {
                anyhow::bail!("Configuration error: intents.policy_id must not be empty");
            }
            if intents.poll_interval_ms == 0 || intents.settle_timeout_ms == 0 {
                anyhow::bail!(
                    "Configuration error: intents.poll_interval_ms and intents.settle_timeout_ms must be positive"
                );
            }
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.submit.retry_attempts,
            Duration::from_millis(self.submit.retry_delay_ms),
        )
    }

    pub fn deposit(&self) -> u128 {
        // validated in validate()
        self.kernel.deposit.parse().unwrap_or(0)
    }

    /// Builds the wallet signer from the secret key in the configured
    /// environment variable.
    pub fn wallet_signer(&self) -> anyhow::Result<InMemorySigner> {
        let secret = std::env::var(&self.account.private_key_env).map_err(|_| {
            anyhow::anyhow!("{} not set", self.account.private_key_env)
        })?;
        InMemorySigner::from_secret_key(self.account.account_id.clone(), secret.trim())
    }
}

fn validate_url(value: &str, field: &str) -> anyhow::Result<()> {
    url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("Configuration error: {} '{}' is not a valid URL: {}", field, value, e))?;
    Ok(())
}

const SEPARATORS: &[char] = &['.', '-', '_'];

/// Validates NEAR account id syntax: 2-64 chars of lowercase alphanumerics
/// separated by single `.`, `-` or `_`.
pub fn validate_account_id(value: &str, field: &str) -> anyhow::Result<()> {
    let valid_len = (2..=64).contains(&value.len());
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
    let valid_separators = !value.starts_with(SEPARATORS)
        && !value.ends_with(SEPARATORS)
        && !value
            .as_bytes()
            .windows(2)
            .any(|w| matches!(w[0], b'.' | b'-' | b'_') && matches!(w[1], b'.' | b'-' | b'_'));

    if valid_len && valid_chars && valid_separators {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Configuration error: {} '{}' is not a valid account id",
            field,
            value
        ))
    }
}
