//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};

pub const DEFAULT_CLIENT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_LEDGER_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_CHAIN_ID: u64 = 1337;
pub const DEFAULT_SHIELD_CONTRACT: &str = "Shield";

/// Atomic lock construction settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Resampling rounds before giving up on a lock value
    pub max_attempts: u32,
    /// Seconds between the lock's block timestamp and its expiry
    pub expiry_horizon_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_attempts: 32,
            expiry_horizon_secs: 3600,
        }
    }
}

/// Broadcast worker settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval_ms: u64,
    /// Submitted transactions whose receipts may be awaited at once
    pub max_in_flight: usize,
    /// Unread outcomes kept before new ones are dropped
    pub event_capacity: usize,
}

impl BroadcastConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            receipt_poll_attempts: 120,
            receipt_poll_interval_ms: 1000,
            max_in_flight: 16,
            event_capacity: 256,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Prover/coordinator base URL
    pub client_api_url: String,
    /// Transaction worker, used for transaction and commitment queries when set
    pub client_api_tx_url: Option<String>,
    /// Block-proposed worker, used for viewing key subscription when set
    pub client_api_bp_url: Option<String>,
    pub ledger_rpc_url: String,
    pub chain_id: u64,
    /// Hex private key. Without one, the node-managed account signs.
    pub ethereum_private_key: Option<String>,
    /// bip39 phrase. Without one, a fresh mnemonic is generated.
    pub nightfall_mnemonic: Option<String>,
    pub shield_contract_name: String,
    pub lock: LockConfig,
    pub broadcast: BroadcastConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            client_api_url: DEFAULT_CLIENT_API_URL.to_string(),
            client_api_tx_url: None,
            client_api_bp_url: None,
            ledger_rpc_url: DEFAULT_LEDGER_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            ethereum_private_key: None,
            nightfall_mnemonic: None,
            shield_contract_name: DEFAULT_SHIELD_CONTRACT.to_string(),
            lock: LockConfig::default(),
            broadcast: BroadcastConfig::default(),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SdkError::InvalidConfig(format!("{}={}: {}", name, raw, e)))
}

impl SdkConfig {
    pub fn new(client_api_url: impl Into<String>, ledger_rpc_url: impl Into<String>) -> Self {
        Self {
            client_api_url: client_api_url.into(),
            ledger_rpc_url: ledger_rpc_url.into(),
            ..Self::default()
        }
    }

    pub fn with_tx_worker(mut self, url: impl Into<String>) -> Self {
        self.client_api_tx_url = non_empty(url.into());
        self
    }

    pub fn with_bp_worker(mut self, url: impl Into<String>) -> Self {
        self.client_api_bp_url = non_empty(url.into());
        self
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.ethereum_private_key = non_empty(key.into());
        self
    }

    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.nightfall_mnemonic = non_empty(mnemonic.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Defaults overridden by `SHIELDLINK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("SHIELDLINK_CLIENT_API_URL") {
            config.client_api_url = v;
        }
        config.client_api_tx_url = lookup("SHIELDLINK_CLIENT_API_TX_URL").and_then(non_empty);
        config.client_api_bp_url = lookup("SHIELDLINK_CLIENT_API_BP_URL").and_then(non_empty);
        if let Some(v) = lookup("SHIELDLINK_LEDGER_RPC_URL") {
            config.ledger_rpc_url = v;
        }
        if let Some(v) = lookup("SHIELDLINK_CHAIN_ID") {
            config.chain_id = parse_var("SHIELDLINK_CHAIN_ID", &v)?;
        }
        config.ethereum_private_key =
            lookup("SHIELDLINK_ETHEREUM_PRIVATE_KEY").and_then(non_empty);
        config.nightfall_mnemonic = lookup("SHIELDLINK_NIGHTFALL_MNEMONIC").and_then(non_empty);
        if let Some(v) = lookup("SHIELDLINK_SHIELD_CONTRACT_NAME") {
            config.shield_contract_name = v;
        }
        if let Some(v) = lookup("SHIELDLINK_LOCK_MAX_ATTEMPTS") {
            config.lock.max_attempts = parse_var("SHIELDLINK_LOCK_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("SHIELDLINK_LOCK_EXPIRY_SECS") {
            config.lock.expiry_horizon_secs = parse_var("SHIELDLINK_LOCK_EXPIRY_SECS", &v)?;
        }
        if let Some(v) = lookup("SHIELDLINK_RECEIPT_POLL_ATTEMPTS") {
            config.broadcast.receipt_poll_attempts =
                parse_var("SHIELDLINK_RECEIPT_POLL_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("SHIELDLINK_RECEIPT_POLL_INTERVAL_MS") {
            config.broadcast.receipt_poll_interval_ms =
                parse_var("SHIELDLINK_RECEIPT_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("SHIELDLINK_BROADCAST_MAX_IN_FLIGHT") {
            config.broadcast.max_in_flight = parse_var("SHIELDLINK_BROADCAST_MAX_IN_FLIGHT", &v)?;
        }
        if let Some(v) = lookup("SHIELDLINK_BROADCAST_EVENT_CAPACITY") {
            config.broadcast.event_capacity =
                parse_var("SHIELDLINK_BROADCAST_EVENT_CAPACITY", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_api_url.trim().is_empty() {
            return Err(SdkError::InvalidConfig("client_api_url is empty".to_string()));
        }
        if self.ledger_rpc_url.trim().is_empty() {
            return Err(SdkError::InvalidConfig("ledger_rpc_url is empty".to_string()));
        }
        if self.shield_contract_name.trim().is_empty() {
            return Err(SdkError::InvalidConfig(
                "shield_contract_name is empty".to_string(),
            ));
        }
        if self.lock.max_attempts == 0 {
            return Err(SdkError::InvalidConfig(
                "lock.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.broadcast.max_in_flight == 0 || self.broadcast.event_capacity == 0 {
            return Err(SdkError::InvalidConfig(
                "broadcast.max_in_flight and broadcast.event_capacity must be at least 1"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL for transaction and commitment endpoints
    pub fn tx_api_url(&self) -> &str {
        self.client_api_tx_url
            .as_deref()
            .unwrap_or(&self.client_api_url)
    }

    /// Base URL for viewing key subscription
    pub fn bp_api_url(&self) -> &str {
        self.client_api_bp_url
            .as_deref()
            .unwrap_or(&self.client_api_url)
    }
}
