//! Wallet configuration: JSON file plus environment overrides.

use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::types::{LedgerId, NetworkId};

pub const DEFAULT_GAS_MULTIPLIER_PERCENT: u32 = 125;

pub const ENV_NETWORK: &str = "WALLET_NETWORK";
pub const ENV_BTC_ENDPOINT: &str = "WALLET_BTC_ENDPOINT";
pub const ENV_ETH_ENDPOINT: &str = "WALLET_ETH_ENDPOINT";

/// How a native payment on an unspent-output ledger is funded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendStrategy {
    /// One transaction per consumed output, flat fee each.
    #[default]
    PerOutput,
    /// A single transaction over as many outputs as needed.
    Consolidated,
}

/// Per-ledger connection options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerOptions {
    /// Overrides the wallet-wide network for this ledger.
    pub network: Option<NetworkId>,
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the node API key.
    pub api_key_env: Option<String>,
    /// Fixed sat/vbyte rate instead of asking the node.
    pub fee_rate_override: Option<u64>,
}

impl LedgerOptions {
    fn is_customized(&self) -> bool {
        self.network.is_some()
            || self.endpoint.is_some()
            || self.api_key_env.is_some()
            || self.fee_rate_override.is_some()
    }
}

/// A network by name, or explicit connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSelector {
    Named(NetworkId),
    Custom(LedgerOptions),
}

impl From<NetworkId> for NetworkSelector {
    fn from(network: NetworkId) -> Self {
        NetworkSelector::Named(network)
    }
}

/// Connection target handed to a connector.
#[derive(Debug)]
pub struct ResolvedLedger {
    pub ledger: LedgerId,
    pub network: NetworkId,
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub fee_rate_override: Option<u64>,
}

impl NetworkSelector {
    /// Custom options without a network target the local node.
    pub fn resolve(&self, ledger: LedgerId) -> Result<ResolvedLedger, WalletError> {
        match self {
            NetworkSelector::Named(network) => Ok(ResolvedLedger {
                ledger,
                network: *network,
                endpoint: network.default_endpoint(ledger).to_string(),
                api_key: None,
                fee_rate_override: None,
            }),
            NetworkSelector::Custom(options) => {
                let network = options.network.unwrap_or(NetworkId::Local);
                let endpoint = options
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| network.default_endpoint(ledger).to_string());
                let api_key = match &options.api_key_env {
                    Some(var) => {
                        let value = std::env::var(var).map_err(|_| {
                            WalletError::Config(format!("{ledger} api key variable {var} is not set"))
                        })?;
                        Some(SecretString::from(value))
                    }
                    None => None,
                };
                Ok(ResolvedLedger {
                    ledger,
                    network,
                    endpoint,
                    api_key,
                    fee_rate_override: options.fee_rate_override,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: NetworkId,
    pub spend_strategy: SpendStrategy,
    pub gas_multiplier_percent: u32,
    pub bitcoin: LedgerOptions,
    pub ethereum: LedgerOptions,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::Main,
            spend_strategy: SpendStrategy::PerOutput,
            gas_multiplier_percent: DEFAULT_GAS_MULTIPLIER_PERCENT,
            bitcoin: LedgerOptions::default(),
            ethereum: LedgerOptions::default(),
        }
    }
}

impl WalletConfig {
    pub fn from_json_str(json: &str) -> Result<Self, WalletError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WalletError::Config(format!("invalid config: {e}")))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Applies `WALLET_NETWORK`, `WALLET_BTC_ENDPOINT` and
    /// `WALLET_ETH_ENDPOINT` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), WalletError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup(ENV_NETWORK) {
            self.network = network.parse()?;
        }
        if let Some(endpoint) = lookup(ENV_BTC_ENDPOINT) {
            self.bitcoin.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup(ENV_ETH_ENDPOINT) {
            self.ethereum.endpoint = Some(endpoint);
        }
        Ok(())
    }

    pub fn options(&self, ledger: LedgerId) -> &LedgerOptions {
        match ledger {
            LedgerId::Bitcoin => &self.bitcoin,
            LedgerId::Ethereum => &self.ethereum,
        }
    }

    /// Selector for `ledger`: the wallet network unless the ledger has its
    /// own options, which then inherit the wallet network when unset.
    pub fn selector(&self, ledger: LedgerId) -> NetworkSelector {
        let options = self.options(ledger);
        if !options.is_customized() {
            return NetworkSelector::Named(self.network);
        }
        let mut options = options.clone();
        options.network.get_or_insert(self.network);
        NetworkSelector::Custom(options)
    }

    pub(crate) fn check(&self) -> Result<(), WalletError> {
        if self.gas_multiplier_percent < 100 {
            return Err(WalletError::Config(format!(
                "gas_multiplier_percent must be at least 100, got {}",
                self.gas_multiplier_percent
            )));
        }
        Ok(())
    }
}
