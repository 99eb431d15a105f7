use bitcoin::Network;

use crate::error::BtcError;

/// Default REST endpoint for mainnet.
pub const MAINNET_ENDPOINT: &str = "https://blockstream.info/api";

/// Default REST endpoint for testnet.
pub const TESTNET_ENDPOINT: &str = "https://blockstream.info/testnet/api";

/// Default endpoint for a local regtest node.
pub const REGTEST_ENDPOINT: &str = "http://127.0.0.1:3002";

/// Supported networks of the unspent-output ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
            BtcNetwork::Regtest => Network::Regtest,
        }
    }

    /// SLIP-44 coin type encoded in derivation paths.
    pub fn coin_type(self) -> u32 {
        match self {
            BtcNetwork::Mainnet => 0,
            BtcNetwork::Testnet | BtcNetwork::Regtest => 1,
        }
    }

    /// Human-readable part of native SegWit addresses.
    pub fn bech32_hrp(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => "bc",
            BtcNetwork::Testnet => "tb",
            BtcNetwork::Regtest => "bcrt",
        }
    }

    /// Leading characters allowed for base58 (P2PKH / P2SH) addresses.
    pub fn legacy_prefixes(self) -> &'static [char] {
        match self {
            BtcNetwork::Mainnet => &['1', '3'],
            BtcNetwork::Testnet | BtcNetwork::Regtest => &['m', 'n', '2'],
        }
    }

    /// Return the default endpoint for this network.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => MAINNET_ENDPOINT,
            BtcNetwork::Testnet => TESTNET_ENDPOINT,
            BtcNetwork::Regtest => REGTEST_ENDPOINT,
        }
    }
}

impl std::str::FromStr for BtcNetwork {
    type Err = BtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" | "bitcoin" => Ok(BtcNetwork::Mainnet),
            "test" | "testnet" => Ok(BtcNetwork::Testnet),
            "local" | "regtest" => Ok(BtcNetwork::Regtest),
            other => Err(BtcError::InvalidNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtcNetwork::Mainnet => write!(f, "mainnet"),
            BtcNetwork::Testnet => write!(f, "testnet"),
            BtcNetwork::Regtest => write!(f, "regtest"),
        }
    }
}
