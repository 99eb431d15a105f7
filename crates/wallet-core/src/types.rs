use std::fmt;
use std::str::FromStr;

use chain_btc::network::BtcNetwork;
use chain_eth::network::EthNetwork;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Ledgers the wallet can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerId {
    Bitcoin,
    Ethereum,
}

/// Transaction model of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFamily {
    /// Unspent-output model.
    Utxo,
    /// Account / nonce model.
    Account,
}

impl LedgerId {
    pub const ALL: [LedgerId; 2] = [LedgerId::Bitcoin, LedgerId::Ethereum];

    pub fn family(self) -> LedgerFamily {
        match self {
            LedgerId::Bitcoin => LedgerFamily::Utxo,
            LedgerId::Ethereum => LedgerFamily::Account,
        }
    }

    /// Ticker of the native asset, also the prefix of asset references.
    pub fn symbol(self) -> &'static str {
        match self {
            LedgerId::Bitcoin => "BTC",
            LedgerId::Ethereum => "ETH",
        }
    }

    /// Precision of the native asset.
    pub fn native_decimals(self) -> u8 {
        match self {
            LedgerId::Bitcoin => 8,
            LedgerId::Ethereum => 18,
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        LedgerId::ALL
            .into_iter()
            .find(|l| l.symbol().eq_ignore_ascii_case(symbol))
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerId::Bitcoin => write!(f, "bitcoin"),
            LedgerId::Ethereum => write!(f, "ethereum"),
        }
    }
}

/// Ledger-independent network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    #[default]
    #[serde(alias = "mainnet")]
    Main,
    #[serde(alias = "testnet")]
    Test,
    #[serde(alias = "regtest")]
    Local,
}

impl NetworkId {
    pub fn btc(self) -> BtcNetwork {
        match self {
            NetworkId::Main => BtcNetwork::Mainnet,
            NetworkId::Test => BtcNetwork::Testnet,
            NetworkId::Local => BtcNetwork::Regtest,
        }
    }

    pub fn eth(self) -> EthNetwork {
        match self {
            NetworkId::Main => EthNetwork::Mainnet,
            NetworkId::Test => EthNetwork::Sepolia,
            NetworkId::Local => EthNetwork::Local,
        }
    }

    /// Endpoint used when the configuration does not name one.
    pub fn default_endpoint(self, ledger: LedgerId) -> &'static str {
        match ledger {
            LedgerId::Bitcoin => self.btc().default_endpoint(),
            LedgerId::Ethereum => self.eth().default_endpoint(),
        }
    }
}

impl FromStr for NetworkId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(NetworkId::Main),
            "test" | "testnet" => Ok(NetworkId::Test),
            "local" | "regtest" => Ok(NetworkId::Local),
            other => Err(WalletError::Config(format!("unknown network '{other}'"))),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Main => write!(f, "main"),
            NetworkId::Test => write!(f, "test"),
            NetworkId::Local => write!(f, "local"),
        }
    }
}

/// Identifier of an issued asset: a numeric row id or an opaque text id
/// (contract address, token id hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Numeric(n) => write!(f, "{n}"),
            AssetId::Text(s) => f.write_str(s),
        }
    }
}

impl AssetId {
    /// Hex ids (contract addresses, token id hashes) compare
    /// case-insensitively, so they are keyed in lowercase.
    pub fn canonical(&self) -> AssetId {
        match self {
            AssetId::Text(s) if is_contract_address(s) || is_token_hash(s) => {
                AssetId::Text(s.to_ascii_lowercase())
            }
            other => other.clone(),
        }
    }
}

impl From<u64> for AssetId {
    fn from(n: u64) -> Self {
        AssetId::Numeric(n)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        AssetId::Text(s.to_string())
    }
}

/// How an issued asset is named in an asset reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Id(AssetId),
    Symbol(String),
}

/// A parsed asset reference: `BTC`, `ETH`, `ETH:USDC`, `ETH:0x…`, `BTC:<token id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Native(LedgerId),
    Token { ledger: LedgerId, key: AssetKey },
}

impl AssetRef {
    pub fn ledger(&self) -> LedgerId {
        match self {
            AssetRef::Native(ledger) => *ledger,
            AssetRef::Token { ledger, .. } => *ledger,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetRef::Native(_))
    }

    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let input = input.trim();
        let (ledger_part, asset_part) = match input.split_once(':') {
            Some((ledger, asset)) => (ledger, Some(asset)),
            None => (input, None),
        };

        let ledger = LedgerId::from_symbol(ledger_part)
            .ok_or_else(|| WalletError::UnknownLedger(ledger_part.to_string()))?;

        let Some(asset) = asset_part else {
            return Ok(AssetRef::Native(ledger));
        };
        if asset.is_empty() {
            return Err(WalletError::AssetNotFound {
                ledger,
                asset: input.to_string(),
            });
        }

        let key = if is_contract_address(asset) || is_token_hash(asset) {
            AssetKey::Id(AssetId::Text(asset.to_ascii_lowercase()))
        } else if asset.bytes().all(|b| b.is_ascii_digit()) {
            match asset.parse::<u64>() {
                Ok(n) => AssetKey::Id(AssetId::Numeric(n)),
                Err(_) => AssetKey::Symbol(asset.to_string()),
            }
        } else {
            AssetKey::Symbol(asset.to_string())
        };

        Ok(AssetRef::Token { ledger, key })
    }
}

fn is_contract_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_token_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl FromStr for AssetRef {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetRef::parse(s)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Native(ledger) => f.write_str(ledger.symbol()),
            AssetRef::Token { ledger, key } => match key {
                AssetKey::Id(id) => write!(f, "{}:{id}", ledger.symbol()),
                AssetKey::Symbol(sym) => write!(f, "{}:{sym}", ledger.symbol()),
            },
        }
    }
}

/// A signed transaction of either family, ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub ledger: LedgerId,
    pub raw: Vec<u8>,
    /// Hash computed locally at signing time.
    pub hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_families() {
        assert_eq!(LedgerId::Bitcoin.family(), LedgerFamily::Utxo);
        assert_eq!(LedgerId::Ethereum.family(), LedgerFamily::Account);
        assert_eq!(LedgerId::from_symbol("eth"), Some(LedgerId::Ethereum));
        assert_eq!(LedgerId::from_symbol("DOGE"), None);
    }

    #[test]
    fn network_parse_and_mapping() {
        assert_eq!("mainnet".parse::<NetworkId>().unwrap(), NetworkId::Main);
        assert_eq!("regtest".parse::<NetworkId>().unwrap(), NetworkId::Local);
        assert!("moon".parse::<NetworkId>().is_err());

        assert_eq!(NetworkId::Test.btc(), BtcNetwork::Testnet);
        assert_eq!(NetworkId::Local.eth().chain_id(), 31_337);
    }

    #[test]
    fn network_serde_accepts_aliases() {
        let n: NetworkId = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(n, NetworkId::Test);
        assert_eq!(serde_json::to_string(&NetworkId::Local).unwrap(), "\"local\"");
    }

    #[test]
    fn parse_native_refs() {
        assert_eq!(AssetRef::parse("BTC").unwrap(), AssetRef::Native(LedgerId::Bitcoin));
        assert_eq!(AssetRef::parse("eth").unwrap(), AssetRef::Native(LedgerId::Ethereum));
    }

    #[test]
    fn parse_token_refs() {
        let by_symbol = AssetRef::parse("ETH:USDC").unwrap();
        assert_eq!(
            by_symbol,
            AssetRef::Token {
                ledger: LedgerId::Ethereum,
                key: AssetKey::Symbol("USDC".into())
            }
        );

        let contract = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let by_contract = AssetRef::parse(&format!("ETH:{contract}")).unwrap();
        assert_eq!(
            by_contract,
            AssetRef::Token {
                ledger: LedgerId::Ethereum,
                key: AssetKey::Id(AssetId::Text(contract.to_ascii_lowercase()))
            }
        );
        let lower = AssetRef::parse(&format!("ETH:{}", contract.to_ascii_lowercase())).unwrap();
        assert_eq!(lower, by_contract);

        let token_id = "ab".repeat(32);
        let by_hash = AssetRef::parse(&format!("BTC:{token_id}")).unwrap();
        assert!(matches!(by_hash, AssetRef::Token { key: AssetKey::Id(AssetId::Text(_)), .. }));

        let numeric = AssetRef::parse("BTC:42").unwrap();
        assert_eq!(
            numeric,
            AssetRef::Token {
                ledger: LedgerId::Bitcoin,
                key: AssetKey::Id(AssetId::Numeric(42))
            }
        );
    }

    #[test]
    fn canonical_lowercases_only_hex_ids() {
        let contract = AssetId::from("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(
            contract.canonical(),
            AssetId::from("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
        );
        let hash = AssetId::Text("AB".repeat(32));
        assert_eq!(hash.canonical(), AssetId::Text("ab".repeat(32)));
        assert_eq!(AssetId::from("Gold").canonical(), AssetId::from("Gold"));
        assert_eq!(AssetId::Numeric(3).canonical(), AssetId::Numeric(3));
    }

    #[test]
    fn parse_rejects_unknown_ledger_and_empty_token() {
        assert!(matches!(AssetRef::parse("DOGE"), Err(WalletError::UnknownLedger(_))));
        assert!(AssetRef::parse("ETH:").is_err());
    }

    #[test]
    fn asset_ref_display_roundtrips_text() {
        for text in ["BTC", "ETH:USDC", "BTC:7"] {
            assert_eq!(AssetRef::parse(text).unwrap().to_string(), text);
        }
    }
}
