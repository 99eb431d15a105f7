use crate::error::EthError;

/// Networks of the account ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EthNetwork {
    Mainnet,
    Sepolia,
    /// A local development node (anvil / hardhat defaults).
    Local,
}

impl EthNetwork {
    pub fn chain_id(self) -> u64 {
        match self {
            EthNetwork::Mainnet => 1,
            EthNetwork::Sepolia => 11_155_111,
            EthNetwork::Local => 31_337,
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            EthNetwork::Mainnet => "https://eth.llamarpc.com",
            EthNetwork::Sepolia => "https://rpc.sepolia.org",
            EthNetwork::Local => "http://127.0.0.1:8545",
        }
    }

    pub fn is_testnet(self) -> bool {
        !matches!(self, EthNetwork::Mainnet)
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        [EthNetwork::Mainnet, EthNetwork::Sepolia, EthNetwork::Local]
            .into_iter()
            .find(|n| n.chain_id() == chain_id)
    }
}

impl std::str::FromStr for EthNetwork {
    type Err = EthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" | "ethereum" => Ok(EthNetwork::Mainnet),
            "test" | "testnet" | "sepolia" => Ok(EthNetwork::Sepolia),
            "local" | "dev" | "anvil" => Ok(EthNetwork::Local),
            other => Err(EthError::InvalidNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for EthNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EthNetwork::Mainnet => write!(f, "mainnet"),
            EthNetwork::Sepolia => write!(f, "sepolia"),
            EthNetwork::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids() {
        assert_eq!(EthNetwork::Mainnet.chain_id(), 1);
        assert_eq!(EthNetwork::Sepolia.chain_id(), 11155111);
        assert_eq!(EthNetwork::Local.chain_id(), 31337);
    }

    #[test]
    fn lookup_by_chain_id() {
        assert_eq!(EthNetwork::from_chain_id(1), Some(EthNetwork::Mainnet));
        assert_eq!(EthNetwork::from_chain_id(31337), Some(EthNetwork::Local));
        assert!(EthNetwork::from_chain_id(137).is_none());
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("main".parse::<EthNetwork>().unwrap(), EthNetwork::Mainnet);
        assert_eq!("TEST".parse::<EthNetwork>().unwrap(), EthNetwork::Sepolia);
        assert_eq!("local".parse::<EthNetwork>().unwrap(), EthNetwork::Local);
        assert!("polygon".parse::<EthNetwork>().is_err());
    }

    #[test]
    fn only_mainnet_is_not_testnet() {
        assert!(!EthNetwork::Mainnet.is_testnet());
        assert!(EthNetwork::Sepolia.is_testnet());
        assert!(EthNetwork::Local.is_testnet());
    }

    #[test]
    fn endpoints_present() {
        assert!(EthNetwork::Mainnet.default_endpoint().starts_with("https://"));
        assert!(EthNetwork::Local.default_endpoint().starts_with("http://127.0.0.1"));
    }
}
