use std::fmt;

use chain_btc::error::BtcError;
use chain_eth::error::EthError;
use crypto_utils::error::CryptoError;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::types::{LedgerId, NetworkId};

/// Stages of a payment, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    ResolveSession,
    ResolveAddress,
    NormalizeAmount,
    SelectCoins,
    Build,
    Sign,
    Broadcast,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SendStage::ResolveSession => "resolve-session",
            SendStage::ResolveAddress => "resolve-address",
            SendStage::NormalizeAmount => "normalize-amount",
            SendStage::SelectCoins => "select-coins",
            SendStage::Build => "build",
            SendStage::Sign => "sign",
            SendStage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("could not open {ledger} session on {network}: {source}")]
    SessionInit {
        ledger: LedgerId,
        network: NetworkId,
        #[source]
        source: LedgerError,
    },

    #[error("invalid {ledger} address: {reason}")]
    InvalidAddress { ledger: LedgerId, reason: String },

    #[error("unknown ledger '{0}'")]
    UnknownLedger(String),

    #[error("asset {asset} not found on {ledger}")]
    AssetNotFound { ledger: LedgerId, asset: String },

    #[error("symbol {symbol} is ambiguous on {ledger}: {candidates:?}")]
    AmbiguousSymbol {
        ledger: LedgerId,
        symbol: String,
        candidates: Vec<String>,
    },

    #[error("asset {asset} on {ledger} reported precision {reported}, known as {known}")]
    AssetPrecisionConflict {
        ledger: LedgerId,
        asset: String,
        known: u8,
        reported: u8,
    },

    #[error("insufficient funds on {ledger}: need {needed}, spendable {available}")]
    InsufficientFunds {
        ledger: LedgerId,
        needed: u64,
        available: u64,
    },

    #[error("invalid amount: {0}")]
    AmountPrecision(String),

    #[error("invalid token definition: {0}")]
    InvalidToken(String),

    #[error("{ledger} transaction build failed: {reason}")]
    TransactionBuild { ledger: LedgerId, reason: String },

    #[error("{ledger} signing failed: {reason}")]
    SigningFailed { ledger: LedgerId, reason: String },

    #[error("{failed} {ledger} broadcast(s) failed: {source}")]
    Broadcast {
        ledger: LedgerId,
        failed: usize,
        #[source]
        source: LedgerError,
    },

    #[error("{ledger} adapter error: {source}")]
    Ledger {
        ledger: LedgerId,
        #[source]
        source: LedgerError,
    },

    #[error("credential error: {0}")]
    Credential(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("send {asset} on {ledger} failed at {stage}: {source}")]
    Send {
        stage: SendStage,
        ledger: LedgerId,
        asset: String,
        #[source]
        source: Box<WalletError>,
    },
}

impl WalletError {
    /// Stage at which a send failed, if this is a send failure.
    pub fn stage(&self) -> Option<SendStage> {
        match self {
            WalletError::Send { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost cause, unwrapping the send stage wrapper.
    pub fn root(&self) -> &WalletError {
        match self {
            WalletError::Send { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<CryptoError> for WalletError {
    fn from(e: CryptoError) -> Self {
        WalletError::Credential(e.to_string())
    }
}

impl From<BtcError> for WalletError {
    fn from(e: BtcError) -> Self {
        let ledger = LedgerId::Bitcoin;
        match e {
            BtcError::InvalidAddress(reason) => WalletError::InvalidAddress { ledger, reason },
            BtcError::InsufficientFunds { needed, available } => WalletError::InsufficientFunds {
                ledger,
                needed,
                available,
            },
            BtcError::InvalidAmount(reason) => WalletError::AmountPrecision(reason),
            BtcError::InvalidPrivateKey(reason) | BtcError::SigningError(reason) => {
                WalletError::SigningFailed { ledger, reason }
            }
            BtcError::InvalidPublicKey(reason) => WalletError::DerivationFailed(reason),
            BtcError::TransactionBuildError(reason) => {
                WalletError::TransactionBuild { ledger, reason }
            }
            BtcError::InvalidNetwork(name) => {
                WalletError::Config(format!("unknown bitcoin network '{name}'"))
            }
        }
    }
}

impl From<EthError> for WalletError {
    fn from(e: EthError) -> Self {
        let ledger = LedgerId::Ethereum;
        match e {
            EthError::InvalidAddress(_) | EthError::InvalidChecksum(_) => {
                WalletError::InvalidAddress {
                    ledger,
                    reason: e.to_string(),
                }
            }
            EthError::InvalidPrivateKey(reason) | EthError::SigningError(reason) => {
                WalletError::SigningFailed { ledger, reason }
            }
            EthError::InvalidPublicKey(reason) => WalletError::DerivationFailed(reason),
            EthError::TransactionBuildError(reason) | EthError::EncodingError(reason) => {
                WalletError::TransactionBuild { ledger, reason }
            }
            EthError::InvalidNetwork(name) => {
                WalletError::Config(format!("unknown ethereum network '{name}'"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btc_insufficient_funds_keeps_context() {
        let err: WalletError = BtcError::InsufficientFunds {
            needed: 120,
            available: 45,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "insufficient funds on bitcoin: need 120, spendable 45"
        );
    }

    #[test]
    fn eth_checksum_maps_to_invalid_address() {
        let err: WalletError = EthError::InvalidChecksum("0xAbC".into()).into();
        assert!(matches!(
            err,
            WalletError::InvalidAddress {
                ledger: LedgerId::Ethereum,
                ..
            }
        ));
    }

    #[test]
    fn crypto_errors_are_credential_errors() {
        let err: WalletError = CryptoError::DecryptionFailed("aead::Error".into()).into();
        assert!(matches!(err, WalletError::Credential(_)));
    }

    #[test]
    fn send_wrapper_exposes_stage_and_root() {
        let err = WalletError::Send {
            stage: SendStage::SelectCoins,
            ledger: LedgerId::Bitcoin,
            asset: "BTC".into(),
            source: Box::new(WalletError::InsufficientFunds {
                ledger: LedgerId::Bitcoin,
                needed: 10,
                available: 0,
            }),
        };
        assert_eq!(err.stage(), Some(SendStage::SelectCoins));
        assert!(matches!(err.root(), WalletError::InsufficientFunds { .. }));
        assert!(err.to_string().starts_with("send BTC on bitcoin failed at select-coins"));
    }
}
