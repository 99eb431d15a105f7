//! Adapter traits implemented by the host for each ledger family.
//!
//! The wallet never talks to a node directly: sessions are opened through a
//! connector and every network effect goes through one of these traits.

use std::sync::Arc;

use async_trait::async_trait;
use chain_btc::utxo::Utxo;
use chain_eth::transaction::{Eip1559Fees, EthTransaction};
use thiserror::Error;

use crate::amount::ScaledAmount;
use crate::config::ResolvedLedger;
use crate::derivation::SpendKey;
use crate::registry::{AssetPage, PageCursor};
use crate::types::AssetId;

/// Failure reported by a ledger adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("rejected by ledger: {0}")]
    Rejected(String),

    #[error("ledger credential error: {0}")]
    Credential(String),

    #[error("{0}")]
    Other(String),
}

/// Paginated listing of issued assets.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn asset_page(&self, cursor: &PageCursor) -> Result<AssetPage, LedgerError>;
}

/// An issued-token transfer on an unspent-output ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: AssetId,
    pub from: String,
    pub to: String,
    /// Amount in the token's minimal units.
    pub amount: ScaledAmount,
    /// Address receiving native change from funding the transfer.
    pub change_to: String,
}

/// Genesis of a new issued token on an unspent-output ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssue {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub document_uri: String,
    /// Supply created at genesis, in minimal units. May be zero.
    pub initial_supply: ScaledAmount,
    /// Funds the genesis and receives the supply, the mint baton and change.
    pub issuer: String,
}

/// More supply of a token whose mint baton the issuer holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMint {
    pub token: AssetId,
    pub issuer: String,
    /// Amount in the token's minimal units.
    pub amount: ScaledAmount,
}

/// A token accepted by the ledger at genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub id: AssetId,
    pub txid: String,
}

/// Session with an unspent-output ledger node.
#[async_trait]
pub trait UtxoSession: AssetSource {
    /// Confirmed plus unconfirmed native balance in satoshi.
    async fn balance(&self, address: &str) -> Result<u64, LedgerError>;

    async fn token_balance(&self, address: &str, token: &AssetId)
        -> Result<ScaledAmount, LedgerError>;

    async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, LedgerError>;

    /// Current fee rate in sat/vbyte.
    async fn fee_rate(&self) -> Result<u64, LedgerError>;

    /// Submits a raw transaction and returns its txid.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String, LedgerError>;

    /// Builds, signs and submits an issued-token transfer. The token layer's
    /// transaction format is owned by the adapter.
    async fn send_token(&self, transfer: &TokenTransfer, key: &SpendKey)
        -> Result<String, LedgerError>;

    /// Builds, signs and submits a token genesis. The adapter assigns the
    /// token id, usually the genesis txid.
    async fn create_token(&self, issue: &TokenIssue, key: &SpendKey)
        -> Result<IssuedToken, LedgerError>;

    /// Builds, signs and submits a mint; returns its txid.
    async fn mint_token(&self, mint: &TokenMint, key: &SpendKey) -> Result<String, LedgerError>;
}

/// Session with an account-model ledger node.
#[async_trait]
pub trait AccountSession: AssetSource {
    /// Native balance in wei.
    async fn balance(&self, address: &str) -> Result<ScaledAmount, LedgerError>;

    /// Read-only contract call; returns the raw return data.
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, LedgerError>;

    /// Nonce including pending transactions.
    async fn pending_nonce(&self, address: &str) -> Result<u64, LedgerError>;

    async fn fee_quote(&self) -> Result<Eip1559Fees, LedgerError>;

    async fn estimate_gas(&self, from: &str, tx: &EthTransaction) -> Result<u64, LedgerError>;

    /// Submits a raw transaction and returns its hash.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String, LedgerError>;
}

/// Opens sessions with an unspent-output ledger.
#[async_trait]
pub trait UtxoConnector: Send + Sync {
    async fn connect(&self, target: &ResolvedLedger) -> Result<Arc<dyn UtxoSession>, LedgerError>;
}

/// Opens sessions with an account-model ledger.
#[async_trait]
pub trait AccountConnector: Send + Sync {
    async fn connect(&self, target: &ResolvedLedger)
        -> Result<Arc<dyn AccountSession>, LedgerError>;
}
