//! # wallet-core
//!
//! Multi-ledger wallet engine: one [`Wallet`] exposes address derivation,
//! balances, an asset registry and payments over an unspent-output ledger
//! (`chain-btc`) and an account-model ledger (`chain-eth`).
//!
//! Network access goes through the adapter traits in [`ledger`]; seeds are
//! kept encrypted through [`vault`].

pub mod amount;
pub mod config;
pub mod derivation;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod mnemonic;
pub mod registry;
pub mod sequence;
pub mod session;
pub mod signer;
pub mod types;
pub mod vault;
pub mod wallet;

pub use amount::{denormalize, normalize, AmountInput, ScaledAmount};
pub use config::{LedgerOptions, NetworkSelector, ResolvedLedger, SpendStrategy, WalletConfig};
pub use derivation::{DerivedAddress, SpendKey};
pub use error::{SendStage, WalletError};
pub use ledger::{
    AccountConnector, AccountSession, AssetSource, IssuedToken, LedgerError, TokenIssue,
    TokenMint, TokenTransfer, UtxoConnector, UtxoSession,
};
pub use mnemonic::{MasterSeed, SeedMaterial};
pub use registry::{Asset, AssetPage, AssetRegistry, PageCursor, Registry};
pub use sequence::{CounterSequence, IndexSequence};
pub use session::SessionCache;
pub use signer::{AccountSigner, LocalAccountSigner, LocalUtxoSigner, UtxoSigner};
pub use types::{AssetId, AssetKey, AssetRef, LedgerFamily, LedgerId, NetworkId, SignedTransaction};
pub use vault::{CredentialStore, EncryptedSeed, FileCredentialStore, MemoryCredentialStore, SeedVault};
pub use wallet::{
    Balance, FailedBroadcast, IssueReport, NewToken, RegistryHandle, SendReport, Submission,
    Wallet, WalletBuilder, MAX_ISSUED_DECIMALS,
};
