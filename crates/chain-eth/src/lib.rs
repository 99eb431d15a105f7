//! Account-model ledger support for the wallet.
//!
//! This crate provides:
//! - Address derivation from secp256k1 public keys and EIP-55 validation
//! - EIP-1559 transaction building and signing
//! - ERC-20 `transfer` / `balanceOf` call encoding
//! - Network definitions (chain ids and default RPC endpoints)

pub mod abi;
pub mod address;
pub mod erc20;
pub mod error;
pub mod network;
pub mod transaction;
