//! Unspent-output ledger support for the wallet engine.
//!
//! Provides address rules and P2WPKH derivation, largest-first coin
//! selection (per-output fan-out and consolidated), fee estimation,
//! unsigned transaction assembly, and signing.

pub mod address;
pub mod error;
pub mod network;
pub mod transaction;
pub mod utxo;
