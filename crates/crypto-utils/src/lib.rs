//! # crypto-utils
//!
//! Password-based sealing of seed material: Argon2id key derivation and
//! AES-256-GCM authenticated encryption behind the [`SeedCipher`] trait.

pub mod cipher;
pub mod error;

pub use cipher::{KdfParams, PasswordCipher, Sealed, SeedCipher};
pub use error::CryptoError;
