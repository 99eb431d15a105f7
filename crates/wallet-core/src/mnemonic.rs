use std::fmt;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::WalletError;

/// Length of a BIP-39 seed, and of an imported raw seed.
pub const SEED_LEN: usize = 64;

/// 64-byte master seed, wiped on drop.
pub struct MasterSeed(Zeroizing<[u8; SEED_LEN]>);

impl MasterSeed {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for MasterSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSeed(..)")
    }
}

/// Secret the master seed is derived from: a BIP-39 phrase or the raw
/// seed bytes themselves.
pub enum SeedMaterial {
    Mnemonic(Zeroizing<String>),
    RawSeed(Zeroizing<[u8; SEED_LEN]>),
}

impl SeedMaterial {
    /// Generate a new 24-word mnemonic (256 bits of entropy).
    pub fn generate() -> Result<Self, WalletError> {
        let mut entropy = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::Credential(e.to_string()));
        entropy.zeroize();
        Ok(SeedMaterial::Mnemonic(Zeroizing::new(mnemonic?.to_string())))
    }

    /// Accepts either a BIP-39 phrase or 128 hex characters of raw seed.
    pub fn parse(text: &str) -> Result<Self, WalletError> {
        let trimmed = text.trim();
        if trimmed.len() == SEED_LEN * 2 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            let mut raw = Zeroizing::new([0u8; SEED_LEN]);
            hex::decode_to_slice(trimmed, &mut raw[..])
                .map_err(|e| WalletError::Credential(format!("raw seed: {e}")))?;
            return Ok(SeedMaterial::RawSeed(raw));
        }

        let mnemonic = Mnemonic::parse_in_normalized(Language::English, trimmed)
            .map_err(|e| WalletError::Credential(format!("invalid mnemonic: {e}")))?;
        Ok(SeedMaterial::Mnemonic(Zeroizing::new(mnemonic.to_string())))
    }

    pub fn is_mnemonic(&self) -> bool {
        matches!(self, SeedMaterial::Mnemonic(_))
    }

    /// Text form stored (encrypted) by the vault; `parse` reads it back.
    pub fn to_text(&self) -> Zeroizing<String> {
        match self {
            SeedMaterial::Mnemonic(phrase) => phrase.clone(),
            SeedMaterial::RawSeed(raw) => Zeroizing::new(hex::encode(&raw[..])),
        }
    }

    /// Master seed with an empty BIP-39 passphrase.
    pub fn to_seed(&self) -> Result<MasterSeed, WalletError> {
        match self {
            SeedMaterial::Mnemonic(phrase) => {
                let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
                    .map_err(|e| WalletError::Credential(format!("invalid mnemonic: {e}")))?;
                Ok(MasterSeed(Zeroizing::new(mnemonic.to_seed(""))))
            }
            SeedMaterial::RawSeed(raw) => Ok(MasterSeed(raw.clone())),
        }
    }
}

impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedMaterial::Mnemonic(_) => f.write_str("SeedMaterial::Mnemonic(..)"),
            SeedMaterial::RawSeed(_) => f.write_str("SeedMaterial::RawSeed(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const PHRASE_SEED_HEX: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    #[test]
    fn generated_mnemonic_has_24_words() {
        let material = SeedMaterial::generate().unwrap();
        assert!(material.is_mnemonic());
        assert_eq!(material.to_text().split_whitespace().count(), 24);
    }

    #[test]
    fn bip39_test_vector() {
        let seed = SeedMaterial::parse(PHRASE).unwrap().to_seed().unwrap();
        assert_eq!(hex::encode(seed.as_bytes()), PHRASE_SEED_HEX);
    }

    #[test]
    fn raw_seed_import_matches_mnemonic_seed() {
        let raw = SeedMaterial::parse(PHRASE_SEED_HEX).unwrap();
        assert!(!raw.is_mnemonic());
        let from_phrase = SeedMaterial::parse(PHRASE).unwrap().to_seed().unwrap();
        assert_eq!(raw.to_seed().unwrap().as_bytes(), from_phrase.as_bytes());
    }

    #[test]
    fn text_form_round_trips() {
        for input in [PHRASE, PHRASE_SEED_HEX] {
            let material = SeedMaterial::parse(input).unwrap();
            let again = SeedMaterial::parse(&material.to_text()).unwrap();
            assert_eq!(
                material.to_seed().unwrap().as_bytes(),
                again.to_seed().unwrap().as_bytes()
            );
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            SeedMaterial::parse("invalid mnemonic phrase here"),
            Err(WalletError::Credential(_))
        ));
        // right length, not hex, not words
        assert!(SeedMaterial::parse(&"z".repeat(128)).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let material = SeedMaterial::parse(PHRASE).unwrap();
        assert!(!format!("{material:?}").contains("abandon"));
        let seed = material.to_seed().unwrap();
        assert_eq!(format!("{seed:?}"), "MasterSeed(..)");
    }
}
