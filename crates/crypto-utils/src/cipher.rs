use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// AES-256-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// Argon2 salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// Output of [`SeedCipher::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// KDF salt. Empty for ciphers that do not derive their key.
    pub salt: Vec<u8>,
    /// `nonce (12 bytes) || ciphertext || tag`.
    pub ciphertext: Vec<u8>,
}

/// Symmetric protection for seed material at rest.
pub trait SeedCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed, CryptoError>;

    fn decrypt(&self, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Derives a 32-byte AES key from `password` and `salt` with Argon2id.
    pub fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        if salt.len() != SALT_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                salt.len()
            )));
        }

        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| CryptoError::KdfFailed(format!("invalid argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(password, salt, &mut output[..])
            .map_err(|e| CryptoError::KdfFailed(format!("argon2 hash failed: {e}")))?;

        Ok(output)
    }
}

/// Password-keyed [`SeedCipher`]: a fresh salt and nonce per encryption.
pub struct PasswordCipher {
    password: SecretString,
    params: KdfParams,
}

impl PasswordCipher {
    pub fn new(password: SecretString) -> Self {
        Self::with_params(password, KdfParams::default())
    }

    pub fn with_params(password: SecretString, params: KdfParams) -> Self {
        Self { password, params }
    }
}

impl std::fmt::Debug for PasswordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCipher")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl SeedCipher for PasswordCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed, CryptoError> {
        let mut salt = vec![0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let key = self
            .params
            .derive_key(self.password.expose_secret().as_bytes(), &salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let sealed = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);

        Ok(Sealed { salt, ciphertext })
    }

    fn decrypt(&self, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if sealed.ciphertext.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "ciphertext too short: expected at least {NONCE_SIZE} bytes, got {}",
                sealed.ciphertext.len()
            )));
        }

        let key = self
            .params
            .derive_key(self.password.expose_secret().as_bytes(), &sealed.salt)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        let (nonce_bytes, body) = sealed.ciphertext.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
