//! Encrypted seed storage.
//!
//! The seed text (mnemonic or raw hex) is sealed by a [`SeedCipher`] and
//! persisted through a host-provided [`CredentialStore`]. Plaintext only
//! lives in zeroizing buffers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use crypto_utils::{Sealed, SeedCipher};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::WalletError;
use crate::mnemonic::{MasterSeed, SeedMaterial};

pub const ENCRYPTED_SEED_VERSION: u32 = 1;

/// Seed ciphertext as persisted. Bytes are hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSeed {
    pub version: u32,
    pub salt: String,
    pub ciphertext: String,
}

impl EncryptedSeed {
    pub fn from_sealed(sealed: &Sealed) -> Self {
        Self {
            version: ENCRYPTED_SEED_VERSION,
            salt: hex::encode(&sealed.salt),
            ciphertext: hex::encode(&sealed.ciphertext),
        }
    }

    pub fn to_sealed(&self) -> Result<Sealed, WalletError> {
        if self.version != ENCRYPTED_SEED_VERSION {
            return Err(WalletError::Credential(format!(
                "unsupported encrypted seed version {}",
                self.version
            )));
        }
        let salt = hex::decode(&self.salt)
            .map_err(|e| WalletError::Credential(format!("salt: {e}")))?;
        let ciphertext = hex::decode(&self.ciphertext)
            .map_err(|e| WalletError::Credential(format!("ciphertext: {e}")))?;
        Ok(Sealed { salt, ciphertext })
    }

    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WalletError::Credential(format!("serialization failed: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        serde_json::from_str(json)
            .map_err(|e| WalletError::Credential(format!("deserialization failed: {e}")))
    }
}

/// Where the encrypted seed lives between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<EncryptedSeed>, WalletError>;

    async fn save(&self, seed: &EncryptedSeed) -> Result<(), WalletError>;

    /// Stores `seed` only when nothing is stored yet. Returns the seed
    /// already present otherwise. The check and the write happen under one
    /// lock, so concurrent first runs agree on a single seed.
    async fn save_if_absent(
        &self,
        seed: &EncryptedSeed,
    ) -> Result<Option<EncryptedSeed>, WalletError>;
}

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<EncryptedSeed>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<EncryptedSeed>, WalletError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, seed: &EncryptedSeed) -> Result<(), WalletError> {
        *self.slot.lock().await = Some(seed.clone());
        Ok(())
    }

    async fn save_if_absent(
        &self,
        seed: &EncryptedSeed,
    ) -> Result<Option<EncryptedSeed>, WalletError> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(existing) => Ok(Some(existing.clone())),
            None => {
                *slot = Some(seed.clone());
                Ok(None)
            }
        }
    }
}

/// Stores the encrypted seed as a JSON file.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the target,
/// so a failed save never leaves a truncated seed behind. Clones share one
/// write lock; separate stores on the same path do not.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<Option<EncryptedSeed>, WalletError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => EncryptedSeed::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WalletError::Credential(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, seed: &EncryptedSeed) -> Result<(), WalletError> {
        let json = seed.to_json()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    WalletError::Credential(format!("create {}: {e}", parent.display()))
                })?;
            }
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| WalletError::Credential(format!("write {}: {e}", staging.display())))?;
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "stale seed staging file");
            }
            return Err(WalletError::Credential(format!(
                "rename {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<EncryptedSeed>, WalletError> {
        self.read().await
    }

    async fn save(&self, seed: &EncryptedSeed) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().await;
        self.write(seed).await
    }

    async fn save_if_absent(
        &self,
        seed: &EncryptedSeed,
    ) -> Result<Option<EncryptedSeed>, WalletError> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.read().await? {
            return Ok(Some(existing));
        }
        self.write(seed).await?;
        Ok(None)
    }
}

/// The unlocked master seed.
#[derive(Debug)]
pub struct SeedVault {
    seed: MasterSeed,
    created: bool,
}

impl SeedVault {
    /// Decrypts the stored seed, or generates a 24-word mnemonic, stores it
    /// encrypted and uses that.
    pub async fn load_or_create(
        store: &dyn CredentialStore,
        cipher: &dyn SeedCipher,
    ) -> Result<Self, WalletError> {
        if let Some(stored) = store.get().await? {
            return Self::unlock(&stored, cipher);
        }

        let material = SeedMaterial::generate()?;
        let sealed = EncryptedSeed::from_sealed(&cipher.encrypt(material.to_text().as_bytes())?);
        if let Some(stored) = store.save_if_absent(&sealed).await? {
            // another caller stored a seed first
            return Self::unlock(&stored, cipher);
        }
        info!("generated and stored a new wallet seed");
        Ok(Self {
            seed: material.to_seed()?,
            created: true,
        })
    }

    fn unlock(stored: &EncryptedSeed, cipher: &dyn SeedCipher) -> Result<Self, WalletError> {
        let plaintext = cipher.decrypt(&stored.to_sealed()?)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| WalletError::Credential("stored seed is not utf-8".into()))?;
        Ok(Self {
            seed: SeedMaterial::parse(text)?.to_seed()?,
            created: false,
        })
    }

    /// Replaces whatever is stored with `text` (mnemonic or 128-hex seed).
    pub async fn import(
        store: &dyn CredentialStore,
        cipher: &dyn SeedCipher,
        text: &str,
    ) -> Result<Self, WalletError> {
        let material = SeedMaterial::parse(text)?;
        Self::persist(store, cipher, &material).await?;
        info!(mnemonic = material.is_mnemonic(), "imported wallet seed");
        Ok(Self {
            seed: material.to_seed()?,
            created: false,
        })
    }

    async fn persist(
        store: &dyn CredentialStore,
        cipher: &dyn SeedCipher,
        material: &SeedMaterial,
    ) -> Result<(), WalletError> {
        let text = material.to_text();
        let sealed = cipher.encrypt(text.as_bytes())?;
        store.save(&EncryptedSeed::from_sealed(&sealed)).await
    }

    pub fn seed(&self) -> &MasterSeed {
        &self.seed
    }

    pub fn into_seed(self) -> MasterSeed {
        self.seed
    }

    /// True when this call generated the seed.
    pub fn created(&self) -> bool {
        self.created
    }
}
