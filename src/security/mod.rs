//! Security module: password hashing, session tokens and encryption at rest

mod encryption;
mod hashing;
mod secrets;

use crate::error::Result;
use std::path::Path;

pub use encryption::EncryptionManager;
pub use hashing::{generate_token, token_digest, HashingManager};

/// Security manager combining all security features
pub struct SecurityManager {
    encryption: EncryptionManager,
    hashing: HashingManager,
}

impl SecurityManager {
    /// Create a security manager backed by the secrets file in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let (master_key, pepper) = secrets::SecretsFile::new(data_dir).load_or_create()?;
        Self::from_keys(&master_key, &pepper)
    }

    /// Create a security manager with throwaway keys
    pub fn ephemeral() -> Result<Self> {
        Self::from_keys(
            &EncryptionManager::generate_key(),
            &HashingManager::generate_pepper(),
        )
    }

    fn from_keys(master_key: &[u8], pepper: &[u8]) -> Result<Self> {
        Ok(Self {
            encryption: EncryptionManager::new(master_key)?,
            hashing: HashingManager::new(pepper),
        })
    }

    // ========== Encryption ==========

    pub fn encrypt(&self, plaintext: &str) -> Result<(String, String)> {
        self.encryption.encrypt(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str, nonce: &str) -> Result<String> {
        self.encryption.decrypt(ciphertext, nonce)
    }

    // ========== Hashing ==========

    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.hashing.hash_password(password)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        self.hashing.verify_password(password, hash)
    }
}
