//! AES-256-GCM sealing of values stored at rest

use crate::error::{AppError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rand::RngCore;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// Encryption manager using AES-256-GCM
pub struct EncryptionManager {
    cipher: Aes256Gcm,
}

impl EncryptionManager {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid key size: expected {}, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| AppError::Encryption(e.to_string()))?;

        Ok(Self { cipher })
    }

    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Returns (ciphertext_base64, nonce_base64)
    pub fn encrypt(&self, plaintext: &str) -> Result<(String, String)> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        Ok((B64.encode(ciphertext), B64.encode(nonce_bytes)))
    }

    pub fn decrypt(&self, ciphertext_b64: &str, nonce_b64: &str) -> Result<String> {
        let ciphertext = B64
            .decode(ciphertext_b64)
            .map_err(|e| AppError::Encryption(format!("Invalid ciphertext base64: {}", e)))?;
        let nonce_bytes = B64
            .decode(nonce_b64)
            .map_err(|e| AppError::Encryption(format!("Invalid nonce base64: {}", e)))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Encryption(format!("Invalid UTF-8 in plaintext: {}", e)))
    }
}
