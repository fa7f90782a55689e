//! Password hashing (Argon2id + pepper) and session token digests

use crate::error::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const PEPPER_SIZE: usize = 32;
const TOKEN_BYTES: usize = 32;

/// Argon2id password hasher with an application pepper
pub struct HashingManager {
    pepper_b64: String,
}

impl HashingManager {
    pub fn new(pepper: &[u8]) -> Self {
        Self {
            pepper_b64: base64::engine::general_purpose::STANDARD.encode(pepper),
        }
    }

    /// Generate a new random pepper
    pub fn generate_pepper() -> Vec<u8> {
        let mut pepper = vec![0u8; PEPPER_SIZE];
        OsRng.fill_bytes(&mut pepper);
        pepper
    }

    fn argon2() -> Result<Argon2<'static>> {
        // 19 MiB, 2 iterations, 1 lane
        let params = Params::new(19456, 2, 1, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()?
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch, `Err` only for an unreadable stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

        match Argon2::default().verify_password(self.peppered(password).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
        }
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper_b64)
    }
}

/// Random 64-character hex bearer token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest under which a bearer token is stored
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
