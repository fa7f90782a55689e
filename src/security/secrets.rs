//! Master key and pepper persisted in the gateway's data directory

use crate::error::{AppError, Result};
use crate::security::{EncryptionManager, HashingManager};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

const SECRETS_FILE: &str = "secrets.dat";

/// File holding `base64(master_key):base64(pepper)`
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SECRETS_FILE),
        }
    }

    /// Read the secrets, generating and saving them on first start
    pub fn load_or_create(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)
                .map_err(|e| AppError::Config(format!("Failed to read secrets: {}", e)))?;
            return Self::decode(&data);
        }

        let master_key = EncryptionManager::generate_key();
        let pepper = HashingManager::generate_pepper();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("Failed to create data dir: {}", e)))?;
        }

        let encoded = format!("{}:{}", B64.encode(&master_key), B64.encode(&pepper));
        fs::write(&self.path, encoded)
            .map_err(|e| AppError::Config(format!("Failed to write secrets: {}", e)))?;

        tracing::info!("Generated new secrets at {:?}", self.path);

        Ok((master_key, pepper))
    }

    fn decode(data: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let (key, pepper) = data
            .trim()
            .split_once(':')
            .ok_or_else(|| AppError::Config("Invalid secrets format".to_string()))?;

        let key = B64
            .decode(key)
            .map_err(|e| AppError::Config(format!("Failed to decode master key: {}", e)))?;
        let pepper = B64
            .decode(pepper)
            .map_err(|e| AppError::Config(format!("Failed to decode pepper: {}", e)))?;

        Ok((key, pepper))
    }
}
