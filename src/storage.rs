//! Encrypted local storage: a small string key/value map kept on disk as
//! `[salt][nonce][AES-256-GCM ciphertext of the JSON map]`.
//!
//! Holds the bearer token between runs. Values are never logged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::crypto::{
    generate_salt, CryptoError, EncryptedData, StorageKey, PBKDF2_ITERATIONS, SALT_LENGTH,
};

/// Storage key under which the bearer token lives.
pub const TOKEN_KEY: &str = "token";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage contents are not valid: {0}")]
    Format(String),
}

/// Encrypted key/value store, optionally backed by a file.
pub struct EncryptedStore {
    path: Option<PathBuf>,
    salt: [u8; SALT_LENGTH],
    key: StorageKey,
    items: BTreeMap<String, String>,
}

impl EncryptedStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: &Path, passphrase: &str) -> Result<Self, StorageError> {
        Self::open_with_iterations(path, passphrase, PBKDF2_ITERATIONS)
    }

    pub(crate) fn open_with_iterations(
        path: &Path,
        passphrase: &str,
        iterations: u32,
    ) -> Result<Self, StorageError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Creating new encrypted storage");
            let salt = generate_salt();
            return Ok(Self {
                path: Some(path.to_path_buf()),
                salt,
                key: StorageKey::derive_with_iterations(passphrase, &salt, iterations),
                items: BTreeMap::new(),
            });
        }

        let bytes = std::fs::read(path)?;
        if bytes.len() < SALT_LENGTH {
            return Err(CryptoError::CorruptedData.into());
        }
        let mut salt = [0u8; SALT_LENGTH];
        salt.copy_from_slice(&bytes[..SALT_LENGTH]);
        let key = StorageKey::derive_with_iterations(passphrase, &salt, iterations);
        let encrypted = EncryptedData::from_bytes(&bytes[SALT_LENGTH..])?;
        let plaintext = key.decrypt(&encrypted)?;
        let items = serde_json::from_slice(&plaintext)
            .map_err(|e| StorageError::Format(e.to_string()))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            salt,
            key,
            items,
        })
    }

    /// In-memory store that never touches disk.
    pub fn ephemeral() -> Self {
        let salt = generate_salt();
        Self {
            path: None,
            salt,
            key: StorageKey::derive_with_iterations("ephemeral", &salt, 1),
            items: BTreeMap::new(),
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    /// On a write failure the previous value is put back.
    pub fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self.items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist() {
            match previous {
                Some(old) => self.items.insert(key.to_string(), old),
                None => self.items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.items.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let plaintext =
            serde_json::to_vec(&self.items).map_err(|e| StorageError::Format(e.to_string()))?;
        let encrypted = self.key.encrypt(&plaintext)?;

        let mut bytes = Vec::with_capacity(SALT_LENGTH + plaintext.len() + 28);
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&encrypted.to_bytes());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // The file on disk is always a complete snapshot.
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, &bytes)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }
}
