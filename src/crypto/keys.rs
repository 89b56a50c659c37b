use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::CryptoError;
use super::encryption::EncryptedData;

pub const PBKDF2_ITERATIONS: u32 = 210_000;
pub const KEY_LENGTH: usize = 32; // AES-256
pub const SALT_LENGTH: usize = 16;

/// Local storage encryption key, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct StorageKey {
    pub(super) key_bytes: [u8; KEY_LENGTH],
}

impl StorageKey {
    /// Derive from the configured passphrase + salt using PBKDF2-SHA256
    pub fn derive(passphrase: &str, salt: &[u8; SALT_LENGTH]) -> Self {
        Self::derive_with_iterations(passphrase, salt, PBKDF2_ITERATIONS)
    }

    pub(crate) fn derive_with_iterations(
        passphrase: &str,
        salt: &[u8; SALT_LENGTH],
        iterations: u32,
    ) -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key_bytes);
        Self { key_bytes }
    }

    /// Encrypt data using AES-256-GCM
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        EncryptedData::encrypt(&self.key_bytes, plaintext)
    }

    /// Decrypt data using AES-256-GCM
    pub fn decrypt(&self, encrypted: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        encrypted.decrypt(&self.key_bytes)
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
