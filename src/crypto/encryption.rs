use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::CryptoError;
use super::keys::KEY_LENGTH;

const NONCE_LENGTH: usize = 12;

/// Encrypted data container: nonce + ciphertext (includes AES-GCM auth tag)
#[derive(Debug, Clone)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Encrypt plaintext using AES-256-GCM with a random nonce
    pub(crate) fn encrypt(
        key_bytes: &[u8; KEY_LENGTH],
        plaintext: &[u8],
    ) -> Result<Self, CryptoError> {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(Self {
            nonce: nonce_bytes,
            ciphertext,
        })
    }

    /// Decrypt ciphertext using AES-256-GCM
    pub(crate) fn decrypt(&self, key_bytes: &[u8; KEY_LENGTH]) -> Result<Vec<u8>, CryptoError> {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&self.nonce);

        cipher
            .decrypt(nonce, self.ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Serialize to bytes: [12-byte nonce][ciphertext...]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NONCE_LENGTH + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes: [12-byte nonce][ciphertext...]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < NONCE_LENGTH + 16 {
            // AES-GCM auth tag is 16 bytes minimum
            return Err(CryptoError::CorruptedData);
        }

        let mut nonce = [0u8; NONCE_LENGTH];
        nonce.copy_from_slice(&bytes[..NONCE_LENGTH]);
        let ciphertext = bytes[NONCE_LENGTH..].to_vec();

        Ok(Self { nonce, ciphertext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{StorageKey, SALT_LENGTH};

    fn test_key(passphrase: &str) -> StorageKey {
        StorageKey::derive_with_iterations(passphrase, &[0u8; SALT_LENGTH], 1_000)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = test_key("default-key");
        let plaintext = br#"{"token":"eyJhbGciOi"}"#;
        let encrypted = key.encrypt(plaintext).unwrap();
        assert_eq!(key.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let encrypted = test_key("one").encrypt(b"secret").unwrap();
        assert!(test_key("two").decrypt(&encrypted).is_err());
    }

    #[test]
    fn tampered_ciphertext_detected() {
        let key = test_key("default-key");
        let mut tampered = key.encrypt(b"secret data").unwrap();
        tampered.ciphertext[0] ^= 0xFF;
        assert!(key.decrypt(&tampered).is_err());
    }

    #[test]
    fn byte_layout_survives_serialization() {
        let key = test_key("default-key");
        let bytes = key.encrypt(b"serialize me").unwrap().to_bytes();
        let restored = EncryptedData::from_bytes(&bytes).unwrap();
        assert_eq!(key.decrypt(&restored).unwrap(), b"serialize me");
    }

    #[test]
    fn from_bytes_rejects_too_short() {
        assert!(matches!(
            EncryptedData::from_bytes(&[0u8; 10]),
            Err(CryptoError::CorruptedData)
        ));
    }

    #[test]
    fn different_encryptions_produce_different_nonces() {
        let key = test_key("default-key");
        let e1 = key.encrypt(b"same data").unwrap();
        let e2 = key.encrypt(b"same data").unwrap();
        assert_ne!(e1.nonce, e2.nonce);
    }
}
