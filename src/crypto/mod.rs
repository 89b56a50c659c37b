pub mod encryption;
pub mod keys;

pub use encryption::*;
pub use keys::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed, wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Corrupted storage data")]
    CorruptedData,
}
