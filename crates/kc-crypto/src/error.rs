//! Error type for XML Encryption primitives.

use thiserror::Error;

/// Error type for XML Encryption operations.
#[derive(Debug, Error)]
pub enum XmlEncError {
    /// The `EncryptionMethod` carried no algorithm.
    #[error("missing encryption algorithm")]
    MissingAlgorithm,

    /// The algorithm URI is not recognised.
    #[error("unknown encryption algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The algorithm is recognised but not accepted.
    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key material is malformed or has the wrong size.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The cipher value is structurally malformed.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Unwrapping the content-encryption key failed.
    #[error("key transport decryption failed")]
    KeyTransport,

    /// Decrypting the content failed.
    #[error("decryption failed")]
    Decryption,

    /// Encrypting content or a key failed.
    #[error("encryption failed: {0}")]
    Encryption(String),
}
