//! XML Encryption algorithm definitions.
//!
//! Maps the algorithm URIs found in `xenc:EncryptionMethod` elements to the
//! primitives this crate implements.
//!
//! ## Supported algorithms
//!
//! - Block ciphers: AES-128/192/256-CBC, AES-128/256-GCM
//! - Key transport: RSA-OAEP (SHA-1 with MGF1-SHA-1, SHA-256 with MGF1-SHA-256)
//!
//! RSA PKCS#1 v1.5 key transport and Triple-DES are recognised but rejected.

use serde::{Deserialize, Serialize};

use crate::error::XmlEncError;

/// Algorithm URIs from XML Encryption 1.0 and 1.1.
pub mod uris {
    /// AES-128 in CBC mode.
    pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
    /// AES-192 in CBC mode.
    pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
    /// AES-256 in CBC mode.
    pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
    /// AES-128 in GCM mode.
    pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
    /// AES-256 in GCM mode.
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";
    /// Triple-DES in CBC mode (rejected).
    pub const TRIPLEDES_CBC: &str = "http://www.w3.org/2001/04/xmlenc#tripledes-cbc";

    /// RSA-OAEP with MGF1 over SHA-1.
    pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
    /// RSA-OAEP with configurable digest and mask generation function.
    pub const RSA_OAEP: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";
    /// RSA PKCS#1 v1.5 (rejected).
    pub const RSA_1_5: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";

    /// SHA-1 digest.
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    /// SHA-256 digest.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    /// MGF1 with SHA-1.
    pub const MGF1_SHA1: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha1";
    /// MGF1 with SHA-256.
    pub const MGF1_SHA256: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha256";
}

/// Symmetric algorithms used for `xenc:EncryptedData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockCipherAlgorithm {
    /// AES-128-CBC.
    Aes128Cbc,
    /// AES-192-CBC.
    Aes192Cbc,
    /// AES-256-CBC.
    Aes256Cbc,
    /// AES-128-GCM.
    Aes128Gcm,
    /// AES-256-GCM.
    Aes256Gcm,
}

impl BlockCipherAlgorithm {
    /// Returns the XML Encryption URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Aes128Cbc => uris::AES128_CBC,
            Self::Aes192Cbc => uris::AES192_CBC,
            Self::Aes256Cbc => uris::AES256_CBC,
            Self::Aes128Gcm => uris::AES128_GCM,
            Self::Aes256Gcm => uris::AES256_GCM,
        }
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    /// Returns the length of the IV that prefixes the cipher value.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        if self.is_gcm() {
            12
        } else {
            16
        }
    }

    /// Returns whether this is an authenticated (GCM) mode.
    #[must_use]
    pub const fn is_gcm(self) -> bool {
        matches!(self, Self::Aes128Gcm | Self::Aes256Gcm)
    }

    /// Parses an `EncryptionMethod/@Algorithm` value.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URI is empty, unknown, or deliberately unsupported.
    pub fn from_uri(uri: &str) -> Result<Self, XmlEncError> {
        match uri {
            "" => Err(XmlEncError::MissingAlgorithm),
            uris::AES128_CBC => Ok(Self::Aes128Cbc),
            uris::AES192_CBC => Ok(Self::Aes192Cbc),
            uris::AES256_CBC => Ok(Self::Aes256Cbc),
            uris::AES128_GCM => Ok(Self::Aes128Gcm),
            uris::AES256_GCM => Ok(Self::Aes256Gcm),
            uris::TRIPLEDES_CBC => Err(XmlEncError::UnsupportedAlgorithm(uri.to_string())),
            _ => Err(XmlEncError::UnknownAlgorithm(uri.to_string())),
        }
    }
}

/// Asymmetric algorithms used for `xenc:EncryptedKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyTransportAlgorithm {
    /// RSA-OAEP, SHA-1 digest, MGF1 with SHA-1.
    RsaOaepSha1,
    /// RSA-OAEP, SHA-256 digest, MGF1 with SHA-256.
    RsaOaepSha256,
}

impl KeyTransportAlgorithm {
    /// Parses an `EncryptedKey` encryption method.
    ///
    /// `digest` is the `ds:DigestMethod/@Algorithm` child and `mgf` the
    /// `xenc11:MGF/@Algorithm` child, when present.
    ///
    /// ## Errors
    ///
    /// Returns an error if the combination is unknown or unsupported.
    pub fn from_uri(
        uri: &str,
        digest: Option<&str>,
        mgf: Option<&str>,
    ) -> Result<Self, XmlEncError> {
        match uri {
            "" => Err(XmlEncError::MissingAlgorithm),
            uris::RSA_OAEP_MGF1P => match digest.unwrap_or(uris::SHA1) {
                uris::SHA1 => Ok(Self::RsaOaepSha1),
                other => Err(XmlEncError::UnsupportedAlgorithm(format!(
                    "rsa-oaep-mgf1p with digest {other}"
                ))),
            },
            uris::RSA_OAEP => {
                match (digest.unwrap_or(uris::SHA1), mgf.unwrap_or(uris::MGF1_SHA1)) {
                    (uris::SHA1, uris::MGF1_SHA1) => Ok(Self::RsaOaepSha1),
                    (uris::SHA256, uris::MGF1_SHA256) => Ok(Self::RsaOaepSha256),
                    (digest, mgf) => Err(XmlEncError::UnsupportedAlgorithm(format!(
                        "rsa-oaep with digest {digest} and mask {mgf}"
                    ))),
                }
            }
            // PKCS#1 v1.5 key transport is open to padding-oracle attacks.
            uris::RSA_1_5 => Err(XmlEncError::UnsupportedAlgorithm(uri.to_string())),
            _ => Err(XmlEncError::UnknownAlgorithm(uri.to_string())),
        }
    }
}
