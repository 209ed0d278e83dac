//! Decryption key material for encrypted assertions.

use std::fmt;

use crate::error::{SamlError, SamlResult};
use crate::pem::pem_to_der;

/// The service provider's decryption key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptionMaterial {
    private_key: Vec<u8>,
    certificate: Vec<u8>,
}

impl DecryptionMaterial {
    /// Creates key material from a PKCS#8 DER private key and a DER certificate.
    #[must_use]
    pub const fn new(private_key: Vec<u8>, certificate: Vec<u8>) -> Self {
        Self {
            private_key,
            certificate,
        }
    }

    /// Returns the PKCS#8 DER private key.
    #[must_use]
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Returns the DER certificate matching the private key.
    #[must_use]
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }
}

impl fmt::Debug for DecryptionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionMaterial")
            .field("private_key", &"<redacted>")
            .field("certificate_len", &self.certificate.len())
            .finish()
    }
}

/// Source of the service provider's decryption key pair.
pub trait KeyStore: Send + Sync {
    /// Returns the key pair used to decrypt assertions.
    ///
    /// ## Errors
    ///
    /// Returns an error if the key pair cannot be produced.
    fn key_pair(&self) -> SamlResult<DecryptionMaterial>;
}

/// Key store holding one key pair in memory.
#[derive(Debug, Clone)]
pub struct MemoryKeyStore {
    material: DecryptionMaterial,
}

impl MemoryKeyStore {
    /// Creates a key store from DER-encoded key material.
    #[must_use]
    pub const fn new(private_key: Vec<u8>, certificate: Vec<u8>) -> Self {
        Self {
            material: DecryptionMaterial::new(private_key, certificate),
        }
    }

    /// Creates a key store from a PKCS#8 `PRIVATE KEY` PEM and a
    /// `CERTIFICATE` PEM.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Config`] if either PEM has no usable block.
    pub fn from_pem(private_key_pem: &str, certificate_pem: &str) -> SamlResult<Self> {
        let private_key = pem_to_der(private_key_pem, "PRIVATE KEY")?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SamlError::Config("service provider key must be a PKCS#8 PRIVATE KEY PEM".to_string())
            })?;
        let certificate = pem_to_der(certificate_pem, "CERTIFICATE")?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SamlError::Config("service provider certificate PEM has no CERTIFICATE block".to_string())
            })?;
        Ok(Self::new(private_key, certificate))
    }
}

impl KeyStore for MemoryKeyStore {
    fn key_pair(&self) -> SamlResult<DecryptionMaterial> {
        Ok(self.material.clone())
    }
}
