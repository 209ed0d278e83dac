//! RSA key transport for `xenc:EncryptedKey`.
//!
//! The content-encryption key of an encrypted assertion is wrapped with the
//! service provider's RSA public key. Only RSA-OAEP is accepted here.

use aws_lc_rs::encoding::{AsDer, Pkcs8V1Der, PublicKeyX509Der};
use aws_lc_rs::rsa::{
    KeySize, OaepAlgorithm, OaepPrivateDecryptingKey, OaepPublicEncryptingKey,
    PrivateDecryptingKey, PublicEncryptingKey, OAEP_SHA1_MGF1SHA1, OAEP_SHA256_MGF1SHA256,
};

use crate::algorithm::KeyTransportAlgorithm;
use crate::error::XmlEncError;

impl KeyTransportAlgorithm {
    fn oaep(self) -> &'static OaepAlgorithm {
        match self {
            Self::RsaOaepSha1 => &OAEP_SHA1_MGF1SHA1,
            Self::RsaOaepSha256 => &OAEP_SHA256_MGF1SHA256,
        }
    }
}

/// Unwraps a content-encryption key with the RSA private key.
///
/// # Arguments
///
/// * `private_key_pkcs8` - The RSA private key, PKCS#8 DER
/// * `algorithm` - The key transport algorithm from the `EncryptedKey`
/// * `wrapped_key` - The base64-decoded `EncryptedKey` cipher value
///
/// ## Errors
///
/// Returns an error if the key is invalid or decryption fails. Decryption
/// failures carry no detail.
pub fn unwrap_key(
    private_key_pkcs8: &[u8],
    algorithm: KeyTransportAlgorithm,
    wrapped_key: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    let key = PrivateDecryptingKey::from_pkcs8(private_key_pkcs8)
        .map_err(|e| XmlEncError::InvalidKey(format!("invalid RSA PKCS#8 key: {e}")))?;
    let key = OaepPrivateDecryptingKey::new(key)
        .map_err(|_| XmlEncError::InvalidKey("RSA key cannot be used for OAEP".to_string()))?;

    let mut output = vec![0u8; key.min_output_size()];
    let plaintext = key
        .decrypt(algorithm.oaep(), wrapped_key, &mut output, None)
        .map_err(|_| XmlEncError::KeyTransport)?;

    Ok(plaintext.to_vec())
}

/// Wraps a content-encryption key with an RSA public key.
///
/// `public_key_der` is an X.509 `SubjectPublicKeyInfo`, as carried in the
/// service provider's certificate.
///
/// ## Errors
///
/// Returns an error if the key is invalid or encryption fails.
pub fn wrap_key(
    public_key_der: &[u8],
    algorithm: KeyTransportAlgorithm,
    key: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    let public_key = PublicEncryptingKey::from_der(public_key_der)
        .map_err(|e| XmlEncError::InvalidKey(format!("invalid RSA public key: {e}")))?;
    let public_key = OaepPublicEncryptingKey::new(public_key)
        .map_err(|_| XmlEncError::InvalidKey("RSA key cannot be used for OAEP".to_string()))?;

    let mut output = vec![0u8; public_key.ciphertext_size()];
    let ciphertext = public_key
        .encrypt(algorithm.oaep(), key, &mut output, None)
        .map_err(|_| XmlEncError::Encryption("RSA-OAEP encryption failed".to_string()))?;

    Ok(ciphertext.to_vec())
}

/// Generates an RSA-2048 decryption key pair.
///
/// Returns `(private key PKCS#8 DER, public key SubjectPublicKeyInfo DER)`.
///
/// ## Errors
///
/// Returns an error if key generation or serialization fails.
pub fn generate_rsa_key_pair() -> Result<(Vec<u8>, Vec<u8>), XmlEncError> {
    let private_key = PrivateDecryptingKey::generate(KeySize::Rsa2048)
        .map_err(|_| XmlEncError::InvalidKey("RSA key generation failed".to_string()))?;

    let private_der: Pkcs8V1Der<'static> = private_key
        .as_der()
        .map_err(|_| XmlEncError::InvalidKey("RSA private key encoding failed".to_string()))?;
    let public_der: PublicKeyX509Der<'static> = private_key
        .public_key()
        .as_der()
        .map_err(|_| XmlEncError::InvalidKey("RSA public key encoding failed".to_string()))?;

    Ok((private_der.as_ref().to_vec(), public_der.as_ref().to_vec()))
}
