//! Block cipher operations for `xenc:EncryptedData`.
//!
//! The cipher value layout follows XML Encryption: the IV is prepended to the
//! ciphertext, and GCM appends its 16-byte authentication tag.
//!
//! CBC padding follows ISO 10126: only the final byte (the pad length) is
//! meaningful, the other padding bytes are arbitrary.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::{Aes128, Aes192, Aes256};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use cbc::cipher::block_padding::Iso10126;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::algorithm::BlockCipherAlgorithm;
use crate::error::XmlEncError;

const AES_BLOCK_LEN: usize = 16;
const GCM_TAG_LEN: usize = 16;

/// Decrypts an `EncryptedData` cipher value.
///
/// `data` is the base64-decoded `CipherValue`: IV followed by ciphertext.
///
/// ## Errors
///
/// Returns an error if the key has the wrong size, the data is truncated,
/// authentication fails (GCM), or the padding is invalid (CBC).
pub fn decrypt(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    check_key_len(algorithm, key)?;

    match algorithm {
        BlockCipherAlgorithm::Aes128Gcm | BlockCipherAlgorithm::Aes256Gcm => {
            if data.len() < algorithm.iv_len() + GCM_TAG_LEN {
                return Err(XmlEncError::InvalidCiphertext(format!(
                    "GCM cipher value too short: {} bytes",
                    data.len()
                )));
            }
            let (iv, ciphertext) = data.split_at(algorithm.iv_len());
            let nonce = Nonce::from_slice(iv);

            let plaintext = if algorithm == BlockCipherAlgorithm::Aes128Gcm {
                Aes128Gcm::new_from_slice(key)
                    .map_err(|_| invalid_key_len(algorithm, key))?
                    .decrypt(nonce, ciphertext)
            } else {
                Aes256Gcm::new_from_slice(key)
                    .map_err(|_| invalid_key_len(algorithm, key))?
                    .decrypt(nonce, ciphertext)
            };

            plaintext.map_err(|_| XmlEncError::Decryption)
        }
        BlockCipherAlgorithm::Aes128Cbc => cbc_decrypt::<cbc::Decryptor<Aes128>>(algorithm, key, data),
        BlockCipherAlgorithm::Aes192Cbc => cbc_decrypt::<cbc::Decryptor<Aes192>>(algorithm, key, data),
        BlockCipherAlgorithm::Aes256Cbc => cbc_decrypt::<cbc::Decryptor<Aes256>>(algorithm, key, data),
    }
}

/// Encrypts content into an `EncryptedData` cipher value (IV ‖ ciphertext).
///
/// Used by identity-provider tooling and tests; a fresh random IV is drawn
/// for every call.
///
/// ## Errors
///
/// Returns an error if the key has the wrong size or randomness is unavailable.
pub fn encrypt(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    check_key_len(algorithm, key)?;

    let mut iv = vec![0u8; algorithm.iv_len()];
    aws_lc_rs::rand::fill(&mut iv)
        .map_err(|_| XmlEncError::Encryption("random IV generation failed".to_string()))?;

    let ciphertext = match algorithm {
        BlockCipherAlgorithm::Aes128Gcm | BlockCipherAlgorithm::Aes256Gcm => {
            let nonce = Nonce::from_slice(&iv);
            let sealed = if algorithm == BlockCipherAlgorithm::Aes128Gcm {
                Aes128Gcm::new_from_slice(key)
                    .map_err(|_| invalid_key_len(algorithm, key))?
                    .encrypt(nonce, plaintext)
            } else {
                Aes256Gcm::new_from_slice(key)
                    .map_err(|_| invalid_key_len(algorithm, key))?
                    .encrypt(nonce, plaintext)
            };
            sealed.map_err(|_| XmlEncError::Encryption("AES-GCM seal failed".to_string()))?
        }
        BlockCipherAlgorithm::Aes128Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes128>>(algorithm, key, &iv, plaintext)?
        }
        BlockCipherAlgorithm::Aes192Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes192>>(algorithm, key, &iv, plaintext)?
        }
        BlockCipherAlgorithm::Aes256Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes256>>(algorithm, key, &iv, plaintext)?
        }
    };

    let mut out = iv;
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Generates a random content-encryption key for `algorithm`.
///
/// ## Errors
///
/// Returns an error if randomness is unavailable.
pub fn generate_key(algorithm: BlockCipherAlgorithm) -> Result<Vec<u8>, XmlEncError> {
    let mut key = vec![0u8; algorithm.key_len()];
    aws_lc_rs::rand::fill(&mut key)
        .map_err(|_| XmlEncError::Encryption("random key generation failed".to_string()))?;
    Ok(key)
}

fn check_key_len(algorithm: BlockCipherAlgorithm, key: &[u8]) -> Result<(), XmlEncError> {
    if key.len() == algorithm.key_len() {
        Ok(())
    } else {
        Err(invalid_key_len(algorithm, key))
    }
}

fn invalid_key_len(algorithm: BlockCipherAlgorithm, key: &[u8]) -> XmlEncError {
    XmlEncError::InvalidKey(format!(
        "{:?} requires a {} byte key, got {}",
        algorithm,
        algorithm.key_len(),
        key.len()
    ))
}

fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    if data.len() < 2 * AES_BLOCK_LEN || data.len() % AES_BLOCK_LEN != 0 {
        return Err(XmlEncError::InvalidCiphertext(format!(
            "CBC cipher value must be a multiple of {AES_BLOCK_LEN} bytes with an IV, got {}",
            data.len()
        )));
    }

    let (iv, ciphertext) = data.split_at(AES_BLOCK_LEN);
    D::new_from_slices(key, iv)
        .map_err(|_| invalid_key_len(algorithm, key))?
        .decrypt_padded_vec_mut::<Iso10126>(ciphertext)
        .map_err(|_| XmlEncError::InvalidCiphertext("invalid CBC padding".to_string()))
}

fn cbc_encrypt<E: KeyIvInit + BlockEncryptMut>(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, XmlEncError> {
    Ok(E::new_from_slices(key, iv)
        .map_err(|_| invalid_key_len(algorithm, key))?
        .encrypt_padded_vec_mut::<Iso10126>(plaintext))
}
