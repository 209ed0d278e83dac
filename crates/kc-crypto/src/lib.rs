//! # kc-crypto
//!
//! XML Encryption primitives for SAML service providers, built on aws-lc-rs
//! and the RustCrypto AES implementations.
//!
//! ## Scope
//!
//! - [`keytransport`] - unwrapping `xenc:EncryptedKey` values with RSA-OAEP
//! - [`cipher`] - decrypting `xenc:EncryptedData` with AES-CBC or AES-GCM
//! - [`algorithm`] - mapping algorithm URIs to the primitives above
//!
//! RSA PKCS#1 v1.5 key transport and Triple-DES are refused.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod keytransport;

pub use algorithm::{BlockCipherAlgorithm, KeyTransportAlgorithm};
pub use error::XmlEncError;
pub use keytransport::{generate_rsa_key_pair, unwrap_key, wrap_key};
