//! SAML 2.0 service-provider response processing for Keycloak Rust.
//!
//! This crate turns the `SAMLResponse` value posted to an assertion consumer
//! service into a typed, trusted [`Response`]:
//!
//! - **Decoding** - base64 with a raw-DEFLATE fallback
//! - **Signature enforcement** - envelope and per-assertion, with defenses
//!   against signature wrapping
//! - **Decryption** - `EncryptedAssertion` via XML Encryption
//! - **Validation** - destination, version, status, issuer, conditions
//!
//! # Architecture
//!
//! - [`service_provider`] - the pipeline entry point and its builder
//! - [`decode`], [`decrypt`], [`enforce`], [`validate`] - pipeline stages
//! - [`signature`] - the signature validator and trust store contracts
//! - [`keystore`] - decryption key material
//! - [`xml`] - owned XML tree with namespace-aware search
//! - [`types`] - the typed response model
//! - [`error`] - error types
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kc_saml_sp::{ServiceProvider, ServiceProviderConfig};
//!
//! let config = ServiceProviderConfig::load("sp.toml")?;
//! let sp = ServiceProvider::builder(config)
//!     .with_signature_validator(Arc::new(my_xmldsig_validator))
//!     .build()?;
//!
//! let response = sp.validate_encoded_response(&form.saml_response)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod decode;
pub mod decrypt;
pub mod enforce;
pub mod error;
pub mod keystore;
mod pem;
pub mod service_provider;
pub mod signature;
pub mod types;
pub mod validate;
pub mod xml;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ServiceProviderConfig;
pub use error::{ErrorKind, SamlError, SamlResult};
pub use keystore::{DecryptionMaterial, KeyStore, MemoryKeyStore};
pub use service_provider::{ServiceProvider, ServiceProviderBuilder};
pub use signature::{
    CertificateStore, MemoryCertificateStore, SignatureError, SignatureValidator,
    ValidationContext,
};
pub use types::*;
pub use validate::ResponseValidator;
