//! Element signature validation contract.
//!
//! XML-DSig verification itself (canonicalization, digests, signature
//! values) lives behind [`SignatureValidator`]. The pipeline only relies on
//! the outcome: a verified, namespace-self-contained copy of the element, a
//! missing signature, or an invalid one.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use x509_parser::time::ASN1Time;

use crate::clock::Clock;
use crate::error::{SamlError, SamlResult};
use crate::pem::pem_to_der;
use crate::xml::Element;

/// Outcome of a failed element validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The element carries no signature at all.
    #[error("missing signature")]
    MissingSignature,

    /// A signature is present but does not verify.
    #[error("{0}")]
    Invalid(String),
}

impl From<SignatureError> for SamlError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::MissingSignature => Self::MissingSignature,
            SignatureError::Invalid(reason) => Self::SignatureInvalid(reason),
        }
    }
}

/// Verifies the enveloped signature of a single element.
pub trait SignatureValidator: Send + Sync {
    /// Validates `element` against the trust anchors in `ctx`.
    ///
    /// Must not modify `element`. On success returns the verified element,
    /// self-contained with respect to namespace declarations, or `None` if
    /// the verifier produced no output.
    ///
    /// ## Errors
    ///
    /// [`SignatureError::MissingSignature`] when no signature is present,
    /// [`SignatureError::Invalid`] for any verification failure.
    fn validate(
        &self,
        ctx: &ValidationContext,
        element: &Element,
    ) -> Result<Option<Element>, SignatureError>;
}

/// Source of trusted identity provider certificates.
pub trait CertificateStore: Send + Sync {
    /// Returns the trusted certificates in DER form.
    ///
    /// ## Errors
    ///
    /// Returns an error if the certificates cannot be loaded.
    fn certificates(&self) -> SamlResult<Vec<Vec<u8>>>;
}

/// Certificate store backed by an in-memory list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCertificateStore {
    certificates: Vec<Vec<u8>>,
}

impl MemoryCertificateStore {
    /// Creates a store from DER certificates.
    #[must_use]
    pub const fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    /// Creates a store from PEM documents; each may hold several certificates.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Config`] if a PEM block is malformed or a
    /// document holds no certificate.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certificates = Vec::new();
        for pem in certificates_pem {
            let blocks = pem_to_der(pem, "CERTIFICATE")?;
            if blocks.is_empty() {
                return Err(SamlError::Config(
                    "identity provider certificate PEM has no CERTIFICATE block".to_string(),
                ));
            }
            certificates.extend(blocks);
        }
        Ok(Self::new(certificates))
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn certificates(&self) -> SamlResult<Vec<Vec<u8>>> {
        Ok(self.certificates.clone())
    }
}

/// Trust anchors and time for one response validation.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    certificates: Vec<Vec<u8>>,
    now: DateTime<Utc>,
}

impl ValidationContext {
    /// Builds a context holding the store's certificates that are valid at
    /// `clock.now()`. Certificates that do not parse are skipped.
    ///
    /// ## Errors
    ///
    /// Propagates certificate store failures.
    pub fn new(store: &dyn CertificateStore, clock: &dyn Clock) -> SamlResult<Self> {
        let now = clock.now();
        let asn1_now = ASN1Time::from_timestamp(now.timestamp())
            .map_err(|e| SamlError::Internal(format!("clock out of range: {e}")))?;

        let certificates = store
            .certificates()?
            .into_iter()
            .filter(|der| match x509_parser::parse_x509_certificate(der) {
                Ok((_, cert)) => {
                    let valid = cert.validity().is_valid_at(asn1_now);
                    if !valid {
                        debug!(subject = %cert.subject(), "Skipping certificate outside its validity period");
                    }
                    valid
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable trusted certificate");
                    false
                }
            })
            .collect();

        Ok(Self { certificates, now })
    }

    /// Returns the trusted DER certificates.
    #[must_use]
    pub fn trusted_certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Returns the validation time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
