//! Response-level orchestration.
//!
//! [`ServiceProvider::validate_encoded_response`] takes the `SAMLResponse`
//! form value posted to the assertion consumer service and returns a typed
//! [`Response`] only when every stage succeeds:
//!
//! 1. decode (base64, optional raw DEFLATE) into a tree
//! 2. validate the envelope signature, if any
//! 3. decrypt encrypted assertions in place
//! 4. enforce assertion signatures
//! 5. unmarshal the processed tree
//! 6. semantic checks, then caller-supplied checks
//!
//! A signed envelope covers unsigned assertions; otherwise every assertion
//! must be signed. Mixing signed and unsigned assertions is never accepted.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceProviderConfig;
use crate::decode::decode_response;
use crate::decrypt::AssertionDecryptor;
use crate::enforce::AssertionSignatureEnforcer;
use crate::error::{SamlError, SamlResult};
use crate::keystore::{KeyStore, MemoryKeyStore};
use crate::signature::{
    CertificateStore, MemoryCertificateStore, SignatureError, SignatureValidator,
    ValidationContext,
};
use crate::types::{FromElement, Response};
use crate::validate::{validate_response, ResponseValidator};
use crate::xml::ElementRef;

/// A configured SAML service provider.
///
/// Immutable after construction; share it behind an `Arc` across request
/// handlers.
pub struct ServiceProvider {
    config: ServiceProviderConfig,
    signature_validator: Option<Arc<dyn SignatureValidator>>,
    certificate_store: Arc<dyn CertificateStore>,
    key_store: Option<Arc<dyn KeyStore>>,
    clock: Arc<dyn Clock>,
    response_validator: Option<Arc<dyn ResponseValidator>>,
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("config", &self.config)
            .field("has_signature_validator", &self.signature_validator.is_some())
            .field("has_key_store", &self.key_store.is_some())
            .field("has_response_validator", &self.response_validator.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceProvider {
    /// Starts building a service provider from `config`.
    #[must_use]
    pub fn builder(config: ServiceProviderConfig) -> ServiceProviderBuilder {
        ServiceProviderBuilder::new(config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceProviderConfig {
        &self.config
    }

    /// Decodes, verifies, decrypts and validates a `SAMLResponse` value.
    ///
    /// ## Errors
    ///
    /// Returns the first failure of any stage; no partial result is
    /// produced. See [`SamlError::kind`] for the stages.
    ///
    /// ## Panics
    ///
    /// Panics if an element found during processing cannot be removed from
    /// the tree, which indicates a defect rather than bad input.
    pub fn validate_encoded_response(&self, encoded: &str) -> SamlResult<Response> {
        let mut root = decode_response(encoded)?;
        let check_signatures = !self.config.skip_signature_validation;

        let mut envelope_validated = false;
        let mut signed_assertions = 0;

        let verifier = if check_signatures {
            let validator = self.signature_validator.as_deref().ok_or_else(|| {
                SamlError::Config("no signature validator configured".to_string())
            })?;
            let ctx = ValidationContext::new(self.certificate_store.as_ref(), self.clock.as_ref())?;
            if ctx.trusted_certificates().is_empty() {
                tracing::warn!("No identity provider certificate is currently trusted");
            }
            Some((validator, ctx))
        } else {
            tracing::warn!("Signature validation is disabled");
            None
        };

        if let Some((validator, ctx)) = &verifier {
            match validator.validate(ctx, &root) {
                Ok(Some(validated)) => {
                    root = validated;
                    envelope_validated = true;
                    tracing::debug!("Response envelope signature validated");
                }
                Ok(None) => return Err(SamlError::MissingTransformed("response".to_string())),
                Err(SignatureError::MissingSignature) => {
                    tracing::debug!("Response envelope is not signed");
                }
                Err(SignatureError::Invalid(reason)) => {
                    tracing::warn!("Response signature validation failed: {}", reason);
                    return Err(SamlError::SignatureInvalid(reason));
                }
            }
        }

        AssertionDecryptor::new(self.key_store.as_deref()).decrypt_all(&mut root)?;

        if let Some((validator, ctx)) = &verifier {
            match AssertionSignatureEnforcer::new(*validator, ctx).enforce(&mut root) {
                Ok(counts) => signed_assertions = counts.signed,
                Err(SamlError::MissingSignature) if envelope_validated => {
                    tracing::debug!("Assertions are unsigned, covered by the envelope signature");
                }
                Err(SamlError::MissingSignature) => return Err(SamlError::UnsignedResponse),
                Err(e) => {
                    tracing::warn!("Assertion signature enforcement failed: {}", e);
                    return Err(e);
                }
            }
        }

        let mut response = Response::from_element(&ElementRef::root(&root))?;
        response.signed = envelope_validated;
        for assertion in &mut response.assertions {
            assertion.signed = signed_assertions > 0;
        }

        if let Err(e) = validate_response(&response, &self.config, self.clock.now()) {
            tracing::warn!("Response validation failed: {}", e);
            return Err(e);
        }
        if let Some(extra) = &self.response_validator {
            extra.validate(&response)?;
        }

        tracing::debug!(
            "Accepted response '{}' with {} assertion(s)",
            response.id,
            response.assertions.len()
        );
        Ok(response)
    }
}

/// Builder for [`ServiceProvider`].
pub struct ServiceProviderBuilder {
    config: ServiceProviderConfig,
    signature_validator: Option<Arc<dyn SignatureValidator>>,
    certificate_store: Option<Arc<dyn CertificateStore>>,
    key_store: Option<Arc<dyn KeyStore>>,
    clock: Option<Arc<dyn Clock>>,
    response_validator: Option<Arc<dyn ResponseValidator>>,
}

impl ServiceProviderBuilder {
    fn new(config: ServiceProviderConfig) -> Self {
        Self {
            config,
            signature_validator: None,
            certificate_store: None,
            key_store: None,
            clock: None,
            response_validator: None,
        }
    }

    /// Sets the XML signature validator.
    #[must_use]
    pub fn with_signature_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.signature_validator = Some(validator);
        self
    }

    /// Sets the trusted certificate store, replacing `idp_certificates`.
    #[must_use]
    pub fn with_certificate_store(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.certificate_store = Some(store);
        self
    }

    /// Sets the decryption key store, replacing `sp_private_key`.
    #[must_use]
    pub fn with_key_store(mut self, store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(store);
        self
    }

    /// Sets the clock (defaults to [`SystemClock`]).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Adds checks that run after the built-in validation.
    #[must_use]
    pub fn with_response_validator(mut self, validator: Arc<dyn ResponseValidator>) -> Self {
        self.response_validator = Some(validator);
        self
    }

    /// Builds the service provider.
    ///
    /// Stores not set explicitly are built from the PEM values in the
    /// configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Config`] if the ACS URL is empty, a PEM value is
    /// invalid, only one of `sp_private_key`/`sp_certificate` is set, or
    /// signature checking is enabled without a validator.
    pub fn build(self) -> SamlResult<ServiceProvider> {
        let config = self.config;
        if config.assertion_consumer_service_url.is_empty() {
            return Err(SamlError::Config(
                "assertion_consumer_service_url must not be empty".to_string(),
            ));
        }
        if !config.skip_signature_validation && self.signature_validator.is_none() {
            return Err(SamlError::Config(
                "a signature validator is required unless skip_signature_validation is set"
                    .to_string(),
            ));
        }

        let certificate_store = match self.certificate_store {
            Some(store) => store,
            None => {
                let pems: Vec<&str> = config.idp_certificates.iter().map(String::as_str).collect();
                Arc::new(MemoryCertificateStore::from_pem(&pems)?)
            }
        };

        let key_store = match (self.key_store, &config.sp_private_key, &config.sp_certificate) {
            (Some(store), _, _) => Some(store),
            (None, Some(key), Some(cert)) => {
                Some(Arc::new(MemoryKeyStore::from_pem(key, cert)?) as Arc<dyn KeyStore>)
            }
            (None, None, None) => None,
            (None, _, _) => {
                return Err(SamlError::Config(
                    "sp_private_key and sp_certificate must be set together".to_string(),
                ))
            }
        };

        Ok(ServiceProvider {
            config,
            signature_validator: self.signature_validator,
            certificate_store,
            key_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            response_validator: self.response_validator,
        })
    }
}
