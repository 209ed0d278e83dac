//! Semantic checks on a processed response.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::ServiceProviderConfig;
use crate::error::{SamlError, SamlResult};
use crate::types::{Response, SAML_VERSION};

/// Caller-supplied checks that run after the built-in ones.
pub trait ResponseValidator: Send + Sync {
    /// Accepts or rejects a fully processed response.
    ///
    /// ## Errors
    ///
    /// Returns an error to reject the response.
    fn validate(&self, response: &Response) -> SamlResult<()>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Response) -> SamlResult<()> + Send + Sync,
{
    fn validate(&self, response: &Response) -> SamlResult<()> {
        self(response)
    }
}

/// Checks the response's `Destination` and `Version` attributes.
///
/// ## Errors
///
/// Returns [`SamlError::InvalidDestination`] or
/// [`SamlError::UnsupportedVersion`].
pub fn validate_response_attributes(response: &Response, acs_url: &str) -> SamlResult<()> {
    let destination = response.destination.as_deref().unwrap_or_default();
    if destination != acs_url {
        return Err(SamlError::InvalidDestination {
            expected: acs_url.to_string(),
            actual: destination.to_string(),
        });
    }
    if response.version != SAML_VERSION {
        return Err(SamlError::UnsupportedVersion {
            expected: SAML_VERSION.to_string(),
            actual: response.version.clone(),
        });
    }
    Ok(())
}

/// Runs every built-in check: attributes, status, issuers, and each
/// assertion's conditions and bearer confirmations.
///
/// ## Errors
///
/// Returns the first failed check.
pub fn validate_response(
    response: &Response,
    config: &ServiceProviderConfig,
    now: DateTime<Utc>,
) -> SamlResult<()> {
    validate_response_attributes(response, &config.assertion_consumer_service_url)?;

    let status = response
        .status
        .as_ref()
        .ok_or_else(|| SamlError::MissingElement("Status".to_string()))?;
    if !status.is_success() {
        let err = SamlError::InvalidStatus {
            code: status.status_code.value.clone(),
            message: status.status_message.clone(),
        };
        warn!(error = %err, "Identity provider returned an error status");
        return Err(err);
    }

    if let (Some(expected), Some(actual)) =
        (&config.identity_provider_issuer, &response.issuer)
    {
        check_issuer(expected, actual)?;
    }

    if response.assertions.is_empty() {
        return Err(SamlError::MissingAssertion);
    }

    let skew = config.clock_skew();
    for assertion in &response.assertions {
        if let Some(expected) = &config.identity_provider_issuer {
            check_issuer(expected, &assertion.issuer)?;
        }
        assertion.validate_conditions(config.audience_uri.as_deref(), now, skew)?;
        assertion.validate_bearer_confirmations(
            &config.assertion_consumer_service_url,
            now,
            skew,
        )?;
    }
    Ok(())
}

fn check_issuer(expected: &str, actual: &str) -> SamlResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SamlError::InvalidIssuer {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
