//! Service provider configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// Service provider settings for response validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    /// URL of this service provider's assertion consumer service.
    /// Responses must name it as their `Destination`.
    pub assertion_consumer_service_url: String,

    /// Audience that assertions must be restricted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_uri: Option<String>,

    /// Expected issuer of responses and assertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_provider_issuer: Option<String>,

    /// Disables every signature check. For testing only.
    #[serde(default)]
    pub skip_signature_validation: bool,

    /// Tolerated clock difference with the identity provider.
    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u32,

    /// Trusted identity provider certificates (PEM).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub idp_certificates: Vec<String>,

    /// Service provider decryption key (PKCS#8 PEM).
    #[serde(default, skip_serializing)]
    pub sp_private_key: Option<String>,

    /// Service provider certificate (PEM) matching `sp_private_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_certificate: Option<String>,
}

const fn default_clock_skew_seconds() -> u32 {
    30
}

impl ServiceProviderConfig {
    /// Creates a configuration with defaults for everything but the ACS URL.
    #[must_use]
    pub fn new(assertion_consumer_service_url: impl Into<String>) -> Self {
        Self {
            assertion_consumer_service_url: assertion_consumer_service_url.into(),
            audience_uri: None,
            identity_provider_issuer: None,
            skip_signature_validation: false,
            clock_skew_seconds: default_clock_skew_seconds(),
            idp_certificates: Vec::new(),
            sp_private_key: None,
            sp_certificate: None,
        }
    }

    /// Parses a TOML configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Config`] if the document is invalid.
    pub fn from_toml_str(content: &str) -> SamlResult<Self> {
        toml::from_str(content).map_err(|e| SamlError::Config(format!("failed to parse config: {e}")))
    }

    /// Loads a TOML configuration file.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> SamlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SamlError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Returns the clock skew as a duration.
    #[must_use]
    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.clock_skew_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ServiceProviderConfig::from_toml_str(
            r#"assertion_consumer_service_url = "https://sp.example.com/acs""#,
        )
        .unwrap();

        assert_eq!(config, ServiceProviderConfig::new("https://sp.example.com/acs"));
        assert_eq!(config.clock_skew(), chrono::Duration::seconds(30));
        assert!(!config.skip_signature_validation);
    }

    #[test]
    fn full_toml_is_read() {
        let config = ServiceProviderConfig::from_toml_str(
            r#"
            assertion_consumer_service_url = "https://sp.example.com/acs"
            audience_uri = "https://sp.example.com"
            identity_provider_issuer = "https://idp.example.com"
            skip_signature_validation = true
            clock_skew_seconds = 120
            idp_certificates = ["-----BEGIN CERTIFICATE-----\nAQID\n-----END CERTIFICATE-----"]
            "#,
        )
        .unwrap();

        assert_eq!(config.audience_uri.as_deref(), Some("https://sp.example.com"));
        assert_eq!(config.identity_provider_issuer.as_deref(), Some("https://idp.example.com"));
        assert!(config.skip_signature_validation);
        assert_eq!(config.clock_skew_seconds, 120);
        assert_eq!(config.idp_certificates.len(), 1);
    }

    #[test]
    fn missing_acs_url_is_a_config_error() {
        assert!(matches!(
            ServiceProviderConfig::from_toml_str("audience_uri = \"x\""),
            Err(SamlError::Config(_))
        ));
    }

    #[test]
    fn private_key_is_never_serialized() {
        let mut config = ServiceProviderConfig::new("https://sp.example.com/acs");
        config.sp_private_key = Some("secret".to_string());
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            ServiceProviderConfig::load("/nonexistent/sp.toml"),
            Err(SamlError::Config(_))
        ));
    }
}
