//! SAML Response types.
//!
//! Response messages sent by an identity provider to a service provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    child_text, optional_attribute, required_attribute, required_instant, tags, Assertion,
    FromElement, Status, SAMLP_NS, SAML_NS,
};
use crate::error::SamlResult;
use crate::xml::ElementRef;

/// SAML Response.
///
/// A response message sent from an identity provider to a service provider
/// containing authentication results. Built only from a fully processed
/// tree: encrypted assertions have been replaced by their plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The consent obtained for this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,

    /// The status of the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// The assertions in this response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,

    /// Whether the response envelope carried a verified signature.
    #[serde(skip)]
    pub signed: bool,
}

impl Response {
    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_ref().is_some_and(Status::is_success)
    }

    /// Gets the first assertion if present.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }
}

impl FromElement for Response {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAMLP_NS, tags::RESPONSE)?;

        Ok(Self {
            id: required_attribute(el, "ID")?,
            version: required_attribute(el, "Version")?,
            issue_instant: required_instant(el, "IssueInstant")?,
            issuer: child_text(el, SAML_NS, "Issuer"),
            in_response_to: optional_attribute(el, "InResponseTo"),
            destination: optional_attribute(el, "Destination"),
            consent: optional_attribute(el, "Consent"),
            status: el
                .child(SAMLP_NS, "Status")
                .map(|s| Status::from_element(&s))
                .transpose()?,
            assertions: el
                .children(SAML_NS, tags::ASSERTION)
                .iter()
                .map(Assertion::from_element)
                .collect::<SamlResult<_>>()?,
            signed: false,
        })
    }
}
