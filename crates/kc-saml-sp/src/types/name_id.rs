//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use serde::{Deserialize, Serialize};

use super::{optional_attribute, FromElement, NameIdFormat, SAML_NS};
use crate::error::SamlResult;
use crate::xml::ElementRef;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,

    /// A provider identifier for the SP that was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_provided_id: Option<String>,
}

impl NameId {
    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }
}

impl FromElement for NameId {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAML_NS, "NameID")?;
        Ok(Self {
            value: el.text().trim().to_string(),
            format: optional_attribute(el, "Format"),
            name_qualifier: optional_attribute(el, "NameQualifier"),
            sp_name_qualifier: optional_attribute(el, "SPNameQualifier"),
            sp_provided_id: optional_attribute(el, "SPProvidedID"),
        })
    }
}
