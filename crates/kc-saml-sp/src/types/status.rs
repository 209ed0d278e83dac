//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use serde::{Deserialize, Serialize};

use super::{child_text, required_attribute, status_codes, FromElement, SAMLP_NS};
use crate::error::SamlResult;
use crate::xml::ElementRef;

/// SAML protocol status.
///
/// Contains the status code and optional message for a SAML response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// Optional detailed status information (serialized XML).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::new(status_codes::SUCCESS),
            status_message: None,
            status_detail: None,
        }
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

impl FromElement for Status {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAMLP_NS, "Status")?;

        let status_code = el
            .child(SAMLP_NS, "StatusCode")
            .map(|code| StatusCode::from_element(&code))
            .transpose()?
            .ok_or_else(|| {
                crate::SamlError::Unmarshal("Status is missing StatusCode".to_string())
            })?;

        let status_detail = el.child(SAMLP_NS, "StatusDetail").map(|detail| {
            detail
                .element()
                .child_elements()
                .map(crate::xml::Element::to_xml)
                .collect::<String>()
        });

        Ok(Self {
            status_code,
            status_message: child_text(el, SAMLP_NS, "StatusMessage"),
            status_detail,
        })
    }
}

/// SAML status code.
///
/// Status codes can be nested, with a top-level code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }
}

impl FromElement for StatusCode {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAMLP_NS, "StatusCode")?;
        let nested = el
            .child(SAMLP_NS, "StatusCode")
            .map(|sub| StatusCode::from_element(&sub).map(Box::new))
            .transpose()?;

        Ok(Self {
            value: required_attribute(el, "Value")?,
            status_code: nested,
        })
    }
}
