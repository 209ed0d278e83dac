//! Typed SAML 2.0 response model.
//!
//! Values are built from a processed XML tree through [`FromElement`]; they
//! are never built from the raw, unvalidated input.

mod assertion;
mod constants;
mod encrypted;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use constants::*;
pub use encrypted::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::ElementRef;

/// Builds a typed value from an XML element.
pub trait FromElement: Sized {
    /// Reads `el`, failing with [`SamlError::Unmarshal`] when it does not fit.
    ///
    /// ## Errors
    ///
    /// Returns an error for the wrong element, a missing required attribute
    /// or child, or a malformed value.
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self>;
}

pub(crate) fn expect_element(el: &ElementRef<'_>, namespace: &str, local: &str) -> SamlResult<()> {
    if el.is(namespace, local) {
        Ok(())
    } else {
        Err(SamlError::Unmarshal(format!(
            "expected element {{{namespace}}}{local}, found {{{}}}{}",
            el.namespace(),
            el.local_name()
        )))
    }
}

pub(crate) fn required_attribute(el: &ElementRef<'_>, name: &str) -> SamlResult<String> {
    el.attribute(name).map(str::to_string).ok_or_else(|| {
        SamlError::Unmarshal(format!("{} is missing attribute {name}", el.local_name()))
    })
}

pub(crate) fn optional_attribute(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.attribute(name).map(str::to_string)
}

pub(crate) fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::Unmarshal(format!("invalid timestamp {value:?}: {e}")))
}

pub(crate) fn optional_instant(el: &ElementRef<'_>, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    el.attribute(name).map(parse_instant).transpose()
}

pub(crate) fn required_instant(el: &ElementRef<'_>, name: &str) -> SamlResult<DateTime<Utc>> {
    parse_instant(&required_attribute(el, name)?)
}

/// Trimmed text of the first `{namespace}local` child, if present.
pub(crate) fn child_text(el: &ElementRef<'_>, namespace: &str, local: &str) -> Option<String> {
    el.child_text(namespace, local).map(|text| text.trim().to_string())
}
