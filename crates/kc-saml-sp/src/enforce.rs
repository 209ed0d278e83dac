//! Per-assertion signature enforcement.
//!
//! Every `saml:Assertion` directly under the response is validated on a
//! detached copy. A verified assertion replaces the original in the tree,
//! so only verified content reaches the typed model.

use tracing::{debug, warn};

use crate::error::{SamlError, SamlResult};
use crate::signature::{SignatureError, SignatureValidator, ValidationContext};
use crate::types::{tags, SAML_NS};
use crate::xml::{detach, find_direct_children, Element, Node};

/// Assertion counts from one enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignedAssertions {
    /// Assertions whose signature verified.
    pub signed: usize,
    /// Assertions without a signature.
    pub unsigned: usize,
}

/// Validates the signature of every assertion in a response.
pub struct AssertionSignatureEnforcer<'a> {
    validator: &'a dyn SignatureValidator,
    ctx: &'a ValidationContext,
}

impl<'a> AssertionSignatureEnforcer<'a> {
    /// Creates an enforcer that validates with `validator` under `ctx`.
    #[must_use]
    pub fn new(validator: &'a dyn SignatureValidator, ctx: &'a ValidationContext) -> Self {
        Self { validator, ctx }
    }

    /// Validates and replaces the assertions of `response`.
    ///
    /// ## Errors
    ///
    /// - [`SamlError::UnexpectedParent`] for an assertion outside the
    ///   response's direct children
    /// - [`SamlError::SignatureInvalid`] if any signature fails
    /// - [`SamlError::MissingTransformed`] if the validator returns nothing
    /// - [`SamlError::MixedAssertionSignatures`] if signed and unsigned
    ///   assertions are mixed
    /// - [`SamlError::MissingSignature`] if no assertion is signed; the
    ///   caller decides whether that is acceptable
    ///
    /// ## Panics
    ///
    /// Panics if a verified assertion's original cannot be removed.
    pub fn enforce(&self, response: &mut Element) -> SamlResult<SignedAssertions> {
        let matches = find_direct_children(response, SAML_NS, tags::ASSERTION)?;
        let mut counts = SignedAssertions::default();
        let mut replaced = 0;

        for found in &matches {
            let index = found.index - replaced;
            let original = response
                .element_at(index)
                .ok_or_else(|| SamlError::Internal("assertion moved".to_string()))?;
            let id = original.attribute("ID").unwrap_or_default().to_string();

            let detached = detach(&found.parent_scope, original);
            let validated = match self.validator.validate(self.ctx, &detached) {
                Ok(Some(validated)) => validated,
                Ok(None) => return Err(SamlError::MissingTransformed("assertion".to_string())),
                Err(SignatureError::MissingSignature) => {
                    debug!(assertion_id = %id, "Assertion is not signed");
                    counts.unsigned += 1;
                    continue;
                }
                Err(SignatureError::Invalid(reason)) => {
                    warn!(assertion_id = %id, reason = %reason, "Assertion signature invalid");
                    return Err(SamlError::SignatureInvalid(reason));
                }
            };

            match response.remove_child_at(index) {
                Some(Node::Element(el)) if el.local_name() == tags::ASSERTION => {}
                _ => panic!("unable to remove assertion"),
            }
            response.add_child(validated);
            replaced += 1;
            counts.signed += 1;
            debug!(assertion_id = %id, "Assertion signature verified");
        }

        if counts.signed > 0 && counts.unsigned > 0 {
            return Err(SamlError::MixedAssertionSignatures);
        }
        if counts.signed == 0 {
            return Err(SamlError::MissingSignature);
        }
        Ok(counts)
    }
}
