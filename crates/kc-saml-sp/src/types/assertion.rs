//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    child_text, confirmation_methods, optional_attribute, optional_instant, required_attribute,
    required_instant, FromElement, NameId, SAML_NS, SAML_VERSION,
};
use crate::error::{SamlError, SamlResult};
use crate::xml::ElementRef;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// Authentication statement describing how the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_statement: Option<AuthnStatement>,

    /// Attributes about the subject, merged across attribute statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_statement: Option<AttributeStatement>,

    /// Whether this assertion carried its own verified signature.
    #[serde(skip)]
    pub signed: bool,
}

impl Assertion {
    /// Returns the subject's name ID, if any.
    #[must_use]
    pub fn name_id(&self) -> Option<&NameId> {
        self.subject.as_ref().and_then(|s| s.name_id.as_ref())
    }

    /// Returns the values of the attribute called `name`.
    #[must_use]
    pub fn attribute_values(&self, name: &str) -> Option<&[String]> {
        self.attribute_statement
            .as_ref()?
            .attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.values.as_slice())
    }

    /// Validates the assertion conditions at `now`.
    ///
    /// Time bounds are widened by `skew`. When `audience` is given, some
    /// `AudienceRestriction` must name it.
    ///
    /// ## Errors
    ///
    /// Returns the first condition that does not hold.
    pub fn validate_conditions(
        &self,
        audience: Option<&str>,
        now: DateTime<Utc>,
        skew: Duration,
    ) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::UnsupportedVersion {
                expected: SAML_VERSION.to_string(),
                actual: self.version.clone(),
            });
        }

        let Some(conditions) = &self.conditions else {
            return match audience {
                Some(expected) => Err(SamlError::InvalidAudience {
                    expected: expected.to_string(),
                }),
                None => Ok(()),
            };
        };

        if let Some(not_before) = conditions.not_before {
            if now + skew < not_before {
                return Err(SamlError::AssertionNotYetValid);
            }
        }
        if let Some(not_on_or_after) = conditions.not_on_or_after {
            if now - skew >= not_on_or_after {
                return Err(SamlError::AssertionExpired);
            }
        }

        if let Some(expected) = audience {
            let valid_audience = conditions
                .audience_restrictions
                .iter()
                .any(|ar| ar.audiences.iter().any(|a| a == expected));
            if !valid_audience {
                return Err(SamlError::InvalidAudience {
                    expected: expected.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validates bearer subject confirmations against the assertion
    /// consumer service URL at `now`.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::InvalidSubjectConfirmation`] when a bearer
    /// confirmation names another recipient or has expired.
    pub fn validate_bearer_confirmations(
        &self,
        acs_url: &str,
        now: DateTime<Utc>,
        skew: Duration,
    ) -> SamlResult<()> {
        let Some(subject) = &self.subject else {
            return Ok(());
        };

        for confirmation in subject
            .subject_confirmations
            .iter()
            .filter(|c| c.method == confirmation_methods::BEARER)
        {
            let Some(data) = &confirmation.subject_confirmation_data else {
                continue;
            };
            if let Some(recipient) = &data.recipient {
                if recipient != acs_url {
                    return Err(SamlError::InvalidSubjectConfirmation(format!(
                        "recipient {recipient} does not match {acs_url}"
                    )));
                }
            }
            if let Some(not_on_or_after) = data.not_on_or_after {
                if now - skew >= not_on_or_after {
                    return Err(SamlError::InvalidSubjectConfirmation(
                        "bearer confirmation expired".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl FromElement for Assertion {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAML_NS, "Assertion")?;

        let issuer = child_text(el, SAML_NS, "Issuer")
            .ok_or_else(|| SamlError::Unmarshal("Assertion is missing Issuer".to_string()))?;

        let attribute_statements = el
            .children(SAML_NS, "AttributeStatement")
            .iter()
            .map(AttributeStatement::from_element)
            .collect::<SamlResult<Vec<_>>>()?;
        let attribute_statement = (!attribute_statements.is_empty()).then(|| AttributeStatement {
            attributes: attribute_statements
                .into_iter()
                .flat_map(|s| s.attributes)
                .collect(),
        });

        Ok(Self {
            id: required_attribute(el, "ID")?,
            version: required_attribute(el, "Version")?,
            issue_instant: required_instant(el, "IssueInstant")?,
            issuer,
            subject: el
                .child(SAML_NS, "Subject")
                .map(|s| Subject::from_element(&s))
                .transpose()?,
            conditions: el
                .child(SAML_NS, "Conditions")
                .map(|c| Conditions::from_element(&c))
                .transpose()?,
            authn_statement: el
                .child(SAML_NS, "AuthnStatement")
                .map(|s| AuthnStatement::from_element(&s))
                .transpose()?,
            attribute_statement,
            signed: false,
        })
    }
}

/// Subject of an assertion.
///
/// Identifies the principal that is the subject of all statements in the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier for the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Subject confirmation data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl FromElement for Subject {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            name_id: el
                .child(SAML_NS, "NameID")
                .map(|n| NameId::from_element(&n))
                .transpose()?,
            subject_confirmations: el
                .children(SAML_NS, "SubjectConfirmation")
                .iter()
                .map(SubjectConfirmation::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}

/// Subject confirmation.
///
/// Information that allows the assertion consumer to confirm the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl FromElement for SubjectConfirmation {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            method: required_attribute(el, "Method")?,
            subject_confirmation_data: el
                .child(SAML_NS, "SubjectConfirmationData")
                .map(|d| SubjectConfirmationData::from_element(&d))
                .transpose()?,
        })
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The request ID that this assertion responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Time before which the subject cannot be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// The location to which the assertion can be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// IP address of the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl FromElement for SubjectConfirmationData {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            in_response_to: optional_attribute(el, "InResponseTo"),
            not_on_or_after: optional_instant(el, "NotOnOrAfter")?,
            not_before: optional_instant(el, "NotBefore")?,
            recipient: optional_attribute(el, "Recipient"),
            address: optional_attribute(el, "Address"),
        })
    }
}

/// Conditions for assertion validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Time at or after which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_restrictions: Vec<AudienceRestriction>,

    /// One-time use condition.
    #[serde(default)]
    pub one_time_use: bool,
}

impl FromElement for Conditions {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            not_before: optional_instant(el, "NotBefore")?,
            not_on_or_after: optional_instant(el, "NotOnOrAfter")?,
            audience_restrictions: el
                .children(SAML_NS, "AudienceRestriction")
                .iter()
                .map(|ar| AudienceRestriction {
                    audiences: ar
                        .children(SAML_NS, "Audience")
                        .iter()
                        .map(|a| a.text().trim().to_string())
                        .collect(),
                })
                .collect(),
            one_time_use: el.child(SAML_NS, "OneTimeUse").is_some(),
        })
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// List of valid audiences.
    pub audiences: Vec<String>,
}

/// Authentication statement.
///
/// Describes the act of authentication performed by the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// The time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// The session index (for session management).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Time at which the session ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_not_on_or_after: Option<DateTime<Utc>>,

    /// The authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context: Option<AuthnContext>,

    /// The subject locality information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_locality: Option<SubjectLocality>,
}

impl FromElement for AuthnStatement {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        let authn_context = el.child(SAML_NS, "AuthnContext").map(|ctx| AuthnContext {
            authn_context_class_ref: child_text(&ctx, SAML_NS, "AuthnContextClassRef"),
            authn_context_decl_ref: child_text(&ctx, SAML_NS, "AuthnContextDeclRef"),
            authenticating_authorities: ctx
                .children(SAML_NS, "AuthenticatingAuthority")
                .iter()
                .map(|a| a.text().trim().to_string())
                .collect(),
        });
        let subject_locality = el
            .child(SAML_NS, "SubjectLocality")
            .map(|loc| SubjectLocality {
                address: optional_attribute(&loc, "Address"),
                dns_name: optional_attribute(&loc, "DNSName"),
            });

        Ok(Self {
            authn_instant: required_instant(el, "AuthnInstant")?,
            session_index: optional_attribute(el, "SessionIndex"),
            session_not_on_or_after: optional_instant(el, "SessionNotOnOrAfter")?,
            authn_context,
            subject_locality,
        })
    }
}

/// Authentication context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnContext {
    /// Authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,

    /// Authentication context declaration reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_decl_ref: Option<String>,

    /// Authenticating authorities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authenticating_authorities: Vec<String>,
}

/// Subject locality information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectLocality {
    /// IP address of the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// DNS name of the system from which the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
}

/// Attribute statement.
///
/// Contains attributes about the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatement {
    /// List of attributes.
    pub attributes: Vec<Attribute>,
}

impl FromElement for AttributeStatement {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            attributes: el
                .children(SAML_NS, "Attribute")
                .iter()
                .map(Attribute::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}

/// SAML Attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name (typically a URI).
    pub name: String,

    /// The format of the attribute name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,

    /// A human-readable name for the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// The attribute values.
    pub values: Vec<String>,
}

impl FromElement for Attribute {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            name: required_attribute(el, "Name")?,
            name_format: optional_attribute(el, "NameFormat"),
            friendly_name: optional_attribute(el, "FriendlyName"),
            values: el
                .children(SAML_NS, "AttributeValue")
                .iter()
                .map(ElementRef::text)
                .collect(),
        })
    }
}
