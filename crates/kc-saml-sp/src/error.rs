//! SAML service-provider error types.
//!
//! Every failure of the response pipeline is reported as a [`SamlError`].
//! [`SamlError::kind`] groups variants by pipeline stage so callers can
//! decide what to log and what to show a user.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The encoded message could not be turned into a document.
    Decode,
    /// The document has an unexpected shape.
    Structure,
    /// A signature was missing or did not verify.
    Signature,
    /// The message cannot be trusted as a whole.
    Trust,
    /// An encrypted assertion could not be decrypted.
    Decryption,
    /// The message is well formed and trusted but not acceptable.
    Semantic,
    /// Configuration or an internal failure.
    Internal,
}

/// SAML service-provider errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// The document has no root element.
    #[error("unable to parse response")]
    EmptyDocument,

    /// An (encrypted) assertion is not a direct child of the response.
    #[error("found {element} with unexpected parent element: {parent}")]
    UnexpectedParent {
        /// Local name of the misplaced element.
        element: String,
        /// Qualified name of its actual parent (empty for the document).
        parent: String,
    },

    /// The element carries no signature.
    #[error("signature missing")]
    MissingSignature,

    /// A signature is present but invalid.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// The signature validator accepted an element but returned nothing.
    #[error("missing transformed {0}")]
    MissingTransformed(String),

    /// Signed and unsigned assertions in the same response.
    #[error("invalid to have both signed and unsigned assertions")]
    MixedAssertionSignatures,

    /// Neither the response nor its assertions are signed.
    #[error("response and/or assertions must be signed")]
    UnsignedResponse,

    /// No key store is configured for decryption.
    #[error("unable to get decryption certificate: no decryption certs available")]
    NoDecryptionKeys,

    /// The key store failed to produce key material.
    #[error("unable to get decryption certificate: error getting keypair: {0}")]
    KeyStore(String),

    /// The encrypted assertion could not be read.
    #[error("unable to unmarshal encrypted assertion: {0}")]
    InvalidEncryptedAssertion(String),

    /// Decryption failed.
    #[error("unable to decrypt encrypted assertion: {0}")]
    Decryption(String),

    /// The decrypted bytes are not an XML element.
    #[error("unable to create element from decrypted assertion bytes: {0}")]
    InvalidDecryptedAssertion(String),

    /// The processed tree does not match the response model.
    #[error("unable to unmarshal response: {0}")]
    Unmarshal(String),

    /// Missing required element.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Invalid destination.
    #[error("invalid destination: expected {expected}, got {actual}")]
    InvalidDestination {
        /// The configured assertion consumer service URL.
        expected: String,
        /// The Destination attribute of the response.
        actual: String,
    },

    /// Unsupported SAML version.
    #[error("unsupported SAML version: expected {expected}, got {actual}")]
    UnsupportedVersion {
        /// The supported version.
        expected: String,
        /// The version in the message.
        actual: String,
    },

    /// The identity provider reported a failure.
    #[error("response status is not success: {code}{}", status_suffix(.message))]
    InvalidStatus {
        /// Top-level status code.
        code: String,
        /// Status message, if any.
        message: Option<String>,
    },

    /// The response contains no assertion.
    #[error("response contains no assertion")]
    MissingAssertion,

    /// Invalid issuer.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// The configured identity provider issuer.
        expected: String,
        /// The issuer in the message.
        actual: String,
    },

    /// Invalid audience.
    #[error("invalid audience: expected {expected}")]
    InvalidAudience {
        /// The configured audience URI.
        expected: String,
    },

    /// Assertion expired.
    #[error("assertion expired")]
    AssertionExpired,

    /// Assertion not yet valid.
    #[error("assertion not yet valid")]
    AssertionNotYetValid,

    /// Bearer subject confirmation does not hold.
    #[error("invalid subject confirmation: {0}")]
    InvalidSubjectConfirmation(String),

    /// Rejected by caller-supplied validation.
    #[error("response rejected: {0}")]
    Rejected(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the pipeline stage this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Base64Decode(_) | Self::Deflate(_) | Self::XmlParse(_) | Self::EmptyDocument => {
                ErrorKind::Decode
            }
            Self::UnexpectedParent { .. } | Self::Unmarshal(_) | Self::MissingElement(_) => {
                ErrorKind::Structure
            }
            Self::MissingSignature | Self::SignatureInvalid(_) => ErrorKind::Signature,
            Self::MissingTransformed(_)
            | Self::MixedAssertionSignatures
            | Self::UnsignedResponse => ErrorKind::Trust,
            Self::NoDecryptionKeys
            | Self::KeyStore(_)
            | Self::InvalidEncryptedAssertion(_)
            | Self::Decryption(_)
            | Self::InvalidDecryptedAssertion(_) => ErrorKind::Decryption,
            Self::InvalidDestination { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidStatus { .. }
            | Self::MissingAssertion
            | Self::InvalidIssuer { .. }
            | Self::InvalidAudience { .. }
            | Self::AssertionExpired
            | Self::AssertionNotYetValid
            | Self::InvalidSubjectConfirmation(_)
            | Self::Rejected(_) => ErrorKind::Semantic,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status an assertion consumer endpoint should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Decode | ErrorKind::Structure | ErrorKind::Semantic => 400,
            ErrorKind::Signature | ErrorKind::Trust => 401,
            ErrorKind::Decryption => match self {
                Self::NoDecryptionKeys | Self::KeyStore(_) => 500,
                _ => 400,
            },
            ErrorKind::Internal => 500,
        }
    }
}

fn status_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default()
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for SamlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<kc_crypto::XmlEncError> for SamlError {
    fn from(err: kc_crypto::XmlEncError) -> Self {
        Self::Decryption(err.to_string())
    }
}
