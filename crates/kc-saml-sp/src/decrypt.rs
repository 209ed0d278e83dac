//! Replaces `saml:EncryptedAssertion` children of a response with their
//! decrypted `saml:Assertion`.

use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::keystore::{DecryptionMaterial, KeyStore};
use crate::types::{tags, EncryptedAssertion, FromElement, SAML_NS};
use crate::xml::{detach, find_direct_children, Document, Element, ElementRef, Node};

/// Decrypts every encrypted assertion of a response in place.
///
/// Key material is fetched from the key store at most once per decryptor.
pub struct AssertionDecryptor<'a> {
    key_store: Option<&'a dyn KeyStore>,
    material: Option<DecryptionMaterial>,
}

impl<'a> AssertionDecryptor<'a> {
    /// Creates a decryptor; `key_store` is only needed when the response
    /// actually contains encrypted assertions.
    #[must_use]
    pub fn new(key_store: Option<&'a dyn KeyStore>) -> Self {
        Self {
            key_store,
            material: None,
        }
    }

    /// Decrypts all encrypted assertions directly under `response`.
    ///
    /// Each encrypted assertion is removed and its plaintext assertion is
    /// appended to the response. Returns how many were replaced. Any failure
    /// aborts the pass.
    ///
    /// ## Errors
    ///
    /// - [`SamlError::UnexpectedParent`] if an encrypted assertion is not a
    ///   direct child of `response`
    /// - [`SamlError::InvalidEncryptedAssertion`] if one cannot be read
    /// - [`SamlError::NoDecryptionKeys`] / [`SamlError::KeyStore`] if no key
    ///   material is available
    /// - [`SamlError::Decryption`] if decryption fails
    /// - [`SamlError::InvalidDecryptedAssertion`] if the plaintext is not XML
    ///
    /// ## Panics
    ///
    /// Panics if an encrypted assertion found by the search cannot be removed.
    pub fn decrypt_all(&mut self, response: &mut Element) -> SamlResult<usize> {
        let matches = find_direct_children(response, SAML_NS, tags::ENCRYPTED_ASSERTION)?;

        // Each removal shifts later children one position to the left.
        for (removed, found) in matches.iter().enumerate() {
            let index = found.index - removed;
            let original = response
                .element_at(index)
                .ok_or_else(|| SamlError::Internal("encrypted assertion moved".to_string()))?;

            let detached = detach(&found.parent_scope, original);
            let encrypted = EncryptedAssertion::from_element(&ElementRef::root(&detached))
                .map_err(|e| match e {
                    SamlError::Unmarshal(reason) => SamlError::InvalidEncryptedAssertion(reason),
                    other => other,
                })?;

            let plaintext = encrypted.decrypt_bytes(self.material()?)?;
            let assertion = Document::parse(&plaintext)
                .map_err(|e| SamlError::InvalidDecryptedAssertion(e.to_string()))?
                .root
                .ok_or_else(|| {
                    SamlError::InvalidDecryptedAssertion("decrypted content is empty".to_string())
                })?;

            match response.remove_child_at(index) {
                Some(Node::Element(el)) if el.local_name() == tags::ENCRYPTED_ASSERTION => {}
                _ => panic!("unable to remove encrypted assertion"),
            }
            response.add_child(assertion);
        }

        if !matches.is_empty() {
            debug!(count = matches.len(), "Decrypted encrypted assertions");
        }
        Ok(matches.len())
    }

    fn material(&mut self) -> SamlResult<&DecryptionMaterial> {
        if self.material.is_none() {
            let store = self.key_store.ok_or(SamlError::NoDecryptionKeys)?;
            let material = store.key_pair().map_err(|e| match e {
                SamlError::KeyStore(_) | SamlError::NoDecryptionKeys => e,
                other => SamlError::KeyStore(other.to_string()),
            })?;
            self.material = Some(material);
        }
        self.material
            .as_ref()
            .ok_or_else(|| SamlError::Internal("decryption material not cached".to_string()))
    }
}
