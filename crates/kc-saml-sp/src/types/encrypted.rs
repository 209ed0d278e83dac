//! XML Encryption types for `saml:EncryptedAssertion`.
//!
//! An encrypted assertion holds an `xenc:EncryptedData` whose content key is
//! carried by an `xenc:EncryptedKey`, either inside the data's `ds:KeyInfo`
//! or as a sibling of the data.

use base64::Engine;
use serde::{Deserialize, Serialize};

use kc_crypto::{cipher, BlockCipherAlgorithm, KeyTransportAlgorithm};

use super::{
    child_text, optional_attribute, tags, FromElement, SAML_NS, XMLDSIG_NS, XMLENC11_NS,
    XMLENC_NS,
};
use crate::error::{SamlError, SamlResult};
use crate::keystore::DecryptionMaterial;
use crate::xml::ElementRef;

/// Encrypted assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAssertion {
    /// The encrypted assertion content.
    pub encrypted_data: EncryptedData,

    /// Keys carried next to the data rather than inside its key info.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_keys: Vec<EncryptedKey>,
}

impl EncryptedAssertion {
    /// Returns the key that wraps the content key.
    ///
    /// A key inside the data's `KeyInfo` wins over sibling keys.
    #[must_use]
    pub fn encrypted_key(&self) -> Option<&EncryptedKey> {
        self.encrypted_data
            .key_info
            .as_ref()
            .and_then(|ki| ki.encrypted_key.as_deref())
            .or_else(|| self.encrypted_keys.first())
    }

    /// Decrypts the assertion and returns the plaintext bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Decryption`] when no key is present, the key is
    /// addressed to another certificate, an algorithm is unsupported, or a
    /// cipher operation fails.
    pub fn decrypt_bytes(&self, material: &DecryptionMaterial) -> SamlResult<Vec<u8>> {
        let encrypted_key = self
            .encrypted_key()
            .ok_or_else(|| SamlError::Decryption("no EncryptedKey found".to_string()))?;

        let content_key = encrypted_key.decrypt_key(material)?;

        let method = self.encrypted_data.encryption_method.as_ref().ok_or_else(|| {
            SamlError::Decryption("EncryptedData has no EncryptionMethod".to_string())
        })?;
        let algorithm = BlockCipherAlgorithm::from_uri(&method.algorithm)?;
        let data = self.encrypted_data.cipher_data.decode()?;

        Ok(cipher::decrypt(algorithm, &content_key, &data)?)
    }
}

impl FromElement for EncryptedAssertion {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        super::expect_element(el, SAML_NS, tags::ENCRYPTED_ASSERTION)?;

        let encrypted_data = el
            .child(XMLENC_NS, "EncryptedData")
            .ok_or_else(|| {
                SamlError::Unmarshal("EncryptedAssertion is missing EncryptedData".to_string())
            })
            .and_then(|data| EncryptedData::from_element(&data))?;

        Ok(Self {
            encrypted_data,
            encrypted_keys: el
                .children(XMLENC_NS, "EncryptedKey")
                .iter()
                .map(EncryptedKey::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}

/// Encrypted data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// The `Id` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The `Type` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,

    /// The encryption algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_method: Option<EncryptionMethod>,

    /// Key info for decryption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_info: Option<KeyInfo>,

    /// The cipher data.
    pub cipher_data: CipherData,
}

impl FromElement for EncryptedData {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            id: optional_attribute(el, "Id"),
            type_uri: optional_attribute(el, "Type"),
            encryption_method: read_encryption_method(el),
            key_info: read_key_info(el)?,
            cipher_data: read_cipher_data(el)?,
        })
    }
}

/// Encryption method with optional OAEP parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMethod {
    /// The algorithm URI.
    pub algorithm: String,

    /// `ds:DigestMethod` algorithm (OAEP only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_method: Option<String>,

    /// `xenc11:MGF` algorithm (OAEP only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mgf: Option<String>,
}

/// Key information for encryption/decryption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Encrypted key data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<Box<EncryptedKey>>,

    /// Key name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Base64 `X509Certificate` values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x509_certificates: Vec<String>,
}

/// Encrypted key data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    /// The `Id` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The `Recipient` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// The encryption algorithm used for the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_method: Option<EncryptionMethod>,

    /// Identifies the key that wrapped this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_info: Option<KeyInfo>,

    /// The cipher data containing the encrypted key.
    pub cipher_data: CipherData,
}

impl EncryptedKey {
    /// Unwraps the content-encryption key with the service provider's key.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Decryption`] if the key names a different
    /// certificate, the algorithm is unsupported, or unwrapping fails.
    pub fn decrypt_key(&self, material: &DecryptionMaterial) -> SamlResult<Vec<u8>> {
        if let Some(cert_b64) = self
            .key_info
            .as_ref()
            .and_then(|ki| ki.x509_certificates.first())
        {
            let cert = decode_base64(cert_b64)
                .map_err(|e| SamlError::Decryption(format!("invalid X509Certificate: {e}")))?;
            if cert != material.certificate() {
                return Err(SamlError::Decryption(
                    "key decryption attempted with mismatched cert".to_string(),
                ));
            }
        }

        let method = self.encryption_method.as_ref().ok_or_else(|| {
            SamlError::Decryption("EncryptedKey has no EncryptionMethod".to_string())
        })?;
        let algorithm = KeyTransportAlgorithm::from_uri(
            &method.algorithm,
            method.digest_method.as_deref(),
            method.mgf.as_deref(),
        )?;
        let wrapped = self.cipher_data.decode()?;

        Ok(kc_crypto::unwrap_key(material.private_key(), algorithm, &wrapped)?)
    }
}

impl FromElement for EncryptedKey {
    fn from_element(el: &ElementRef<'_>) -> SamlResult<Self> {
        Ok(Self {
            id: optional_attribute(el, "Id"),
            recipient: optional_attribute(el, "Recipient"),
            encryption_method: read_encryption_method(el),
            key_info: read_key_info(el)?,
            cipher_data: read_cipher_data(el)?,
        })
    }
}

/// Cipher data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherData {
    /// The cipher value (base64 encoded).
    pub cipher_value: String,
}

impl CipherData {
    /// Decodes the base64 cipher value, ignoring line breaks.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Decryption`] if the value is not base64.
    pub fn decode(&self) -> SamlResult<Vec<u8>> {
        decode_base64(&self.cipher_value)
            .map_err(|e| SamlError::Decryption(format!("invalid CipherValue: {e}")))
    }
}

fn decode_base64(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

fn read_encryption_method(el: &ElementRef<'_>) -> Option<EncryptionMethod> {
    el.child(XMLENC_NS, "EncryptionMethod").map(|method| EncryptionMethod {
        algorithm: method.attribute("Algorithm").unwrap_or_default().to_string(),
        digest_method: method
            .child(XMLDSIG_NS, "DigestMethod")
            .and_then(|d| d.attribute("Algorithm").map(str::to_string)),
        mgf: method
            .child(XMLENC11_NS, "MGF")
            .and_then(|m| m.attribute("Algorithm").map(str::to_string)),
    })
}

fn read_key_info(el: &ElementRef<'_>) -> SamlResult<Option<KeyInfo>> {
    let Some(key_info) = el.child(XMLDSIG_NS, "KeyInfo") else {
        return Ok(None);
    };

    let encrypted_key = key_info
        .child(XMLENC_NS, "EncryptedKey")
        .map(|ek| EncryptedKey::from_element(&ek).map(Box::new))
        .transpose()?;

    let x509_certificates = key_info
        .children(XMLDSIG_NS, "X509Data")
        .iter()
        .flat_map(|data| data.children(XMLDSIG_NS, "X509Certificate"))
        .map(|cert| cert.text().trim().to_string())
        .collect();

    Ok(Some(KeyInfo {
        encrypted_key,
        key_name: child_text(&key_info, XMLDSIG_NS, "KeyName"),
        x509_certificates,
    }))
}

fn read_cipher_data(el: &ElementRef<'_>) -> SamlResult<CipherData> {
    el.child(XMLENC_NS, "CipherData")
        .and_then(|cd| child_text(&cd, XMLENC_NS, "CipherValue"))
        .map(|cipher_value| CipherData { cipher_value })
        .ok_or_else(|| {
            SamlError::Unmarshal(format!("{} is missing CipherData/CipherValue", el.local_name()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;
    use kc_crypto::algorithm::uris;

    const PLAINTEXT: &[u8] = b"<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\"/>";

    struct Fixture {
        material: DecryptionMaterial,
        public_key: Vec<u8>,
    }

    fn fixture() -> Fixture {
        let (private_key, public_key) = kc_crypto::generate_rsa_key_pair().unwrap();
        Fixture {
            material: DecryptionMaterial::new(private_key, b"sp-certificate".to_vec()),
            public_key,
        }
    }

    fn b64(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn encrypted_assertion_xml(
        fx: &Fixture,
        data_alg: BlockCipherAlgorithm,
        key_inside: bool,
        key_cert: Option<&str>,
    ) -> String {
        let cek = cipher::generate_key(data_alg).unwrap();
        let data = cipher::encrypt(data_alg, &cek, PLAINTEXT).unwrap();
        let wrapped =
            kc_crypto::wrap_key(&fx.public_key, KeyTransportAlgorithm::RsaOaepSha1, &cek).unwrap();

        let cert_info = key_cert
            .map(|c| {
                format!(
                    "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>",
                    b64(c.as_bytes())
                )
            })
            .unwrap_or_default();
        let encrypted_key = format!(
            r#"<xenc:EncryptedKey>
                 <xenc:EncryptionMethod Algorithm="{}">
                   <ds:DigestMethod Algorithm="{}"/>
                 </xenc:EncryptionMethod>
                 {cert_info}
                 <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>
               </xenc:EncryptedKey>"#,
            uris::RSA_OAEP_MGF1P,
            uris::SHA1,
            b64(&wrapped)
        );
        let (inside, sibling) = if key_inside {
            (format!("<ds:KeyInfo>{encrypted_key}</ds:KeyInfo>"), String::new())
        } else {
            (String::new(), encrypted_key)
        };

        format!(
            r#"<saml:EncryptedAssertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"
                 xmlns:xenc="http://www.w3.org/2001/04/xmlenc#"
                 xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
               <xenc:EncryptedData Type="http://www.w3.org/2001/04/xmlenc#Element">
                 <xenc:EncryptionMethod Algorithm="{}"/>
                 {inside}
                 <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>
               </xenc:EncryptedData>
               {sibling}
             </saml:EncryptedAssertion>"#,
            data_alg.uri(),
            b64(&data)
        )
    }

    fn parse(xml: &str) -> EncryptedAssertion {
        let root = Document::parse_str(xml).unwrap().root.unwrap();
        EncryptedAssertion::from_element(&ElementRef::root(&root)).unwrap()
    }

    #[test]
    fn decrypts_with_key_inside_key_info() {
        let fx = fixture();
        let ea = parse(&encrypted_assertion_xml(&fx, BlockCipherAlgorithm::Aes256Cbc, true, None));

        assert!(ea.encrypted_keys.is_empty());
        assert!(ea.encrypted_key().is_some());
        assert_eq!(ea.decrypt_bytes(&fx.material).unwrap(), PLAINTEXT);
    }

    #[test]
    fn decrypts_with_sibling_key_and_gcm() {
        let fx = fixture();
        let ea = parse(&encrypted_assertion_xml(&fx, BlockCipherAlgorithm::Aes128Gcm, false, None));

        assert_eq!(ea.encrypted_keys.len(), 1);
        assert_eq!(ea.decrypt_bytes(&fx.material).unwrap(), PLAINTEXT);
    }

    #[test]
    fn key_for_another_certificate_is_refused() {
        let fx = fixture();
        let ea = parse(&encrypted_assertion_xml(
            &fx,
            BlockCipherAlgorithm::Aes128Cbc,
            true,
            Some("someone-else"),
        ));

        let err = ea.decrypt_bytes(&fx.material).unwrap_err();
        assert!(err.to_string().contains("mismatched cert"));
    }

    #[test]
    fn key_for_our_certificate_is_accepted() {
        let fx = fixture();
        let ea = parse(&encrypted_assertion_xml(
            &fx,
            BlockCipherAlgorithm::Aes128Cbc,
            true,
            Some("sp-certificate"),
        ));
        assert_eq!(ea.decrypt_bytes(&fx.material).unwrap(), PLAINTEXT);
    }

    #[test]
    fn wrong_private_key_fails() {
        let fx = fixture();
        let other = fixture();
        let ea = parse(&encrypted_assertion_xml(&fx, BlockCipherAlgorithm::Aes256Gcm, true, None));

        assert!(matches!(
            ea.decrypt_bytes(&other.material),
            Err(SamlError::Decryption(_))
        ));
    }

    #[test]
    fn missing_encrypted_data_is_an_unmarshal_error() {
        let root = Document::parse_str(
            r#"<saml:EncryptedAssertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"/>"#,
        )
        .unwrap()
        .root
        .unwrap();
        assert!(matches!(
            EncryptedAssertion::from_element(&ElementRef::root(&root)),
            Err(SamlError::Unmarshal(_))
        ));
    }

    #[test]
    fn missing_key_is_a_decryption_error() {
        let ea = parse(
            r#"<saml:EncryptedAssertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"
                 xmlns:xenc="http://www.w3.org/2001/04/xmlenc#">
               <xenc:EncryptedData>
                 <xenc:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes128-cbc"/>
                 <xenc:CipherData><xenc:CipherValue>AAAA</xenc:CipherValue></xenc:CipherData>
               </xenc:EncryptedData>
             </saml:EncryptedAssertion>"#,
        );
        let fx = fixture();
        assert!(matches!(
            ea.decrypt_bytes(&fx.material),
            Err(SamlError::Decryption(msg)) if msg.contains("no EncryptedKey")
        ));
    }
}
