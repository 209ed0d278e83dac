//! Common test utilities and fixtures.
//!
//! Responses are built as XML strings. Signatures use a marker scheme:
//! a `ds:Signature` child whose text is the base64 DER of the signing
//! certificate. [`MarkerSignatureValidator`] accepts it when that
//! certificate is trusted and returns the element without the signature.

use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

use kc_crypto::algorithm::uris;
use kc_crypto::{cipher, BlockCipherAlgorithm, KeyTransportAlgorithm};
use kc_saml_sp::xml::{Element, ElementRef, Node};
use kc_saml_sp::{
    FixedClock, MemoryCertificateStore, MemoryKeyStore, ServiceProvider, ServiceProviderConfig,
    SignatureError, SignatureValidator, ValidationContext, XMLDSIG_NS,
};

pub const ACS_URL: &str = "https://sp.example.com/saml/acs";
pub const AUDIENCE: &str = "https://sp.example.com";
pub const IDP_ISSUER: &str = "https://idp.example.com";

const NAMESPACES: &str = r#"xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:ds="http://www.w3.org/2000/09/xmldsig#""#;

/// Signature validator recognising marker signatures.
pub struct MarkerSignatureValidator;

impl SignatureValidator for MarkerSignatureValidator {
    fn validate(
        &self,
        ctx: &ValidationContext,
        element: &Element,
    ) -> Result<Option<Element>, SignatureError> {
        let view = ElementRef::root(element);
        let signature = view
            .child(XMLDSIG_NS, "Signature")
            .ok_or(SignatureError::MissingSignature)?;

        let cert = base64::engine::general_purpose::STANDARD
            .decode(signature.text().trim())
            .map_err(|_| SignatureError::Invalid("malformed signature value".to_string()))?;
        if !ctx.trusted_certificates().contains(&cert) {
            return Err(SignatureError::Invalid("untrusted signing certificate".to_string()));
        }

        let mut verified = element.clone();
        verified
            .children
            .retain(|n| !matches!(n, Node::Element(el) if el.local_name() == "Signature"));
        Ok(Some(verified))
    }
}

/// Test environment holding the identity provider and service provider keys.
pub struct TestEnv {
    /// Identity provider certificate (DER).
    pub idp_cert_der: Vec<u8>,
    /// Identity provider certificate (PEM).
    pub idp_cert_pem: String,
    /// Service provider decryption key (PKCS#8 DER).
    pub sp_private_key: Vec<u8>,
    /// Service provider public key (SubjectPublicKeyInfo DER).
    pub sp_public_key: Vec<u8>,
    /// Service provider certificate stand-in (DER).
    pub sp_cert_der: Vec<u8>,
    /// Fixed validation time.
    pub now: DateTime<Utc>,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kc_saml_sp=debug")
            .with_test_writer()
            .try_init();

        let params = rcgen::CertificateParams::new(vec!["idp.example.com".to_string()])?;
        let key_pair = rcgen::KeyPair::generate()?;
        let cert = params.self_signed(&key_pair)?;

        let (sp_private_key, sp_public_key) = kc_crypto::generate_rsa_key_pair()?;

        Ok(Self {
            idp_cert_der: cert.der().to_vec(),
            idp_cert_pem: cert.pem(),
            sp_private_key,
            sp_public_key,
            sp_cert_der: b"sp-certificate".to_vec(),
            now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        })
    }

    /// Configuration matching the generated responses.
    pub fn config(&self) -> ServiceProviderConfig {
        let mut config = ServiceProviderConfig::new(ACS_URL);
        config.audience_uri = Some(AUDIENCE.to_string());
        config.identity_provider_issuer = Some(IDP_ISSUER.to_string());
        config
    }

    /// Service provider trusting the IdP certificate, with decryption keys.
    pub fn service_provider(&self) -> anyhow::Result<ServiceProvider> {
        Ok(self.builder(self.config()).build()?)
    }

    /// Service provider without a key store.
    pub fn service_provider_without_keys(&self) -> anyhow::Result<ServiceProvider> {
        Ok(ServiceProvider::builder(self.config())
            .with_signature_validator(Arc::new(MarkerSignatureValidator))
            .with_certificate_store(Arc::new(MemoryCertificateStore::new(vec![self
                .idp_cert_der
                .clone()])))
            .with_clock(Arc::new(FixedClock::new(self.now)))
            .build()?)
    }

    pub fn builder(&self, config: ServiceProviderConfig) -> kc_saml_sp::ServiceProviderBuilder {
        ServiceProvider::builder(config)
            .with_signature_validator(Arc::new(MarkerSignatureValidator))
            .with_certificate_store(Arc::new(MemoryCertificateStore::new(vec![self
                .idp_cert_der
                .clone()])))
            .with_key_store(Arc::new(MemoryKeyStore::new(
                self.sp_private_key.clone(),
                self.sp_cert_der.clone(),
            )))
            .with_clock(Arc::new(FixedClock::new(self.now)))
    }

    /// Marker signature by the trusted IdP certificate.
    pub fn signature(&self) -> String {
        format!(
            "<ds:Signature>{}</ds:Signature>",
            base64::engine::general_purpose::STANDARD.encode(&self.idp_cert_der)
        )
    }

    /// A valid bearer assertion. With `standalone`, it declares its own
    /// namespaces, as a decrypted assertion must.
    pub fn assertion(&self, id: &str, signed: bool, standalone: bool) -> String {
        let ns = if standalone { NAMESPACES } else { "" };
        let signature = if signed { self.signature() } else { String::new() };
        let instant = self.now.to_rfc3339();
        let not_before = (self.now - Duration::minutes(5)).to_rfc3339();
        let not_on_or_after = (self.now + Duration::minutes(5)).to_rfc3339();

        format!(
            r#"<saml:Assertion {ns} ID="{id}" Version="2.0" IssueInstant="{instant}">
                 <saml:Issuer>{IDP_ISSUER}</saml:Issuer>
                 {signature}
                 <saml:Subject>
                   <saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">alice@example.com</saml:NameID>
                   <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
                     <saml:SubjectConfirmationData Recipient="{ACS_URL}" NotOnOrAfter="{not_on_or_after}"/>
                   </saml:SubjectConfirmation>
                 </saml:Subject>
                 <saml:Conditions NotBefore="{not_before}" NotOnOrAfter="{not_on_or_after}">
                   <saml:AudienceRestriction><saml:Audience>{AUDIENCE}</saml:Audience></saml:AudienceRestriction>
                 </saml:Conditions>
                 <saml:AuthnStatement AuthnInstant="{instant}" SessionIndex="_s-{id}"/>
                 <saml:AttributeStatement>
                   <saml:Attribute Name="email"><saml:AttributeValue>alice@example.com</saml:AttributeValue></saml:Attribute>
                 </saml:AttributeStatement>
               </saml:Assertion>"#
        )
    }

    /// A response around `children`, signed when `signed` is set.
    pub fn response(&self, children: &str, signed: bool) -> String {
        self.response_to(ACS_URL, children, signed)
    }

    pub fn response_to(&self, destination: &str, children: &str, signed: bool) -> String {
        let signature = if signed { self.signature() } else { String::new() };
        format!(
            r#"<samlp:Response {NAMESPACES} ID="_resp1" Version="2.0" IssueInstant="{}" Destination="{destination}" InResponseTo="_req1">
                 <saml:Issuer>{IDP_ISSUER}</saml:Issuer>
                 {signature}
                 <samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
                 {children}
               </samlp:Response>"#,
            self.now.to_rfc3339()
        )
    }

    /// Encrypts `plaintext` for the service provider as an
    /// `EncryptedAssertion` (AES-256-GCM, RSA-OAEP key transport).
    pub fn encrypted_assertion(&self, plaintext: &str) -> anyhow::Result<String> {
        let alg = BlockCipherAlgorithm::Aes256Gcm;
        let cek = cipher::generate_key(alg)?;
        let data = cipher::encrypt(alg, &cek, plaintext.as_bytes())?;
        let wrapped = kc_crypto::wrap_key(&self.sp_public_key, KeyTransportAlgorithm::RsaOaepSha256, &cek)?;
        let b64 = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);

        Ok(format!(
            r#"<saml:EncryptedAssertion>
                 <xenc:EncryptedData xmlns:xenc="http://www.w3.org/2001/04/xmlenc#" Type="http://www.w3.org/2001/04/xmlenc#Element">
                   <xenc:EncryptionMethod Algorithm="{}"/>
                   <ds:KeyInfo>
                     <xenc:EncryptedKey>
                       <xenc:EncryptionMethod Algorithm="{}">
                         <ds:DigestMethod Algorithm="{}"/>
                         <xenc11:MGF xmlns:xenc11="http://www.w3.org/2009/xmlenc11#" Algorithm="{}"/>
                       </xenc:EncryptionMethod>
                       <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>
                     </xenc:EncryptedKey>
                   </ds:KeyInfo>
                   <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>
                 </xenc:EncryptedData>
               </saml:EncryptedAssertion>"#,
            alg.uri(),
            uris::RSA_OAEP,
            uris::SHA256,
            uris::MGF1_SHA256,
            b64(&wrapped),
            b64(&data)
        ))
    }
}

/// Base64 form value, as posted by the browser.
pub fn encode(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Raw-DEFLATE then base64.
pub fn encode_deflated(xml: &str) -> anyhow::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes())?;
    Ok(base64::engine::general_purpose::STANDARD.encode(encoder.finish()?))
}
