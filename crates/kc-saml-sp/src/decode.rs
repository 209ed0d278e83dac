//! Turns an encoded `SAMLResponse` value into an XML tree.
//!
//! The value is base64 (HTTP-POST binding). Some identity providers also
//! raw-DEFLATE the XML first, so a document that does not parse is
//! inflated and parsed again.

use std::io::Read;

use base64::Engine;
use flate2::read::DeflateDecoder;
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::xml::{Document, Element};

/// Upper bound on an inflated response.
pub const MAX_INFLATED_SIZE: u64 = 4 * 1024 * 1024;

/// Decodes a base64 (optionally raw-DEFLATE compressed) response.
///
/// Whitespace in the base64 text is ignored, as form encoders often wrap it.
///
/// ## Errors
///
/// - [`SamlError::Base64Decode`] for invalid base64
/// - [`SamlError::Deflate`] when the fallback inflate fails
/// - [`SamlError::XmlParse`] when the inflated bytes do not parse
/// - [`SamlError::EmptyDocument`] when the document has no root element
pub fn decode_response(encoded: &str) -> SamlResult<Element> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;

    let document = match Document::parse(&bytes) {
        Ok(document) => document,
        Err(parse_err) => {
            debug!(error = %parse_err, "Response is not plain XML, trying raw DEFLATE");
            let inflated = inflate(&bytes)?;
            Document::parse(&inflated)?
        }
    };

    document.root.ok_or(SamlError::EmptyDocument)
}

fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_SIZE + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;

    if out.len() as u64 > MAX_INFLATED_SIZE {
        return Err(SamlError::Deflate(format!(
            "inflated response exceeds {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(out)
}
