//! Minimal PEM reader for certificates and PKCS#8 keys.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

/// Extracts the DER payload of every `label` block in `pem`, in order.
pub(crate) fn pem_to_der(pem: &str, label: &str) -> SamlResult<Vec<Vec<u8>>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let mut blocks = Vec::new();
    let mut rest = pem;
    while let Some(start) = rest.find(&begin) {
        let body = &rest[start + begin.len()..];
        let end_pos = body
            .find(&end)
            .ok_or_else(|| SamlError::Config(format!("unterminated {label} PEM block")))?;

        let b64_data: String = body[..end_pos]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(&b64_data)
            .map_err(|e| SamlError::Config(format!("invalid {label} PEM block: {e}")))?;
        blocks.push(der);

        rest = &body[end_pos + end.len()..];
    }
    Ok(blocks)
}
