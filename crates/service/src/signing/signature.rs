use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::compositor::SignError;

/// Decode a signature payload sent by a drawing pad.
///
/// Accepts a base64 data URL (`data:image/png;base64,<payload>`) or a bare
/// base64 string.
pub fn decode_signature_data(data: &str) -> Result<Vec<u8>, SignError> {
    let data = data.trim();
    let payload = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => {
            if !header.ends_with(";base64") {
                return Err(SignError::InvalidSignature("data URL is not base64 encoded".into()));
            }
            body
        }
        _ => data,
    };
    if payload.is_empty() {
        return Err(SignError::InvalidSignature("empty signature payload".into()));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| SignError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_url_and_bare_base64() {
        assert_eq!(decode_signature_data("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_signature_data("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn rejects_empty_and_non_base64_payloads() {
        for bad in ["data:image/png;base64,", "", "data:image/png,rawbytes", "***"] {
            let res = decode_signature_data(bad);
            assert!(matches!(res, Err(SignError::InvalidSignature(_))), "{bad:?}");
        }
    }
}
