//! Reading a completed response into bytes, text and headers.

use std::io::Read;

use bytes::Bytes;
use horizon_relay_core::logging::targets;

use super::headers::ResponseHeaders;
use crate::transport::TransportResponse;

/// The materialized payload of one response.
///
/// Bytes and text always come from the same decoding pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extracted {
    /// The HTTP status code.
    pub status: u16,
    /// Decoded body bytes.
    pub bytes: Bytes,
    /// Body text decoded with the declared or assumed charset.
    pub text: String,
    /// Every response header.
    pub headers: ResponseHeaders,
}

/// Failure while decoding a response payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{coding} decoding failed: {message}")]
pub struct ExtractionError {
    /// The content coding being removed.
    pub coding: String,
    /// Underlying error text.
    pub message: String,
    /// Status of the response being extracted.
    pub status: u16,
    /// Headers of the response being extracted.
    pub headers: ResponseHeaders,
}

/// Materializes transport responses.
///
/// Extraction consumes the response, so each response is read at most once.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    /// Remove declared content codings and decode the body text.
    pub fn extract(self, response: TransportResponse) -> Result<Extracted, ExtractionError> {
        let TransportResponse {
            status,
            headers,
            body,
        } = response;

        let bytes = match decode_content(&headers, body) {
            Ok(bytes) => bytes,
            Err((coding, err)) => {
                return Err(ExtractionError {
                    coding,
                    message: err.to_string(),
                    status,
                    headers,
                });
            }
        };

        let charset = headers.get("Content-Type").and_then(charset_of);
        let text = decode_text(&bytes, charset.as_deref());

        Ok(Extracted {
            status,
            bytes,
            text,
            headers,
        })
    }
}

/// Undo every coding listed in `Content-Encoding`, last applied first.
fn decode_content(
    headers: &ResponseHeaders,
    body: Bytes,
) -> Result<Bytes, (String, std::io::Error)> {
    let Some(encoding) = headers.get("Content-Encoding") else {
        return Ok(body);
    };

    let codings: Vec<String> = encoding
        .split(',')
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty() && coding != "identity")
        .collect();

    let mut current = body;
    for coding in codings.iter().rev() {
        let mut decoded = Vec::new();
        let result = match coding.as_str() {
            "gzip" | "x-gzip" => flate2::read::GzDecoder::new(current.as_ref()).read_to_end(&mut decoded),
            "deflate" => flate2::read::ZlibDecoder::new(current.as_ref()).read_to_end(&mut decoded),
            other => {
                tracing::debug!(target: targets::EXTRACT, coding = other, "leaving unsupported content coding in place");
                return Ok(current);
            }
        };
        result.map_err(|err| (coding.clone(), err))?;
        current = Bytes::from(decoded);
    }
    Ok(current)
}

/// The `charset` parameter of a media type.
fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Decode `bytes` as text; UTF-8 is assumed when no charset is declared.
fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    match charset {
        None | Some("utf-8" | "utf8") => String::from_utf8_lossy(bytes).into_owned(),
        Some("iso-8859-1" | "latin1" | "latin-1" | "l1") => bytes.iter().map(|&b| b as char).collect(),
        Some("us-ascii" | "ascii") => bytes
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
            .collect(),
        Some(other) => {
            tracing::debug!(target: targets::EXTRACT, charset = other, "unsupported charset, decoding as UTF-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn response(headers: &[(&str, &str)], body: impl Into<Bytes>) -> TransportResponse {
        TransportResponse {
            status: 200,
            headers: headers.iter().copied().collect(),
            body: body.into(),
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_utf8() {
        let extracted = ResponseExtractor
            .extract(response(&[("Content-Type", "text/plain")], "héllo"))
            .unwrap();
        assert_eq!(extracted.text, "héllo");
        assert_eq!(extracted.bytes.as_ref(), "héllo".as_bytes());
    }

    #[test]
    fn test_gzip_is_decompressed() {
        let extracted = ResponseExtractor
            .extract(response(&[("Content-Encoding", "gzip")], gzip(b"hello")))
            .unwrap();
        assert_eq!(extracted.bytes.as_ref(), b"hello");
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn test_deflate_is_decompressed() {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"deflated").unwrap();
        let body = encoder.finish().unwrap();

        let extracted = ResponseExtractor
            .extract(response(&[("Content-Encoding", "deflate")], body))
            .unwrap();
        assert_eq!(extracted.text, "deflated");
    }

    #[test]
    fn test_corrupt_gzip_fails() {
        let err = ResponseExtractor
            .extract(response(&[("Content-Encoding", "gzip")], &b"not gzip at all"[..]))
            .unwrap_err();
        assert_eq!(err.coding, "gzip");
        assert_eq!(err.status, 200);
    }

    #[test]
    fn test_latin1_text_matches_bytes() {
        let body: &[u8] = &[b'c', b'a', b'f', 0xE9];
        let extracted = ResponseExtractor
            .extract(response(&[("Content-Type", "text/plain; charset=ISO-8859-1")], body))
            .unwrap();
        assert_eq!(extracted.text, "café");
        let reencoded: Vec<u8> = extracted.text.chars().map(|c| c as u8).collect();
        assert_eq!(reencoded, extracted.bytes.as_ref());
    }

    #[test]
    fn test_charset_parameter_parsing() {
        assert_eq!(charset_of("text/html; charset=\"UTF-8\""), Some("utf-8".to_string()));
        assert_eq!(charset_of("application/json"), None);
        assert_eq!(charset_of("text/plain;format=flowed; Charset=latin1"), Some("latin1".to_string()));
    }

    #[test]
    fn test_headers_are_copied() {
        let extracted = ResponseExtractor
            .extract(response(&[("ETag", "\"abc\""), ("X-Trace", "1")], ""))
            .unwrap();
        assert_eq!(extracted.headers.len(), 2);
        assert_eq!(extracted.headers.get("etag"), Some("\"abc\""));
        assert!(extracted.bytes.is_empty());
        assert!(extracted.text.is_empty());
    }
}
