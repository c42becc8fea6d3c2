//! Transfer encoding identification and normalization.

use std::fmt;

use crate::encoding::{decode_base64, decode_quoted_printable, encode_base64};
use crate::error::Result;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII. Also the fallback for unrecognized values.
    #[default]
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a transfer encoding header value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Normalizes a part body to base64 regardless of its declared
/// transfer encoding.
///
/// Base64 bodies have transport whitespace stripped and are validated
/// by a decode pass. Quoted-printable bodies are decoded to their true
/// bytes first. Everything else is treated as raw bytes and encoded
/// as-is.
///
/// # Errors
///
/// Returns an error when a body declared base64 or quoted-printable
/// does not decode.
pub fn normalize_to_base64(body: &[u8], encoding: TransferEncoding) -> Result<String> {
    match encoding {
        TransferEncoding::Base64 => {
            let text = String::from_utf8_lossy(body);
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            decode_base64(&cleaned)?;
            Ok(cleaned)
        }
        TransferEncoding::QuotedPrintable => {
            let text = String::from_utf8_lossy(body);
            let decoded = decode_quoted_printable(&text)?;
            Ok(encode_base64(&decoded))
        }
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Ok(encode_base64(body))
        }
    }
}

/// Decodes a part body from its declared transfer encoding to raw
/// bytes.
///
/// # Errors
///
/// Returns an error when the declared encoding does not decode.
pub fn decode_body(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => {
            let text = String::from_utf8_lossy(body);
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            decode_base64(&cleaned)
        }
        TransferEncoding::QuotedPrintable => {
            decode_quoted_printable(&String::from_utf8_lossy(body))
        }
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Ok(body.to_vec())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_encodings() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::parse("x-whatever"),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn normalize_base64_strips_line_breaks() {
        let body = b"SGVsbG8s\r\nIFdvcmxk\r\nIQ==";
        let normalized = normalize_to_base64(body, TransferEncoding::Base64).unwrap();
        assert_eq!(normalized, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&normalized).unwrap(), b"Hello, World!");
    }

    #[test]
    fn normalize_invalid_base64_fails() {
        let body = b"!!!not base64!!!";
        assert!(normalize_to_base64(body, TransferEncoding::Base64).is_err());
    }

    #[test]
    fn normalize_seven_bit_encodes_raw() {
        let body = b"plain text resume";
        let normalized = normalize_to_base64(body, TransferEncoding::SevenBit).unwrap();
        assert_eq!(decode_base64(&normalized).unwrap(), body);
    }

    #[test]
    fn normalize_eight_bit_preserves_length() {
        let body: Vec<u8> = (0..=255).collect();
        let normalized = normalize_to_base64(&body, TransferEncoding::EightBit).unwrap();
        assert_eq!(decode_base64(&normalized).unwrap().len(), body.len());
    }

    #[test]
    fn normalize_quoted_printable_decodes_first() {
        let body = b"H=C3=A9llo";
        let normalized = normalize_to_base64(body, TransferEncoding::QuotedPrintable).unwrap();
        assert_eq!(decode_base64(&normalized).unwrap(), "Héllo".as_bytes());
    }

    #[test]
    fn decode_body_base64() {
        assert_eq!(
            decode_body(b"SGVsbG8=", TransferEncoding::Base64).unwrap(),
            b"Hello"
        );
    }
}
