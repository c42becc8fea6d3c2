//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header decoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '=' {
            // Soft line break.
            if chars.peek() == Some(&'\r') {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    continue;
                }
            } else if chars.peek() == Some(&'\n') {
                chars.next();
                continue;
            }

            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
            } else {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        } else {
            result.push(ch as u8);
        }
    }

    Ok(result)
}

/// Decodes one RFC 2047 encoded word: `=?charset?encoding?text?=`.
///
/// Input that is not an encoded word is returned unchanged.
///
/// # Errors
///
/// Returns an error for a malformed encoded word.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !text.starts_with("=?") || !text.ends_with("?=") {
        return Ok(text.to_string());
    }

    let inner = &text[2..text.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    }

    let encoding = parts[1].to_uppercase();
    let encoded_text = parts[2];

    match encoding.as_str() {
        "B" => {
            let decoded = decode_base64(encoded_text)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => {
            // Q encoding uses underscore for space.
            let text_with_spaces = encoded_text.replace('_', " ");
            let decoded = decode_quoted_printable(&text_with_spaces)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        _ => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {encoding}"
        ))),
    }
}

/// Decodes a header value that may mix plain text and RFC 2047
/// encoded words, such as subjects and attachment filenames.
///
/// Malformed encoded words are kept verbatim rather than failing the
/// whole header.
#[must_use]
pub fn decode_header_text(value: &str) -> String {
    let mut result = String::new();
    let mut rest = value;

    while let Some(start) = rest.find("=?") {
        let (plain, tail) = rest.split_at(start);
        result.push_str(plain);

        if let Some(end) = tail.find("?=") {
            let word = &tail[..end + 2];
            match decode_rfc2047(word) {
                Ok(decoded) => result.push_str(&decoded),
                Err(_) => result.push_str(word),
            }
            rest = &tail[end + 2..];
            // Whitespace between adjacent encoded words is elided.
            if rest.trim_start().starts_with("=?") {
                rest = rest.trim_start();
            }
        } else {
            result.push_str(tail);
            rest = "";
        }
    }
    result.push_str(rest);
    result
}
