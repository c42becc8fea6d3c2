//! Message and part header handling.

use std::collections::HashMap;
use std::fmt;

use crate::encoding::decode_header_text;
use crate::error::Result;

/// Collection of email headers, case-insensitive by name.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Parses headers from raw text, folding continuation lines.
    ///
    /// # Errors
    ///
    /// Infallible today; kept fallible for parity with the other
    /// parsers in this crate.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
            } else {
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                    current_value.clear();
                }
                if let Some((name, value)) = line.split_once(':') {
                    current_name = Some(name.trim().to_string());
                    current_value = value.trim().to_string();
                }
            }
        }

        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        Ok(headers)
    }

    /// Returns the filename declared for this part, decoded from any
    /// RFC 2047 words.
    ///
    /// Checks the Content-Disposition `filename` parameter first,
    /// then the Content-Type `name` parameter.
    #[must_use]
    pub fn attachment_filename(&self) -> Option<String> {
        let from_disposition = self
            .get("content-disposition")
            .and_then(|v| parameter_value(v, "filename"));
        let from_type = || {
            self.get("content-type")
                .and_then(|v| parameter_value(v, "name"))
        };

        from_disposition
            .or_else(from_type)
            .map(|raw| decode_header_text(&raw))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<_> = self.headers.iter().collect();
        sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (name, values) in sorted {
            let capitalized = name
                .split('-')
                .map(|part| {
                    let mut chars = part.chars();
                    chars.next().map_or_else(String::new, |first| {
                        first.to_uppercase().collect::<String>() + chars.as_str()
                    })
                })
                .collect::<Vec<_>>()
                .join("-");
            for value in values {
                writeln!(f, "{capitalized}: {value}")?;
            }
        }
        Ok(())
    }
}

/// Extracts a `key=value` or `key="value"` parameter from a
/// structured header value, case-insensitively.
#[must_use]
pub fn parameter_value(header_value: &str, key: &str) -> Option<String> {
    for segment in header_value.split(';') {
        if let Some((name, value)) = segment.split_once('=') {
            if name.trim().eq_ignore_ascii_case(key) {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

/// Splits a raw message or segment at the first blank line.
///
/// Handles both `\r\n\r\n` and bare `\n\n` separators. When no blank
/// line exists the whole input is treated as headers.
#[must_use]
pub fn split_headers_body(raw: &str) -> (&str, &str) {
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));
    let lf = raw.find("\n\n").map(|i| (i, 2));

    let split = match (crlf, lf) {
        (Some((a, wa)), Some((b, wb))) => {
            if a <= b {
                Some((a, wa))
            } else {
                Some((b, wb))
            }
        }
        (Some(s), None) | (None, Some(s)) => Some(s),
        (None, None) => None,
    };

    match split {
        Some((index, width)) => (&raw[..index], &raw[index + width..]),
        None => (raw, ""),
    }
}

/// Finds the multipart boundary declared in a raw message's headers.
#[must_use]
pub fn extract_boundary(raw_headers: &str) -> Option<String> {
    let lower = raw_headers.to_lowercase();
    let start = lower.find("boundary=")? + "boundary=".len();
    let rest = &raw_headers[start..];

    let value = if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next()?
    } else {
        rest.split([';', '\r', '\n', ' ']).next()?
    };

    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a From-style header into display name and address.
///
/// Handles `Name <addr@host>`, `<addr@host>`, and bare `addr@host`.
/// A missing display name yields `None` for the name; input without
/// angle brackets or `@` yields the raw value as the name.
#[must_use]
pub fn parse_mailbox(value: &str) -> (Option<String>, Option<String>) {
    let value = decode_header_text(value.trim());

    if let Some(open) = value.find('<') {
        if let Some(close) = value[open..].find('>') {
            let email = value[open + 1..open + close].trim().to_string();
            let name = value[..open].trim().trim_matches('"').to_string();
            let name = (!name.is_empty()).then_some(name);
            let email = (!email.is_empty()).then_some(email);
            return (name, email);
        }
    }

    if value.contains('@') {
        (None, Some(value.trim().to_string()))
    } else {
        ((!value.is_empty()).then_some(value), None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_folds_continuations() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "body"
        );
        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn filename_from_disposition() {
        let mut headers = Headers::new();
        headers.add("content-disposition", "attachment; filename=\"cv.pdf\"");
        assert_eq!(headers.attachment_filename(), Some("cv.pdf".to_string()));
    }

    #[test]
    fn filename_falls_back_to_type_name() {
        let mut headers = Headers::new();
        headers.add("content-type", "application/pdf; name=resume.pdf");
        assert_eq!(
            headers.attachment_filename(),
            Some("resume.pdf".to_string())
        );
    }

    #[test]
    fn filename_decodes_rfc2047() {
        let mut headers = Headers::new();
        headers.add(
            "content-disposition",
            "attachment; filename=\"=?utf-8?B?Y3YucGRm?=\"",
        );
        assert_eq!(headers.attachment_filename(), Some("cv.pdf".to_string()));
    }

    #[test]
    fn split_crlf_blank_line() {
        let (h, b) = split_headers_body("A: 1\r\nB: 2\r\n\r\nbody here");
        assert_eq!(h, "A: 1\r\nB: 2");
        assert_eq!(b, "body here");
    }

    #[test]
    fn split_lf_blank_line() {
        let (h, b) = split_headers_body("A: 1\n\nbody");
        assert_eq!(h, "A: 1");
        assert_eq!(b, "body");
    }

    #[test]
    fn split_without_blank_line() {
        let (h, b) = split_headers_body("A: 1\r\nB: 2");
        assert_eq!(h, "A: 1\r\nB: 2");
        assert_eq!(b, "");
    }

    #[test]
    fn boundary_quoted_and_bare() {
        assert_eq!(
            extract_boundary("Content-Type: multipart/mixed; boundary=\"--=_x123\""),
            Some("--=_x123".to_string())
        );
        assert_eq!(
            extract_boundary("Content-Type: multipart/mixed; boundary=simple; charset=utf-8"),
            Some("simple".to_string())
        );
        assert_eq!(extract_boundary("Content-Type: text/plain"), None);
    }

    #[test]
    fn mailbox_name_and_address() {
        assert_eq!(
            parse_mailbox("Dana Cruz <dana@example.com>"),
            (
                Some("Dana Cruz".to_string()),
                Some("dana@example.com".to_string())
            )
        );
    }

    #[test]
    fn mailbox_bare_address() {
        assert_eq!(
            parse_mailbox("dana@example.com"),
            (None, Some("dana@example.com".to_string()))
        );
    }

    #[test]
    fn mailbox_quoted_name() {
        assert_eq!(
            parse_mailbox("\"Cruz, Dana\" <dana@example.com>"),
            (
                Some("Cruz, Dana".to_string()),
                Some("dana@example.com".to_string())
            )
        );
    }

    #[test]
    fn mailbox_unparseable_keeps_raw_as_name() {
        assert_eq!(
            parse_mailbox("Recruiting Desk"),
            (Some("Recruiting Desk".to_string()), None)
        );
    }
}
