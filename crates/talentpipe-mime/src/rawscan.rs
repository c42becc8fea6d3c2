//! Raw attachment recovery by boundary scanning.
//!
//! Fallback used when a structured single-part fetch fails: the whole
//! raw message is split on its MIME boundary and each segment is
//! tested against an ordered set of match heuristics. A regex-based
//! extraction anchored on the declared filename runs as a last
//! resort. Heuristic matching over raw protocol text is best-effort
//! by nature, so every successful recovery reports which rule fired.

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::header::{Headers, extract_boundary, split_headers_body};
use crate::transfer::TransferEncoding;
use crate::ContentType;

/// What the caller knows about the part being recovered, from the
/// message's structural envelope.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    /// Declared filename, when the envelope had one.
    pub filename: Option<String>,
    /// Declared `type/subtype` in lowercase.
    pub mime_type: String,
}

impl ScanTarget {
    /// Lowercased extension of the declared filename.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.filename
            .as_ref()
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
    }
}

/// A single match heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Segment headers declare the target's filename.
    DeclaredFilename,
    /// Segment Content-Type equals the target's declared binary type.
    BinaryContentType,
    /// Segment is attachment-disposed and its filename shares the
    /// target's extension.
    DispositionWithExtension,
}

/// How a recovery succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPath {
    /// Boundary-split segment matched a rule.
    Segment(MatchRule),
    /// Filename-anchored regex over the raw text.
    Regex,
}

/// Configurable heuristics for the boundary scan.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Rules to try per segment, in order.
    pub order: Vec<MatchRule>,
    /// Content types a `BinaryContentType` match may accept.
    pub binary_types: Vec<String>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            order: vec![
                MatchRule::DeclaredFilename,
                MatchRule::BinaryContentType,
                MatchRule::DispositionWithExtension,
            ],
            binary_types: vec![
                "application/pdf".to_string(),
                "application/msword".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
                "application/rtf".to_string(),
                "application/vnd.oasis.opendocument.text".to_string(),
                "application/octet-stream".to_string(),
            ],
        }
    }
}

/// A recovered attachment segment, still transfer-encoded.
#[derive(Debug, Clone)]
pub struct RecoveredSegment {
    /// Declared transfer encoding of the segment body.
    pub encoding: TransferEncoding,
    /// Segment body text, trimmed of boundary trailers.
    pub body: String,
    /// Which heuristic produced the match.
    pub matched_by: RecoveryPath,
}

/// Recovers the target attachment's body from raw message text.
///
/// # Errors
///
/// Returns [`Error::NoMatchingSegment`] when neither the boundary
/// scan nor the regex fallback finds the target.
pub fn recover_attachment(
    raw: &str,
    target: &ScanTarget,
    rules: &ScanRules,
) -> Result<RecoveredSegment> {
    let mut failures = Vec::new();

    match scan_segments(raw, target, rules) {
        Ok(segment) => {
            tracing::debug!(matched_by = ?segment.matched_by, "boundary scan matched");
            return Ok(segment);
        }
        Err(e) => failures.push(format!("boundary scan: {e}")),
    }

    match scan_by_regex(raw, target) {
        Ok(segment) => {
            tracing::debug!("regex fallback matched");
            return Ok(segment);
        }
        Err(e) => failures.push(format!("regex fallback: {e}")),
    }

    Err(Error::NoMatchingSegment(failures.join("; ")))
}

/// Splits on the boundary and tests every segment against the rules.
fn scan_segments(
    raw: &str,
    target: &ScanTarget,
    rules: &ScanRules,
) -> Result<RecoveredSegment> {
    let (message_headers, _) = split_headers_body(raw);
    let boundary = extract_boundary(message_headers)
        .or_else(|| extract_boundary(raw))
        .ok_or(Error::MissingBoundary)?;

    let delimiter = format!("--{boundary}");

    // The piece before the first delimiter is the preamble; a segment
    // starting with "--" is the closing marker.
    for segment in raw.split(delimiter.as_str()).skip(1) {
        if segment.starts_with("--") {
            continue;
        }
        let segment = segment.trim_start_matches(['\r', '\n']);
        let (raw_headers, body) = split_headers_body(segment);
        let headers = Headers::parse(raw_headers)?;

        for rule in &rules.order {
            if segment_matches(*rule, &headers, target, rules) {
                let encoding = headers
                    .get("content-transfer-encoding")
                    .map(TransferEncoding::parse)
                    .unwrap_or_default();
                return Ok(RecoveredSegment {
                    encoding,
                    body: trim_segment_body(body),
                    matched_by: RecoveryPath::Segment(*rule),
                });
            }
        }
    }

    Err(Error::NoMatchingSegment(
        "no boundary segment matched any rule".to_string(),
    ))
}

fn segment_matches(
    rule: MatchRule,
    headers: &Headers,
    target: &ScanTarget,
    rules: &ScanRules,
) -> bool {
    match rule {
        MatchRule::DeclaredFilename => match (&target.filename, headers.attachment_filename()) {
            (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(&found),
            _ => false,
        },
        MatchRule::BinaryContentType => {
            let Some(value) = headers.get("content-type") else {
                return false;
            };
            let Ok(content_type) = ContentType::parse(value) else {
                return false;
            };
            let essence = content_type.essence();
            essence == target.mime_type && rules.binary_types.contains(&essence)
        }
        MatchRule::DispositionWithExtension => {
            let is_attachment = headers
                .get("content-disposition")
                .is_some_and(|d| d.to_lowercase().starts_with("attachment"));
            if !is_attachment {
                return false;
            }
            match (target.extension(), headers.attachment_filename()) {
                (Some(ext), Some(found)) => found.to_lowercase().ends_with(&format!(".{ext}")),
                _ => false,
            }
        }
    }
}

/// Filename-anchored extraction over the raw text: the filename in a
/// Content-Type or Content-Disposition header, eventually followed by
/// a Content-Transfer-Encoding header, a blank line, and the body up
/// to the next boundary marker.
fn scan_by_regex(raw: &str, target: &ScanTarget) -> Result<RecoveredSegment> {
    let filename = target
        .filename
        .as_ref()
        .ok_or_else(|| Error::NoMatchingSegment("no declared filename to anchor on".to_string()))?;

    let pattern = format!(
        r#"content-(?:type|disposition):[^\r\n]*{}.*?content-transfer-encoding:[ \t]*([a-z0-9-]+).*?\r?\n\r?\n(.*?)(?:\r?\n--|\z)"#,
        regex::escape(filename)
    );
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| Error::Parse(format!("bad recovery pattern: {e}")))?;

    let captures = re.captures(raw).ok_or_else(|| {
        Error::NoMatchingSegment(format!("filename {filename:?} not found in raw text"))
    })?;

    let encoding = TransferEncoding::parse(&captures[1]);
    Ok(RecoveredSegment {
        encoding,
        body: trim_segment_body(&captures[2]),
        matched_by: RecoveryPath::Regex,
    })
}

/// Trims whitespace and a trailing boundary terminator from a body.
fn trim_segment_body(body: &str) -> String {
    body.trim().trim_end_matches("--").trim_end().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE64_PDF: &str = "JVBERi0xLjQKJSVFT0Y=";

    fn raw_message(attachment_headers: &str) -> String {
        format!(
            "From: dana@example.com\r\n\
             Content-Type: multipart/mixed; boundary=\"b42\"\r\n\
             \r\n\
             --b42\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             Please find my resume attached.\r\n\
             --b42\r\n\
             {attachment_headers}\r\n\
             \r\n\
             {BASE64_PDF}\r\n\
             --b42--\r\n"
        )
    }

    fn pdf_target() -> ScanTarget {
        ScanTarget {
            filename: Some("resume.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
        }
    }

    #[test]
    fn matches_on_declared_filename() {
        let raw = raw_message(
            "Content-Type: application/pdf\r\n\
             Content-Disposition: attachment; filename=\"resume.pdf\"\r\n\
             Content-Transfer-Encoding: base64",
        );
        let found = recover_attachment(&raw, &pdf_target(), &ScanRules::default()).unwrap();

        assert_eq!(
            found.matched_by,
            RecoveryPath::Segment(MatchRule::DeclaredFilename)
        );
        assert_eq!(found.encoding, TransferEncoding::Base64);
        assert_eq!(found.body, BASE64_PDF);
    }

    #[test]
    fn matches_on_binary_content_type_without_filename() {
        let raw = raw_message(
            "Content-Type: application/pdf\r\n\
             Content-Transfer-Encoding: base64",
        );
        let target = ScanTarget {
            filename: None,
            mime_type: "application/pdf".to_string(),
        };
        let found = recover_attachment(&raw, &target, &ScanRules::default()).unwrap();

        assert_eq!(
            found.matched_by,
            RecoveryPath::Segment(MatchRule::BinaryContentType)
        );
        assert_eq!(found.body, BASE64_PDF);
    }

    #[test]
    fn matches_on_disposition_and_extension() {
        // Renamed file: same extension, different name.
        let raw = raw_message(
            "Content-Type: application/octet-stream\r\n\
             Content-Disposition: attachment; filename=\"dana-cruz.pdf\"\r\n\
             Content-Transfer-Encoding: base64",
        );
        let target = ScanTarget {
            filename: Some("resume.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
        };
        let found = recover_attachment(&raw, &target, &ScanRules::default()).unwrap();

        assert_eq!(
            found.matched_by,
            RecoveryPath::Segment(MatchRule::DispositionWithExtension)
        );
    }

    #[test]
    fn regex_fallback_without_boundary_header() {
        // Boundary header mangled so the split path cannot run.
        let raw = format!(
            "From: dana@example.com\r\n\
             Content-Type: multipart/mixed\r\n\
             \r\n\
             Content-Type: application/pdf; name=\"resume.pdf\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {BASE64_PDF}\r\n"
        );
        let found = recover_attachment(&raw, &pdf_target(), &ScanRules::default()).unwrap();

        assert_eq!(found.matched_by, RecoveryPath::Regex);
        assert_eq!(found.encoding, TransferEncoding::Base64);
        assert_eq!(found.body, BASE64_PDF);
    }

    #[test]
    fn no_match_reports_both_attempts() {
        let raw = raw_message(
            "Content-Type: image/png\r\n\
             Content-Disposition: attachment; filename=\"photo.png\"\r\n\
             Content-Transfer-Encoding: base64",
        );
        let target = ScanTarget {
            filename: Some("resume.docx".to_string()),
            mime_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                .to_string(),
        };
        let err = recover_attachment(&raw, &target, &ScanRules::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boundary scan"));
        assert!(message.contains("regex fallback"));
    }

    #[test]
    fn seven_bit_segment_keeps_raw_text() {
        let raw = raw_message(
            "Content-Type: text/plain\r\n\
             Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
             Content-Transfer-Encoding: 7bit",
        );
        let target = ScanTarget {
            filename: Some("notes.txt".to_string()),
            mime_type: "text/plain".to_string(),
        };
        let found = recover_attachment(&raw, &target, &ScanRules::default()).unwrap();
        assert_eq!(found.encoding, TransferEncoding::SevenBit);
    }

    #[test]
    fn trailing_terminator_is_trimmed() {
        assert_eq!(trim_segment_body("data\r\n--\r\n"), "data");
        assert_eq!(trim_segment_body("  data  "), "data");
    }
}
