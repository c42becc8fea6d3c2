//! PDF text-extraction strategies.
//!
//! Four independent attempts, ordered from most to least faithful.
//! Real-world resume PDFs arrive with junk before the header, broken
//! cross-reference tables, and exporter quirks that defeat any single
//! parser, so each strategy uses a different engine or input repair.

use std::io::Read;

use crate::document::Attempt;

/// Builds the PDF strategy chain over the given bytes.
pub(super) fn strategies(bytes: &[u8]) -> Vec<(&'static str, Box<dyn FnOnce() -> Attempt + '_>)> {
    vec![
        ("pdf-extract", Box::new(|| pdf_extract_default(bytes))),
        ("pdf-extract trimmed", Box::new(|| pdf_extract_trimmed(bytes))),
        ("lopdf pages", Box::new(|| lopdf_pages(bytes))),
        ("raw streams", Box::new(|| raw_streams(bytes))),
    ]
}

/// General-purpose parser with default options.
fn pdf_extract_default(bytes: &[u8]) -> Attempt {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
}

/// Same parser after stripping junk before the `%PDF` header.
///
/// Mail gateways sometimes prepend bytes to the document, which
/// shifts every cross-reference offset and breaks strict parsing.
fn pdf_extract_trimmed(bytes: &[u8]) -> Attempt {
    let start = find(bytes, b"%PDF", 0).ok_or_else(|| "no %PDF header found".to_string())?;
    if start == 0 {
        return Err("header already at offset 0, nothing to repair".to_string());
    }
    pdf_extract::extract_text_from_mem(&bytes[start..]).map_err(|e| e.to_string())
}

/// Page-by-page reconstruction with an alternate engine.
fn lopdf_pages(bytes: &[u8]) -> Attempt {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err("document has no pages".to_string());
    }
    document.extract_text(&pages).map_err(|e| e.to_string())
}

/// Last resort: inflate every content stream and scrape the text
/// show operators out of it.
fn raw_streams(bytes: &[u8]) -> Attempt {
    let mut collected = String::new();
    let mut pos = 0;
    let mut streams = 0;

    while let Some(start) = find(bytes, b"stream", pos) {
        let data_start = skip_eol(bytes, start + b"stream".len());
        let Some(end) = find(bytes, b"endstream", data_start) else {
            break;
        };

        streams += 1;
        if let Ok(inflated) = inflate(&bytes[data_start..end]) {
            collected.push_str(&scrape_show_operators(&inflated));
        }
        pos = end + b"endstream".len();
    }

    if streams == 0 {
        return Err("no content streams found".to_string());
    }
    Ok(collected)
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Pulls the literal strings out of `(..) Tj` and `(..) TJ` calls.
fn scrape_show_operators(content: &[u8]) -> String {
    use regex::bytes::Regex;
    use std::sync::OnceLock;

    static SHOW: OnceLock<Regex> = OnceLock::new();
    let re = SHOW.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"\(((?:[^()\\]|\\.)*)\)\s*T[jJ]").unwrap()
    });

    let mut text = String::new();
    for captures in re.captures_iter(content) {
        let literal = String::from_utf8_lossy(&captures[1]);
        text.push_str(&unescape(&literal));
        text.push(' ');
    }
    text
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

fn skip_eol(bytes: &[u8], mut pos: usize) -> usize {
    if bytes.get(pos) == Some(&b'\r') {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'\n') {
        pos += 1;
    }
    pos
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn raw_streams_scrapes_show_operators() {
        let content = b"BT /F1 12 Tf (Dana Cruz) Tj (Backend \\(Rust\\)) TJ ET";
        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n1 0 obj\n<< /Length 10 >>\nstream\n");
        pdf.extend_from_slice(&deflate(content));
        pdf.extend_from_slice(b"\nendstream\nendobj\n%%EOF");

        let text = raw_streams(&pdf).unwrap();
        assert!(text.contains("Dana Cruz"), "{text}");
        assert!(text.contains("Backend (Rust)"), "{text}");
    }

    #[test]
    fn raw_streams_without_streams_fails() {
        assert!(raw_streams(b"%PDF-1.4 nothing here").is_err());
    }

    #[test]
    fn trimmed_strategy_needs_leading_junk() {
        // Header at offset 0 means trimming cannot change anything.
        let err = pdf_extract_trimmed(b"%PDF-1.4 rest").unwrap_err();
        assert!(err.contains("offset 0"), "{err}");

        assert!(pdf_extract_trimmed(b"no header").is_err());
    }

    #[test]
    fn find_respects_start_offset() {
        let data = b"stream data endstream";
        assert_eq!(find(data, b"stream", 0), Some(0));
        assert_eq!(find(data, b"stream", 1), Some(15));
        assert_eq!(find(data, b"stream", 16), None);
    }
}
