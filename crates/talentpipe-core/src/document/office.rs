//! DOC/DOCX/TXT conversion paths. Single strategy each, no retry.

use std::io::Read;

use crate::document::Attempt;

/// Pulls the body text out of a DOCX archive's `word/document.xml`.
pub(super) fn extract_docx(bytes: &[u8]) -> Attempt {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| e.to_string())?;
    let mut file = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml: {e}"))?;

    let mut xml = String::new();
    file.read_to_string(&mut xml).map_err(|e| e.to_string())?;

    Ok(strip_xml(&xml))
}

/// Legacy binary DOC: scrape runs of printable text out of the blob.
///
/// The OLE container format is not parsed; resume text inside it is
/// stored as readable runs and this recovers enough for downstream
/// field extraction.
pub(super) fn extract_doc(bytes: &[u8]) -> Attempt {
    let mut runs = Vec::new();
    let mut current = String::new();

    for &b in bytes {
        if b == b'\n' || (0x20..0x7F).contains(&b) {
            current.push(b as char);
        } else if current.trim().len() >= 4 && current.chars().any(|c| c.is_alphabetic()) {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.trim().len() >= 4 && current.chars().any(|c| c.is_alphabetic()) {
        runs.push(current);
    }

    if runs.is_empty() {
        return Err("no printable text runs found".to_string());
    }
    Ok(runs.join("\n"))
}

/// Plain text needs no extraction, only a tolerant decode.
pub(super) fn extract_txt(bytes: &[u8]) -> Attempt {
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Drops markup from WordprocessingML, keeping paragraph breaks.
fn strip_xml(xml: &str) -> String {
    let with_breaks = xml.replace("</w:p>", "\n").replace("<w:br/>", "\n");

    let mut text = String::with_capacity(with_breaks.len());
    let mut in_tag = false;
    for c in with_breaks.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(xml_body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml_body.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx_with_body(
            "<w:document><w:body>\
             <w:p><w:r><w:t>Dana Cruz</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Rust &amp; Go</w:t></w:r></w:p>\
             </w:body></w:document>",
        );
        let text = extract_docx(&bytes).unwrap();
        assert!(text.contains("Dana Cruz\n"), "{text}");
        assert!(text.contains("Rust & Go"), "{text}");
    }

    #[test]
    fn docx_without_document_xml_fails() {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(extract_docx(&bytes).is_err());
    }

    #[test]
    fn doc_scrape_keeps_printable_runs() {
        let mut bytes = vec![0u8, 1, 2, 3];
        bytes.extend_from_slice(b"Dana Cruz, Backend Developer");
        bytes.extend_from_slice(&[0, 0, 0xFF]);
        bytes.extend_from_slice(b"ab"); // too short, dropped
        bytes.extend_from_slice(&[0]);
        bytes.extend_from_slice(b"Experience: 5 years");

        let text = extract_doc(&bytes).unwrap();
        assert!(text.contains("Dana Cruz, Backend Developer"));
        assert!(text.contains("Experience: 5 years"));
        assert!(!text.contains("ab\n"));
    }

    #[test]
    fn doc_with_no_text_fails() {
        assert!(extract_doc(&[0u8, 1, 2, 0xFF, 0xFE]).is_err());
    }
}
