//! Document text extraction.
//!
//! Converts raw document bytes into plain text. PDF goes through an
//! ordered chain of independent strategies; DOC/DOCX/TXT each have a
//! single conversion path. A strategy's output only counts if it is
//! non-empty after trimming, so a success never carries empty text.

mod office;
mod pdf;

use crate::error::{Error, Result};

/// Outcome of a successful text extraction.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Extracted plain text, non-empty.
    pub text: String,
    /// Byte length of the source document.
    pub source_len: usize,
    /// Name of the strategy that produced the text.
    pub strategy: &'static str,
    /// Failure reasons from strategies tried before the winner.
    pub failures: Vec<String>,
}

/// A single extraction attempt: either text or a failure reason.
type Attempt = std::result::Result<String, String>;

/// Extracts plain text from document bytes.
///
/// The extension decides the path; unsupported extensions fail fast
/// without touching any parser.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] for extensions outside
/// pdf/doc/docx/txt, and [`Error::Unextractable`] with every
/// strategy's reason when no strategy yields text.
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<ExtractedDocument> {
    let strategies: Vec<(&'static str, Box<dyn FnOnce() -> Attempt + '_>)> =
        match extension.to_lowercase().as_str() {
            "pdf" => pdf::strategies(bytes),
            "docx" => vec![("docx xml", Box::new(|| office::extract_docx(bytes)))],
            "doc" => vec![("doc text runs", Box::new(|| office::extract_doc(bytes)))],
            "txt" => vec![("utf-8 decode", Box::new(|| office::extract_txt(bytes)))],
            other => return Err(Error::UnsupportedType(other.to_string())),
        };

    run_chain(bytes.len(), strategies)
}

/// Runs strategies in order, stopping at the first non-empty text.
fn run_chain(
    source_len: usize,
    strategies: Vec<(&'static str, Box<dyn FnOnce() -> Attempt + '_>)>,
) -> Result<ExtractedDocument> {
    let mut failures = Vec::new();

    for (name, attempt) in strategies {
        match attempt() {
            Ok(text) if !text.trim().is_empty() => {
                tracing::debug!(strategy = name, chars = text.len(), "text extracted");
                return Ok(ExtractedDocument {
                    text,
                    source_len,
                    strategy: name,
                    failures,
                });
            }
            Ok(_) => {
                tracing::debug!(strategy = name, "strategy produced empty text");
                failures.push(format!("{name}: produced empty text"));
            }
            Err(reason) => {
                tracing::debug!(strategy = name, reason, "strategy failed");
                failures.push(format!("{name}: {reason}"));
            }
        }
    }

    Err(Error::Unextractable(failures.join("; ")))
}
