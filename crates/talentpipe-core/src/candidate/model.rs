//! Candidate record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a candidate record was produced, ordered by confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMethod {
    /// Structured fields came from the field-extraction service.
    AiParser,
    /// Only header identity and raw document text were available.
    BasicExtraction,
    /// Entered by hand.
    Manual,
}

impl ImportMethod {
    /// Stable string form used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiParser => "ai_parser",
            Self::BasicExtraction => "basic_extraction",
            Self::Manual => "manual",
        }
    }

    /// Parses the storage form, defaulting unknown values to manual.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "ai_parser" => Self::AiParser,
            "basic_extraction" => Self::BasicExtraction,
            _ => Self::Manual,
        }
    }
}

impl std::fmt::Display for ImportMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only history entry on a candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Free-form note.
    pub note: String,
}

/// A candidate record as handed to the record store.
///
/// Email is the dedup key. Records that arrive without a usable
/// address get a synthesized unique placeholder so they can never be
/// silently merged with an unrelated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Candidate name, when known.
    pub name: Option<String>,
    /// Email address, always present.
    pub email: String,
    /// Phone number, when extracted.
    pub phone: Option<String>,
    /// Where the candidate came from (mailbox address, "manual", ...).
    pub source: String,
    /// Confidence tag for the import path that produced this record.
    pub import_method: ImportMethod,
    /// Skill keywords, possibly empty.
    pub skills: Vec<String>,
    /// Education summary.
    pub education: Option<String>,
    /// Work experience summary.
    pub experience: Option<String>,
    /// A resume document was attached and extracted.
    pub has_resume: bool,
    /// Filename of the extracted resume.
    pub resume_filename: Option<String>,
    /// Append-only event log.
    pub history: Vec<HistoryEntry>,
}

impl CandidateRecord {
    /// Appends a history entry.
    pub fn log(&mut self, timestamp: DateTime<Utc>, note: impl Into<String>) {
        self.history.push(HistoryEntry {
            timestamp,
            note: note.into(),
        });
    }
}

/// Structured fields returned by the field-extraction service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Candidate name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Skill keywords.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Education summary.
    pub education: Option<String>,
    /// Work experience summary.
    pub experience: Option<String>,
}
