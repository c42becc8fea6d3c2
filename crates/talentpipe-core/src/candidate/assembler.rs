//! Candidate assembly and dedup-aware import.
//!
//! Assembly always produces a usable record, degrading to
//! header-only identity when enrichment failed. Import dedups by
//! email: on collision only previously absent fields are filled in,
//! so a weaker-confidence import never overwrites existing data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::candidate::model::{CandidateRecord, ExtractedFields, ImportMethod};
use crate::error::Result;

/// Header-derived identity of the person who sent the message.
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentity {
    /// Display name from the From header.
    pub name: Option<String>,
    /// Address from the From header.
    pub email: Option<String>,
    /// Message subject, kept for the history log.
    pub subject: String,
}

/// Outcome of an upsert against the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Store-assigned record id.
    pub id: i64,
    /// True when the upsert created a new record.
    pub created: bool,
}

/// Candidate persistence, reduced to the two operations assembly
/// depends on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a record by its email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>>;

    /// Inserts or updates a record keyed by email.
    async fn upsert(&self, record: &CandidateRecord) -> Result<UpsertOutcome>;
}

/// Structured-field extraction over plain resume text.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extracts candidate fields from plain text.
    async fn extract_fields(&self, text: &str) -> Result<ExtractedFields>;
}

/// Builds a candidate record from whatever enrichment succeeded.
#[must_use]
pub fn assemble(
    identity: &HeaderIdentity,
    resume_filename: Option<&str>,
    fields: Option<ExtractedFields>,
    source: &str,
    now: DateTime<Utc>,
) -> CandidateRecord {
    let import_method = match (&fields, resume_filename) {
        (Some(_), _) => ImportMethod::AiParser,
        (None, Some(_)) => ImportMethod::BasicExtraction,
        (None, None) => ImportMethod::Manual,
    };
    let fields = fields.unwrap_or_default();

    let email = fields
        .email
        .clone()
        .or_else(|| identity.email.clone())
        .unwrap_or_else(placeholder_email);

    let mut record = CandidateRecord {
        name: fields.name.clone().or_else(|| identity.name.clone()),
        email,
        phone: fields.phone,
        source: source.to_string(),
        import_method,
        skills: fields.skills,
        education: fields.education,
        experience: fields.experience,
        has_resume: resume_filename.is_some(),
        resume_filename: resume_filename.map(str::to_string),
        history: Vec::new(),
    };
    record.log(
        now,
        format!("Imported ({import_method}) from message {:?}", identity.subject),
    );
    record
}

/// Unique placeholder for records arriving without a usable address.
fn placeholder_email() -> String {
    format!("no-email-{}@placeholder.invalid", Uuid::new_v4())
}

/// Imports a record through the store, merging on email collision.
///
/// # Errors
///
/// Propagates store failures.
pub async fn import<S: RecordStore + ?Sized>(
    store: &S,
    incoming: CandidateRecord,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome> {
    let record = match store.find_by_email(&incoming.email).await? {
        Some(existing) => merge(existing, &incoming, now),
        None => incoming,
    };
    let outcome = store.upsert(&record).await?;
    tracing::info!(
        email = %record.email,
        created = outcome.created,
        method = %record.import_method,
        "candidate imported"
    );
    Ok(outcome)
}

/// Fills only absent fields of the existing record and appends to
/// its history. Source and import method of the first import win.
fn merge(mut existing: CandidateRecord, incoming: &CandidateRecord, now: DateTime<Utc>) -> CandidateRecord {
    if existing.name.is_none() {
        existing.name = incoming.name.clone();
    }
    if existing.phone.is_none() {
        existing.phone = incoming.phone.clone();
    }
    if existing.skills.is_empty() {
        existing.skills = incoming.skills.clone();
    }
    if existing.education.is_none() {
        existing.education = incoming.education.clone();
    }
    if existing.experience.is_none() {
        existing.experience = incoming.experience.clone();
    }
    if !existing.has_resume && incoming.has_resume {
        existing.has_resume = true;
        existing.resume_filename = incoming.resume_filename.clone();
    }
    existing.log(
        now,
        format!("Re-imported ({})", incoming.import_method),
    );
    existing
}
