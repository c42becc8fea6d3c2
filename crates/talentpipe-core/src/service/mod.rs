//! High-level ingestion operations over per-operation sessions.

mod pipeline;

pub use pipeline::{
    BatchFailure, BatchOutcome, ImportedCandidate, IngestService, MailboxSettings,
};
