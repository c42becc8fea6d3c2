//! # talentpipe-core
//!
//! Candidate ingestion from a mailbox: message listing and
//! filtering, attachment location and two-tier download, document
//! text extraction, and dedup-aware candidate assembly.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use talentpipe_core::{
//!     CandidateStore, DateFilter, IngestService, ListFilters,
//! };
//! use talentpipe_imap::SessionConfig;
//!
//! #[tokio::main]
//! async fn main() -> talentpipe_core::Result<()> {
//!     let store = Arc::new(CandidateStore::new("candidates.db").await?);
//!     let config = SessionConfig::for_email("hr@gmail.com", "app-password")?;
//!     let service = IngestService::new(config, store);
//!
//!     let filters = ListFilters {
//!         date_filter: DateFilter::Week,
//!         job_related: true,
//!         with_attachments: true,
//!     };
//!     let outcome = service.process_batch(&filters, Some(25)).await?;
//!     println!(
//!         "{} processed, {} imported",
//!         outcome.processed,
//!         outcome.imported.len()
//!     );
//!     Ok(())
//! }
//! ```

pub mod candidate;
pub mod document;
mod error;
pub mod ingest;
pub mod service;

pub use candidate::{
    CandidateRecord, CandidateStore, ExtractedFields, FieldExtractor, HeaderIdentity,
    HistoryEntry, ImportMethod, RecordStore, UpsertOutcome, assemble, import,
};
pub use document::{ExtractedDocument, extract_text};
pub use error::{Error, Result};
pub use ingest::{
    AttachmentDescriptor, AttachmentId, DateFilter, ListFilters, MessageSummary, RawAttachment,
    attachment_descriptors, download_part, is_job_related, is_resume_filename, list_messages,
    locate,
};
pub use service::{BatchFailure, BatchOutcome, ImportedCandidate, IngestService, MailboxSettings};
