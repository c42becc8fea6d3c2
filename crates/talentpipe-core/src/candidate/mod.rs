//! Candidate assembly, dedup, and persistence.

pub mod assembler;
pub mod model;
pub mod repository;

pub use assembler::{
    FieldExtractor, HeaderIdentity, RecordStore, UpsertOutcome, assemble, import,
};
pub use model::{CandidateRecord, ExtractedFields, HistoryEntry, ImportMethod};
pub use repository::CandidateStore;
