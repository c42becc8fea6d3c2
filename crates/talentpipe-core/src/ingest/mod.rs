//! Mailbox ingestion: listing, id resolution, and attachment download.

pub mod extractor;
pub mod indexer;
pub mod locator;

pub use extractor::{RawAttachment, download_part};
pub use indexer::{
    AttachmentDescriptor, DateFilter, ListFilters, MessageSummary, attachment_descriptors,
    is_job_related, is_resume_filename, list_messages,
};
pub use locator::{AttachmentId, locate};
