//! Error types for the core pipeline.

use thiserror::Error;

/// Errors that can occur in pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Mailbox connection, authentication, or TLS failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server-side search failed or the filter could not be built.
    #[error("Search error: {0}")]
    Search(String),

    /// Attachment id does not match the `att-<uid>-<ordinal>` format.
    #[error("Invalid attachment id: {0}")]
    InvalidId(String),

    /// Attachment id is well-formed but resolves to no part.
    #[error("Attachment not found: {0}")]
    NotFound(String),

    /// Both download tiers failed to produce attachment content.
    #[error("Attachment extraction failed: {0}")]
    Extraction(String),

    /// Every text-extraction strategy failed or yielded empty text.
    #[error("Unextractable document: {0}")]
    Unextractable(String),

    /// File type has no text-extraction path.
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    /// Record store or field-extraction service failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// IMAP protocol operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] talentpipe_imap::Error),

    /// MIME decoding or recovery failed.
    #[error("MIME error: {0}")]
    Mime(#[from] talentpipe_mime::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
