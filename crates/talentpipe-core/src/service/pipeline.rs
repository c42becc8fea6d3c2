//! The ingestion pipeline: list, download, and batch import.
//!
//! Every operation opens its own session. The protocol stream admits
//! one outstanding command, so sessions are never pooled or shared;
//! concurrent callers get concurrent sessions. Within a batch,
//! messages are processed one at a time over the single session and
//! the session is closed only after every message has settled, which
//! is the batch's join point.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};

use talentpipe_imap::{
    FetchAttribute, FetchItems, ImapStream, MailSession, SessionConfig, Uid, UidSet,
};
use talentpipe_mime::decode_base64;

use crate::candidate::{FieldExtractor, HeaderIdentity, RecordStore, assemble, import};
use crate::document::extract_text;
use crate::error::{Error, Result};
use crate::ingest::{
    AttachmentDescriptor, AttachmentId, ListFilters, MessageSummary, RawAttachment,
    download_part, list_messages, locate,
};

/// Mailbox connection input as supplied by a caller.
///
/// `gmail` and `outlook` use fixed presets and ignore server/port;
/// `other` requires both.
#[derive(Debug, Clone)]
pub struct MailboxSettings {
    /// Provider name: `gmail`, `outlook`, or `other`.
    pub provider: String,
    /// Server host, required for `other`.
    pub server: Option<String>,
    /// Server port, required for `other`.
    pub port: Option<u16>,
    /// Login username.
    pub username: String,
    /// Login password or app password.
    pub password: String,
}

impl MailboxSettings {
    /// Resolves provider presets into a connectable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] for an unknown provider or a
    /// custom provider without server and port.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let (host, port) = match self.provider.to_lowercase().as_str() {
            "gmail" => ("imap.gmail.com".to_string(), 993),
            "outlook" => ("outlook.office365.com".to_string(), 993),
            "other" => {
                let host = self
                    .server
                    .clone()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        Error::Connection("provider 'other' requires a server".to_string())
                    })?;
                let port = self.port.ok_or_else(|| {
                    Error::Connection("provider 'other' requires a port".to_string())
                })?;
                (host, port)
            }
            unknown => {
                return Err(Error::Connection(format!("unknown provider: {unknown}")));
            }
        };
        Ok(SessionConfig::new(host, port, &self.username, &self.password))
    }
}

/// One failed message inside an otherwise continuing batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// UID of the failed message.
    pub uid: u32,
    /// What went wrong.
    pub reason: String,
}

/// Successfully imported candidate, for the batch result.
#[derive(Debug, Clone)]
pub struct ImportedCandidate {
    /// Dedup email of the stored record.
    pub email: String,
    /// Store-assigned record id.
    pub id: i64,
    /// True when this import created the record.
    pub created: bool,
}

/// Partial-result summary of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Messages the batch attempted.
    pub processed: usize,
    /// Candidates stored, in processing order.
    pub imported: Vec<ImportedCandidate>,
    /// Per-message failures; the batch continued past each.
    pub failures: Vec<BatchFailure>,
}

/// Candidate ingestion over one mailbox.
///
/// Collaborators are injected at construction so tests can
/// substitute fakes; nothing here is ambient or global.
pub struct IngestService {
    config: SessionConfig,
    mailbox: String,
    source: String,
    store: Arc<dyn RecordStore>,
    field_extractor: Option<Arc<dyn FieldExtractor>>,
}

impl IngestService {
    /// Creates a service over the given mailbox and record store.
    #[must_use]
    pub fn new(config: SessionConfig, store: Arc<dyn RecordStore>) -> Self {
        let source = format!("mailbox:{}", config.username);
        Self {
            config,
            mailbox: "INBOX".to_string(),
            source,
            store,
            field_extractor: None,
        }
    }

    /// Sets the mailbox to operate on. Defaults to INBOX.
    #[must_use]
    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Attaches a structured-field extraction service.
    #[must_use]
    pub fn with_field_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.field_extractor = Some(extractor);
        self
    }

    /// Lists messages matching the filters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the session cannot be
    /// opened and [`Error::Search`] when the server rejects the
    /// search. No partial listing is returned on failure.
    pub async fn list(&self, filters: &ListFilters) -> Result<Vec<MessageSummary>> {
        let mut session = self.open().await?;
        let result = list_messages(&mut session, filters).await;
        Self::shutdown(&mut session).await;
        result
    }

    /// Downloads one attachment by its composite id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for a malformed id,
    /// [`Error::NotFound`] when it resolves to no part, and
    /// [`Error::Extraction`] when both download tiers fail.
    pub async fn download(&self, attachment_id: &str) -> Result<RawAttachment> {
        let id: AttachmentId = attachment_id.parse()?;
        let mut session = self.open().await?;
        let result = fetch_and_download(&mut session, id).await;
        Self::shutdown(&mut session).await;
        result
    }

    /// Processes up to `limit` matching messages into candidate
    /// records. Per-message failures are recorded and skipped; the
    /// batch always returns what it managed to do.
    ///
    /// # Errors
    ///
    /// Returns an error only when the session cannot be opened or
    /// the initial listing fails.
    pub async fn process_batch(
        &self,
        filters: &ListFilters,
        limit: Option<usize>,
    ) -> Result<BatchOutcome> {
        let mut session = self.open().await?;
        let mut summaries = match list_messages(&mut session, filters).await {
            Ok(summaries) => summaries,
            Err(e) => {
                Self::shutdown(&mut session).await;
                return Err(e);
            }
        };
        if let Some(limit) = limit {
            summaries.truncate(limit);
        }

        let staging = tempfile::tempdir()?;
        let mut outcome = BatchOutcome::default();

        for summary in &summaries {
            outcome.processed += 1;
            match self
                .process_message(&mut session, summary, staging.path())
                .await
            {
                Ok(imported) => outcome.imported.push(imported),
                Err(e) => {
                    tracing::warn!(uid = %summary.uid, error = %e, "message failed, batch continues");
                    outcome.failures.push(BatchFailure {
                        uid: summary.uid.get(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Self::shutdown(&mut session).await;
        if let Err(e) = staging.close() {
            tracing::warn!(error = %e, "staging directory cleanup failed");
        }

        tracing::info!(
            processed = outcome.processed,
            imported = outcome.imported.len(),
            failed = outcome.failures.len(),
            "batch complete"
        );
        Ok(outcome)
    }

    /// Turns one message into a stored candidate record.
    ///
    /// Attachment or text-extraction trouble degrades the record to
    /// header-only identity instead of failing the message.
    async fn process_message<S>(
        &self,
        session: &mut MailSession<S>,
        summary: &MessageSummary,
        staging: &Path,
    ) -> Result<ImportedCandidate>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let identity = HeaderIdentity {
            name: summary.sender_name.clone(),
            email: summary.sender_email.clone(),
            subject: summary.subject.clone(),
        };
        let now = Utc::now();

        let chosen = summary
            .attachments
            .iter()
            .find(|a| a.resume_likely)
            .or_else(|| summary.attachments.first());

        let mut resume_filename = None;
        let mut resume_text = None;
        if let Some(descriptor) = chosen {
            match stage_and_extract(session, summary.uid, descriptor, staging).await {
                Ok(text) => {
                    resume_filename = Some(descriptor.filename.clone());
                    resume_text = Some(text);
                }
                Err(e) => {
                    tracing::warn!(
                        id = %descriptor.id,
                        error = %e,
                        "attachment unusable, degrading to header-only import"
                    );
                }
            }
        }

        let fields = match (&self.field_extractor, &resume_text) {
            (Some(extractor), Some(text)) => match extractor.extract_fields(text).await {
                Ok(fields) => Some(fields),
                Err(e) => {
                    tracing::warn!(error = %e, "field extraction failed, degrading");
                    None
                }
            },
            _ => None,
        };

        let record = assemble(&identity, resume_filename.as_deref(), fields, &self.source, now);
        let email = record.email.clone();
        let outcome = import(self.store.as_ref(), record, now).await?;
        Ok(ImportedCandidate {
            email,
            id: outcome.id,
            created: outcome.created,
        })
    }

    async fn open(&self) -> Result<MailSession<ImapStream>> {
        let mut session = MailSession::open(&self.config)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        session
            .select_mailbox(&self.mailbox, true)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(session)
    }

    async fn shutdown<S>(session: &mut MailSession<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = session.logout().await {
            tracing::debug!(error = %e, "logout failed, closing anyway");
        }
    }
}

/// Fetches the part tree for the id's message, resolves the id, and
/// downloads the part.
async fn fetch_and_download<S>(
    session: &mut MailSession<S>,
    id: AttachmentId,
) -> Result<RawAttachment>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let items = FetchItems(vec![FetchAttribute::Uid, FetchAttribute::BodyStructure]);
    let responses = session.uid_fetch(UidSet::single(id.uid), items).await?;

    let tree = responses
        .iter()
        .filter(|r| r.uid() == Some(id.uid))
        .find_map(talentpipe_imap::FetchResponse::body_structure)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let descriptor = locate(tree, &id)?;
    download_part(session, id.uid, &descriptor).await
}

/// Downloads one attachment, stages its bytes to disk, and extracts
/// text from the staged document.
async fn stage_and_extract<S>(
    session: &mut MailSession<S>,
    uid: Uid,
    descriptor: &AttachmentDescriptor,
    staging: &Path,
) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw = download_part(session, uid, descriptor).await?;
    let bytes = decode_base64(&raw.content).map_err(Error::Mime)?;

    // Composite ids are filesystem-safe and unique per batch.
    let staged = staging.join(&descriptor.id);
    tokio::fs::write(&staged, &bytes).await?;

    let extension = descriptor
        .filename
        .rsplit_once('.')
        .map_or("", |(_, ext)| ext);
    let document = extract_text(&bytes, extension)?;
    tracing::debug!(
        staged = %staged.display(),
        strategy = document.strategy,
        "document extracted"
    );
    Ok(document.text)
}
