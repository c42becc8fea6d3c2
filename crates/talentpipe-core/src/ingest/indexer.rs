//! Message listing and attachment indexing.
//!
//! Issues a server-side date search, fetches headers and the
//! structural envelope for each hit, and evaluates the narrower
//! filters client-side. Attachment payloads are never transferred
//! during listing.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use tokio::io::{AsyncRead, AsyncWrite};

use talentpipe_imap::{
    BodyStructure, FetchAttribute, FetchItems, MailSession, PartPath, SearchCriteria, Uid, UidSet,
};
use talentpipe_mime::decode_header_text;

use crate::error::{Error, Result};

/// Extensions that mark an attachment as a likely resume.
const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "odt"];

/// Subject keywords that mark a message as hiring-related.
const JOB_KEYWORDS: &[&str] = &[
    "resume",
    "cv",
    "cover letter",
    "application",
    "applicant",
    "candidate",
    "position",
    "hiring",
    "interview",
    "opening",
    "vacancy",
    "recruit",
];

/// Date window applied server-side before any client-side filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    /// No date restriction.
    #[default]
    None,
    /// Messages received today.
    Today,
    /// Messages received in the last seven days.
    Week,
    /// Messages received in the last thirty days.
    Month,
}

impl DateFilter {
    /// Earliest date the window admits, or `None` for no restriction.
    #[must_use]
    pub fn since(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::None => None,
            Self::Today => Some(today),
            Self::Week => Some(today - Duration::days(7)),
            Self::Month => Some(today - Duration::days(30)),
        }
    }
}

/// Filter criteria for a listing call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilters {
    /// Date window, translated to a server-side SINCE predicate.
    pub date_filter: DateFilter,
    /// Keep only messages whose subject looks hiring-related.
    pub job_related: bool,
    /// Keep only messages with at least one attachment part.
    pub with_attachments: bool,
}

/// One attachment found in a message's part tree.
///
/// The composite `id` is the only handle a caller keeps between the
/// list and download calls. It is built from the message UID, which
/// is stable across sessions; sequence numbers are not and are never
/// used in ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Composite id, `att-<uid>-<ordinal>`.
    pub id: String,
    /// Positional path of the part inside the MIME tree.
    pub part_path: PartPath,
    /// Declared filename, or `unknown-<n>` when the part had none.
    pub filename: String,
    /// Declared `type/subtype` in lowercase.
    pub mime_type: String,
    /// Declared size in octets.
    pub size: u32,
    /// Declared transfer encoding.
    pub encoding: String,
    /// Filename extension is on the resume allow-list.
    pub resume_likely: bool,
}

/// Summary of one message, produced per listing call.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    /// Message UID.
    pub uid: Uid,
    /// Sender display name, when the From header carried one.
    pub sender_name: Option<String>,
    /// Sender address.
    pub sender_email: Option<String>,
    /// Decoded subject.
    pub subject: String,
    /// Received timestamp as reported by the server.
    pub date: String,
    /// At least one part in the tree is an attachment.
    pub has_attachments: bool,
    /// Attachments in part-tree walk order.
    pub attachments: Vec<AttachmentDescriptor>,
}

/// Lists messages matching the filters, in server stream order.
///
/// # Errors
///
/// Returns [`Error::Search`] when the server rejects the search, and
/// propagates fetch failures.
pub async fn list_messages<S>(
    session: &mut MailSession<S>,
    filters: &ListFilters,
) -> Result<Vec<MessageSummary>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let criteria = match filters.date_filter.since(Utc::now().date_naive()) {
        Some(date) => SearchCriteria::Since(date.format("%d-%b-%Y").to_string()),
        None => SearchCriteria::All,
    };

    let uids = session
        .uid_search(criteria)
        .await
        .map_err(|e| Error::Search(e.to_string()))?;
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let set = UidSet::Set(uids.into_iter().map(UidSet::Single).collect());
    let items = FetchItems(vec![
        FetchAttribute::Uid,
        FetchAttribute::Envelope,
        FetchAttribute::BodyStructure,
        FetchAttribute::InternalDate,
    ]);
    let responses = session.uid_fetch(set, items).await?;

    let mut summaries = Vec::new();
    for response in &responses {
        let Some(uid) = response.uid() else {
            tracing::warn!(seq = response.seq.get(), "fetch response without UID, skipped");
            continue;
        };

        let envelope = response.envelope();
        let subject = envelope
            .and_then(|e| e.subject.as_deref())
            .map(decode_header_text)
            .unwrap_or_default();
        let sender = envelope.and_then(|e| e.from.first());

        let attachments = response
            .body_structure()
            .map(|tree| attachment_descriptors(uid, tree))
            .unwrap_or_default();

        let summary = MessageSummary {
            uid,
            sender_name: sender.and_then(|a| a.name.as_deref()).map(decode_header_text),
            sender_email: sender.and_then(talentpipe_imap::Address::email),
            subject,
            date: response.internal_date().unwrap_or_default().to_string(),
            has_attachments: !attachments.is_empty(),
            attachments,
        };

        if filters.job_related && !is_job_related(&summary.subject) {
            continue;
        }
        if filters.with_attachments && !summary.has_attachments {
            continue;
        }
        summaries.push(summary);
    }

    tracing::debug!(count = summaries.len(), "listing complete");
    Ok(summaries)
}

/// Builds descriptors for every attachment part in the tree.
///
/// Ordinals are 1-based positions in the depth-first walk. Parts
/// without a declared filename get a synthetic `unknown-<n>` name so
/// no attachment is dropped for lack of one.
#[must_use]
pub fn attachment_descriptors(uid: Uid, tree: &BodyStructure) -> Vec<AttachmentDescriptor> {
    tree.attachment_parts()
        .into_iter()
        .enumerate()
        .map(|(i, (path, leaf))| {
            let ordinal = i + 1;
            let filename = leaf
                .filename()
                .map_or_else(|| format!("unknown-{ordinal}"), str::to_string);
            AttachmentDescriptor {
                id: format!("att-{}-{ordinal}", uid.get()),
                part_path: path,
                resume_likely: is_resume_filename(&filename),
                filename,
                mime_type: leaf.mime_type(),
                size: leaf.size,
                encoding: leaf.encoding.clone(),
            }
        })
        .collect()
}

/// True when the subject contains a hiring keyword or a bracketed
/// job-code token like `[ENG-1042]`.
#[must_use]
pub fn is_job_related(subject: &str) -> bool {
    static JOB_CODE: OnceLock<Regex> = OnceLock::new();

    let lower = subject.to_lowercase();
    if JOB_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    JOB_CODE
        .get_or_init(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"(?i)\[[a-z]{2,10}-?\d{1,6}\]").unwrap()
        })
        .is_match(subject)
}

/// Extension check against the resume allow-list, case-insensitive.
#[must_use]
pub fn is_resume_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| RESUME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use talentpipe_imap::LeafPart;
    use tokio_test::io::Builder;

    fn attachment_leaf(filename: Option<&str>, media: &str, sub: &str) -> BodyStructure {
        BodyStructure::Part(LeafPart {
            media_type: media.to_string(),
            media_subtype: sub.to_string(),
            encoding: "BASE64".to_string(),
            size: 512,
            disposition: Some("attachment".to_string()),
            disposition_params: filename
                .map(|f| vec![("filename".to_string(), f.to_string())])
                .unwrap_or_default(),
            ..LeafPart::default()
        })
    }

    fn text_leaf() -> BodyStructure {
        BodyStructure::Part(LeafPart {
            media_type: "TEXT".to_string(),
            media_subtype: "PLAIN".to_string(),
            ..LeafPart::default()
        })
    }

    #[test]
    fn descriptors_number_attachments_in_walk_order() {
        let tree = BodyStructure::Multipart {
            parts: vec![
                text_leaf(),
                attachment_leaf(Some("resume.pdf"), "APPLICATION", "PDF"),
                attachment_leaf(Some("cover.docx"), "APPLICATION", "OCTET-STREAM"),
            ],
            subtype: "MIXED".to_string(),
        };
        let uid = Uid::new(42).unwrap();

        let descriptors = attachment_descriptors(uid, &tree);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].id, "att-42-1");
        assert_eq!(descriptors[0].part_path.to_string(), "2");
        assert_eq!(descriptors[0].filename, "resume.pdf");
        assert_eq!(descriptors[1].id, "att-42-2");
        assert_eq!(descriptors[1].part_path.to_string(), "3");
    }

    #[test]
    fn unnamed_attachment_gets_synthetic_name() {
        let tree = BodyStructure::Multipart {
            parts: vec![text_leaf(), attachment_leaf(None, "APPLICATION", "PDF")],
            subtype: "MIXED".to_string(),
        };
        let descriptors = attachment_descriptors(Uid::new(7).unwrap(), &tree);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].filename, "unknown-1");
        assert!(!descriptors[0].resume_likely);
    }

    #[test]
    fn resume_extension_is_case_insensitive() {
        assert!(is_resume_filename("resume.PDF"));
        assert!(is_resume_filename("cv.docx"));
        assert!(!is_resume_filename("photo.png"));
        assert!(!is_resume_filename("README"));
    }

    #[test]
    fn job_related_by_keyword_and_code() {
        assert!(is_job_related("My Resume for the role"));
        assert!(is_job_related("APPLICATION: backend developer"));
        assert!(is_job_related("Re: [ENG-1042] backend role"));
        assert!(!is_job_related("Lunch on Friday?"));
    }

    #[test]
    fn date_filter_windows() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        assert_eq!(DateFilter::None.since(today), None);
        assert_eq!(DateFilter::Today.since(today), Some(today));
        assert_eq!(
            DateFilter::Week.since(today),
            NaiveDate::from_ymd_opt(2026, 8, 22)
        );
        assert_eq!(
            DateFilter::Month.since(today),
            NaiveDate::from_ymd_opt(2026, 7, 30)
        );
    }

    #[test]
    fn since_date_wire_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        assert_eq!(date.format("%d-%b-%Y").to_string(), "03-Aug-2026");
    }

    #[tokio::test]
    async fn week_filter_sends_since_and_lists_only_the_hits() {
        // The window is enforced server-side: the search carries the
        // SINCE date and the listing contains exactly the UIDs the
        // server returned, so an out-of-window message never appears.
        let since = DateFilter::Week
            .since(Utc::now().date_naive())
            .unwrap()
            .format("%d-%b-%Y");
        let search = format!("A0003 UID SEARCH SINCE {since}\r\n");

        let fetch_reply = b"* 2 FETCH (UID 8 ENVELOPE (\"Fri, 29 Aug 2026 09:00:00 +0000\" \"Resume for backend role\" ((\"Dana Cruz\" NIL \"dana\" \"example.com\")) NIL NIL ((NIL NIL \"hr\" \"corp.example\")) NIL NIL NIL \"<m8@example.com>\") BODYSTRUCTURE ((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"UTF-8\") NIL NIL \"7BIT\" 120 4 NIL NIL NIL NIL)(\"APPLICATION\" \"PDF\" NIL NIL NIL \"BASE64\" 9000 NIL (\"ATTACHMENT\" (\"FILENAME\" \"resume.pdf\")) NIL NIL) \"MIXED\" (\"BOUNDARY\" \"xyz\") NIL NIL NIL) INTERNALDATE \"29-Aug-2026 09:00:12 +0000\")\r\nA0004 OK done\r\n";
        let stream = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr pw\r\n")
            .read(b"A0001 OK logged in\r\n")
            .write(b"A0002 EXAMINE INBOX\r\n")
            .read(b"* 3 EXISTS\r\nA0002 OK [READ-ONLY] done\r\n")
            .write(search.as_bytes())
            .read(b"* SEARCH 8\r\nA0003 OK done\r\n")
            .write(b"A0004 UID FETCH 8 (UID ENVELOPE BODYSTRUCTURE INTERNALDATE)\r\n")
            .read(fetch_reply)
            .build();

        let mut session = MailSession::handshake(stream, "hr", "pw").await.unwrap();
        session.select_mailbox("INBOX", true).await.unwrap();

        let filters = ListFilters {
            date_filter: DateFilter::Week,
            ..ListFilters::default()
        };
        let summaries = list_messages(&mut session, &filters).await.unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].uid.get(), 8);
        assert_eq!(summaries[0].sender_name.as_deref(), Some("Dana Cruz"));
        assert_eq!(summaries[0].sender_email.as_deref(), Some("dana@example.com"));
        assert_eq!(summaries[0].subject, "Resume for backend role");
        assert!(summaries[0].has_attachments);
        assert_eq!(summaries[0].attachments[0].id, "att-8-1");
    }
}
