//! Two-tier attachment download.
//!
//! Tier one fetches just the identified part body by its path. Some
//! servers answer those fetches with NIL or truncated content for
//! attachment parts, so tier two fetches the whole raw message and
//! recovers the part by boundary scanning. Either way the result is
//! normalized to clean base64 before it is returned.

use tokio::io::{AsyncRead, AsyncWrite};

use talentpipe_imap::{FetchAttribute, FetchItems, MailSession, Uid, UidSet};
use talentpipe_mime::{
    decode_base64, normalize_to_base64, recover_attachment, ScanRules, ScanTarget,
    TransferEncoding,
};

use crate::error::{Error, Result};
use crate::ingest::indexer::AttachmentDescriptor;

/// A downloaded attachment with its content normalized to base64.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    /// Filename for the caller, declared or synthetic.
    pub filename: String,
    /// Declared `type/subtype` in lowercase.
    pub content_type: String,
    /// Attachment content as clean base64 text.
    pub content: String,
    /// Encoding of `content`. Always `base64` after normalization.
    pub encoding: String,
    /// Decoded size in bytes.
    pub size: usize,
}

/// Downloads one part's content, trying the structured fetch first
/// and falling back to a raw boundary scan.
///
/// # Errors
///
/// Propagates transport failures, and returns [`Error::Extraction`]
/// with both tiers' reasons when neither yields content.
pub async fn download_part<S>(
    session: &mut MailSession<S>,
    uid: Uid,
    descriptor: &AttachmentDescriptor,
) -> Result<RawAttachment>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut failures = Vec::new();

    match structured_fetch(session, uid, descriptor).await? {
        Ok(content) => {
            tracing::info!(
                %uid,
                path = %descriptor.part_path,
                tier = 1,
                "attachment downloaded via structured fetch"
            );
            return finish(descriptor, content);
        }
        Err(reason) => {
            tracing::debug!(%uid, reason, "structured fetch yielded no content");
            failures.push(format!("structured fetch: {reason}"));
        }
    }

    match raw_scan_fetch(session, uid, descriptor).await? {
        Ok(content) => {
            tracing::info!(
                %uid,
                path = %descriptor.part_path,
                tier = 2,
                "attachment downloaded via raw scan"
            );
            return finish(descriptor, content);
        }
        Err(reason) => failures.push(format!("raw scan: {reason}")),
    }

    Err(Error::Extraction(format!(
        "no tier produced content for {}: {}",
        descriptor.id,
        failures.join("; ")
    )))
}

/// Tier one. The outer `Result` is a transport failure; the inner
/// one distinguishes usable content from a reason to fall back.
async fn structured_fetch<S>(
    session: &mut MailSession<S>,
    uid: Uid,
    descriptor: &AttachmentDescriptor,
) -> Result<std::result::Result<String, String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let items = FetchItems(vec![
        FetchAttribute::Uid,
        FetchAttribute::Body {
            section: Some(descriptor.part_path.to_string()),
            peek: true,
        },
    ]);
    let responses = session.uid_fetch(UidSet::single(uid), items).await?;

    let body = responses
        .iter()
        .filter(|r| r.uid() == Some(uid))
        .find_map(talentpipe_imap::FetchResponse::body_bytes);

    let Some(bytes) = body else {
        return Ok(Err("server returned no body for the section".to_string()));
    };
    if bytes.is_empty() {
        return Ok(Err("server returned an empty body".to_string()));
    }

    let encoding = TransferEncoding::parse(&descriptor.encoding);
    match normalize_to_base64(bytes, encoding) {
        Ok(content) if !content.is_empty() => Ok(Ok(content)),
        Ok(_) => Ok(Err("normalized content was empty".to_string())),
        Err(e) => Ok(Err(format!("normalization failed: {e}"))),
    }
}

/// Tier two: whole-message fetch plus boundary-scan recovery.
async fn raw_scan_fetch<S>(
    session: &mut MailSession<S>,
    uid: Uid,
    descriptor: &AttachmentDescriptor,
) -> Result<std::result::Result<String, String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let items = FetchItems(vec![
        FetchAttribute::Uid,
        FetchAttribute::Body {
            section: None,
            peek: true,
        },
    ]);
    let responses = session.uid_fetch(UidSet::single(uid), items).await?;

    let Some(bytes) = responses
        .iter()
        .filter(|r| r.uid() == Some(uid))
        .find_map(talentpipe_imap::FetchResponse::body_bytes)
    else {
        return Ok(Err("server returned no raw message".to_string()));
    };

    let raw = String::from_utf8_lossy(bytes);
    let target = ScanTarget {
        filename: Some(descriptor.filename.clone()),
        mime_type: descriptor.mime_type.clone(),
    };
    let segment = match recover_attachment(&raw, &target, &ScanRules::default()) {
        Ok(segment) => segment,
        Err(e) => return Ok(Err(e.to_string())),
    };
    tracing::debug!(matched_by = ?segment.matched_by, "raw scan recovered a segment");

    match normalize_to_base64(segment.body.as_bytes(), segment.encoding) {
        Ok(content) if !content.is_empty() => Ok(Ok(content)),
        Ok(_) => Ok(Err("recovered segment normalized to empty".to_string())),
        Err(e) => Ok(Err(format!("normalization failed: {e}"))),
    }
}

fn finish(descriptor: &AttachmentDescriptor, content: String) -> Result<RawAttachment> {
    let size = decode_base64(&content).map_err(Error::Mime)?.len();
    Ok(RawAttachment {
        filename: descriptor.filename.clone(),
        content_type: descriptor.mime_type.clone(),
        content,
        encoding: "base64".to_string(),
        size,
    })
}
