//! Attachment id resolution.
//!
//! An id is resolved by re-walking the message's part tree rather
//! than by a cached path. Listing and download commonly happen in
//! separate sessions, and the walk is the same one the indexer used
//! to number attachments, so an id always lands on the part that
//! produced it.

use std::fmt;
use std::str::FromStr;

use talentpipe_imap::{BodyStructure, Uid};

use crate::error::{Error, Result};
use crate::ingest::indexer::{AttachmentDescriptor, attachment_descriptors};

/// Parsed composite attachment id, `att-<uid>-<ordinal>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentId {
    /// UID of the containing message.
    pub uid: Uid,
    /// 1-based position among the message's attachment parts.
    pub ordinal: u32,
}

impl FromStr for AttachmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidId(s.to_string());

        let rest = s.strip_prefix("att-").ok_or_else(invalid)?;
        let (uid_text, ordinal_text) = rest.split_once('-').ok_or_else(invalid)?;

        let uid = uid_text
            .parse::<u32>()
            .ok()
            .and_then(Uid::new)
            .ok_or_else(invalid)?;
        let ordinal = ordinal_text
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(invalid)?;

        Ok(Self { uid, ordinal })
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "att-{}-{}", self.uid, self.ordinal)
    }
}

/// Resolves an id's ordinal to the descriptor of the matching part.
///
/// Runs the same numbering walk the indexer runs, so the returned
/// descriptor (part path included) is the one a listing would have
/// produced for this id.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the tree has fewer attachment
/// parts than the ordinal, or when the ordinal is zero (ordinals are
/// 1-based).
pub fn locate(tree: &BodyStructure, id: &AttachmentId) -> Result<AttachmentDescriptor> {
    id.ordinal
        .checked_sub(1)
        .and_then(|index| {
            attachment_descriptors(id.uid, tree)
                .into_iter()
                .nth(usize::try_from(index).unwrap_or(usize::MAX))
        })
        .ok_or_else(|| Error::NotFound(id.to_string()))
}
