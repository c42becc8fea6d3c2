//! Core protocol types: identifiers, envelopes, and body structure.

use std::num::NonZeroU32;

/// Message sequence number.
///
/// Ephemeral: assigned starting from 1 within one session's view of
/// the mailbox and renumbered on expunge. Never used for addressing
/// across calls; see [`Uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a new sequence number. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message, stable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// Creates a new UID. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of UIDs for UID SEARCH / UID FETCH commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// A single UID.
    Single(Uid),
    /// An inclusive range.
    Range(Uid, Uid),
    /// From a UID to the highest UID in the mailbox.
    RangeFrom(Uid),
    /// Every message.
    All,
    /// Multiple specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a set containing a single UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "1:*"),
            Self::Set(items) => {
                let parts: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Positional address of a part inside a multipart message.
///
/// Dot-separated 1-based indices, e.g. `"3.2"` is the second part
/// inside the third top-level part. This is the section specifier
/// used in `BODY.PEEK[path]` fetches and the only stable re-fetch key
/// for a part across separate sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartPath(Vec<u32>);

impl PartPath {
    /// Creates a path from 1-based indices.
    ///
    /// Returns `None` when empty or any index is 0.
    #[must_use]
    pub fn new(indices: Vec<u32>) -> Option<Self> {
        if indices.is_empty() || indices.contains(&0) {
            return None;
        }
        Some(Self(indices))
    }

    /// Path addressing the sole part of a non-multipart message.
    #[must_use]
    pub fn root() -> Self {
        Self(vec![1])
    }

    /// Returns the index components.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// Returns a child path with one more index level.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl std::fmt::Display for PartPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<_> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl std::str::FromStr for PartPath {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split('.')
            .map(|p| p.parse::<u32>().ok().filter(|&n| n > 0))
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(|| crate::Error::Protocol(format!("invalid part path: {s:?}")))?;
        Self::new(indices).ok_or_else(|| crate::Error::Protocol(format!("empty part path: {s:?}")))
    }
}

/// An address from an ENVELOPE response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name, if any.
    pub name: Option<String>,
    /// Local part of the address.
    pub mailbox: Option<String>,
    /// Domain of the address.
    pub host: Option<String>,
}

impl Address {
    /// Returns `local@domain` when both halves are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Message envelope from an ENVELOPE fetch response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Date header as sent by the server.
    pub date: Option<String>,
    /// Subject header, still RFC 2047 encoded if it was on the wire.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Parsed BODYSTRUCTURE: the shape of a message's MIME part tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// A leaf content part.
    Part(LeafPart),
    /// A multipart container.
    Multipart {
        /// Child parts, in wire order.
        parts: Vec<BodyStructure>,
        /// Multipart subtype (MIXED, ALTERNATIVE, RELATED, ...).
        subtype: String,
    },
}

/// A leaf part of the MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafPart {
    /// Media type, uppercased (TEXT, APPLICATION, IMAGE, ...).
    pub media_type: String,
    /// Media subtype, uppercased (PLAIN, PDF, OCTET-STREAM, ...).
    pub media_subtype: String,
    /// Body parameters (name, charset, ...), keys lowercased.
    pub params: Vec<(String, String)>,
    /// Declared Content-Transfer-Encoding.
    pub encoding: String,
    /// Declared size in octets.
    pub size: u32,
    /// Content-Disposition type, lowercased (attachment, inline).
    pub disposition: Option<String>,
    /// Disposition parameters (filename, ...), keys lowercased.
    pub disposition_params: Vec<(String, String)>,
}

impl LeafPart {
    /// The declared filename, from the disposition `filename`
    /// parameter or the body `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.disposition_params
            .iter()
            .find(|(k, _)| k == "filename")
            .or_else(|| self.params.iter().find(|(k, _)| k == "name"))
            .map(|(_, v)| v.as_str())
    }

    /// True for parts that carry attached content: an explicit
    /// attachment/inline disposition, or any non-text leaf that
    /// declares a filename.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        match self.disposition.as_deref() {
            Some("attachment") => true,
            Some("inline") => self.filename().is_some(),
            _ => self.filename().is_some() && self.media_type != "TEXT",
        }
    }

    /// `type/subtype` in lowercase.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!(
            "{}/{}",
            self.media_type.to_lowercase(),
            self.media_subtype.to_lowercase()
        )
    }
}

impl BodyStructure {
    /// Walks the tree depth-first and returns every attachment leaf
    /// with its positional path.
    ///
    /// Paths are 1-based at every nesting level. The walk order here
    /// defines attachment ordinals: the indexer numbers attachments
    /// by this order and the locator resolves ordinals by re-running
    /// the same walk, so the two can never disagree.
    #[must_use]
    pub fn attachment_parts(&self) -> Vec<(PartPath, &LeafPart)> {
        let mut found = Vec::new();
        match self {
            Self::Part(leaf) => {
                if leaf.is_attachment() {
                    found.push((PartPath::root(), leaf));
                }
            }
            Self::Multipart { parts, .. } => {
                for (i, child) in parts.iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation)]
                    let index = (i + 1) as u32;
                    Self::collect_attachments(child, &PartPath(vec![index]), &mut found);
                }
            }
        }
        found
    }

    fn collect_attachments<'a>(
        node: &'a Self,
        path: &PartPath,
        found: &mut Vec<(PartPath, &'a LeafPart)>,
    ) {
        match node {
            Self::Part(leaf) => {
                if leaf.is_attachment() {
                    found.push((path.clone(), leaf));
                }
            }
            Self::Multipart { parts, .. } => {
                for (i, child) in parts.iter().enumerate() {
                    #[allow(clippy::cast_possible_truncation)]
                    let index = (i + 1) as u32;
                    Self::collect_attachments(child, &path.child(index), found);
                }
            }
        }
    }

    /// True if any leaf in the tree is an attachment.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachment_parts().is_empty()
    }
}

/// Data items parsed out of one FETCH response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchData {
    /// UID item.
    Uid(Uid),
    /// ENVELOPE item.
    Envelope(Box<Envelope>),
    /// BODYSTRUCTURE item.
    BodyStructure(BodyStructure),
    /// INTERNALDATE item.
    InternalDate(String),
    /// RFC822.SIZE item.
    Rfc822Size(u32),
    /// BODY[section] item with its literal content.
    Body {
        /// Section specifier as sent by the server (e.g. `1.2`).
        section: Option<String>,
        /// Literal bytes, or `None` for NIL.
        data: Option<Vec<u8>>,
    },
}

/// One message's fetch response: sequence-number prefix plus items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Sequence number from the untagged response prefix.
    pub seq: SeqNum,
    /// Parsed data items.
    pub items: Vec<FetchData>,
}

impl FetchResponse {
    /// Returns the UID item, if the server included one.
    #[must_use]
    pub fn uid(&self) -> Option<Uid> {
        self.items.iter().find_map(|item| match item {
            FetchData::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    /// Returns the envelope, if fetched.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        self.items.iter().find_map(|item| match item {
            FetchData::Envelope(env) => Some(env.as_ref()),
            _ => None,
        })
    }

    /// Returns the body structure, if fetched.
    #[must_use]
    pub fn body_structure(&self) -> Option<&BodyStructure> {
        self.items.iter().find_map(|item| match item {
            FetchData::BodyStructure(bs) => Some(bs),
            _ => None,
        })
    }

    /// Returns the first BODY[..] literal, if fetched.
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.items.iter().find_map(|item| match item {
            FetchData::Body {
                data: Some(bytes), ..
            } => Some(bytes.as_slice()),
            _ => None,
        })
    }

    /// Returns the internal date string, if fetched.
    #[must_use]
    pub fn internal_date(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            FetchData::InternalDate(d) => Some(d.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leaf(media: &str, sub: &str, disposition: Option<&str>, filename: Option<&str>) -> LeafPart {
        LeafPart {
            media_type: media.to_string(),
            media_subtype: sub.to_string(),
            disposition: disposition.map(str::to_string),
            disposition_params: filename
                .map(|f| vec![("filename".to_string(), f.to_string())])
                .unwrap_or_default(),
            ..LeafPart::default()
        }
    }

    #[test]
    fn uid_zero_rejected() {
        assert!(Uid::new(0).is_none());
        assert_eq!(Uid::new(42).unwrap().get(), 42);
    }

    #[test]
    fn part_path_display_and_parse() {
        let path = PartPath::new(vec![3, 2]).unwrap();
        assert_eq!(path.to_string(), "3.2");
        assert_eq!("3.2".parse::<PartPath>().unwrap(), path);
        assert!("3.0".parse::<PartPath>().is_err());
        assert!("".parse::<PartPath>().is_err());
    }

    #[test]
    fn uid_set_display() {
        let a = Uid::new(5).unwrap();
        let b = Uid::new(9).unwrap();
        assert_eq!(UidSet::Single(a).to_string(), "5");
        assert_eq!(UidSet::Range(a, b).to_string(), "5:9");
        assert_eq!(UidSet::All.to_string(), "1:*");
        assert_eq!(
            UidSet::Set(vec![UidSet::Single(a), UidSet::Single(b)]).to_string(),
            "5,9"
        );
    }

    #[test]
    fn attachment_walk_is_depth_first_one_based() {
        let tree = BodyStructure::Multipart {
            parts: vec![
                BodyStructure::Part(leaf("TEXT", "PLAIN", None, None)),
                BodyStructure::Multipart {
                    parts: vec![
                        BodyStructure::Part(leaf("TEXT", "HTML", None, None)),
                        BodyStructure::Part(leaf(
                            "APPLICATION",
                            "PDF",
                            Some("attachment"),
                            Some("resume.pdf"),
                        )),
                    ],
                    subtype: "ALTERNATIVE".to_string(),
                },
                BodyStructure::Part(leaf(
                    "APPLICATION",
                    "MSWORD",
                    Some("attachment"),
                    Some("cv.doc"),
                )),
            ],
            subtype: "MIXED".to_string(),
        };

        let attachments = tree.attachment_parts();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].0.to_string(), "2.2");
        assert_eq!(attachments[0].1.filename(), Some("resume.pdf"));
        assert_eq!(attachments[1].0.to_string(), "3");
        assert_eq!(attachments[1].1.filename(), Some("cv.doc"));
    }

    #[test]
    fn inline_with_filename_counts_as_attachment() {
        let part = leaf("IMAGE", "PNG", Some("inline"), Some("scan.png"));
        assert!(part.is_attachment());

        let body = leaf("TEXT", "PLAIN", Some("inline"), None);
        assert!(!body.is_attachment());
    }

    #[test]
    fn filename_falls_back_to_name_param() {
        let mut part = leaf("APPLICATION", "PDF", Some("attachment"), None);
        part.params.push(("name".to_string(), "cv.pdf".to_string()));
        assert_eq!(part.filename(), Some("cv.pdf"));
    }

    #[test]
    fn single_part_message_root_path() {
        let tree = BodyStructure::Part(leaf(
            "APPLICATION",
            "PDF",
            Some("attachment"),
            Some("resume.pdf"),
        ));
        let attachments = tree.attachment_parts();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].0.to_string(), "1");
    }
}
