//! IMAP command building and serialization.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::UidSet;

/// Generates monotonically increasing command tags: A0001, A0002, ...
#[derive(Debug)]
pub struct TagGenerator {
    prefix: &'static str,
    counter: AtomicU32,
}

impl TagGenerator {
    /// Creates a generator with the default `A` prefix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prefix: "A",
            counter: AtomicU32::new(0),
        }
    }

    /// Returns the next tag.
    pub fn next_tag(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{n:04}", self.prefix)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// Every message in the mailbox.
    All,
    /// Internal date on or after the given day (`DD-Mon-YYYY`).
    Since(String),
    /// Internal date before the given day.
    Before(String),
    /// Internal date on the given day.
    On(String),
    /// Substring match against the Subject header.
    Subject(String),
    /// Substring match against the From header.
    From(String),
    /// Substring match anywhere in the message.
    Text(String),
    /// Restrict to a UID set.
    UidSet(UidSet),
    /// All criteria must match.
    And(Vec<SearchCriteria>),
    /// Either branch matches.
    Or(Box<SearchCriteria>, Box<SearchCriteria>),
    /// Inverts a criterion.
    Not(Box<SearchCriteria>),
}

/// A single FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// UID item.
    Uid,
    /// ENVELOPE item.
    Envelope,
    /// BODYSTRUCTURE item.
    BodyStructure,
    /// INTERNALDATE item.
    InternalDate,
    /// RFC822.SIZE item.
    Rfc822Size,
    /// BODY[section] or BODY.PEEK[section].
    Body {
        /// Section specifier; `None` fetches the whole message.
        section: Option<String>,
        /// Use BODY.PEEK to leave the \Seen flag untouched.
        peek: bool,
    },
}

/// The item list of a FETCH command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchItems(pub Vec<FetchAttribute>);

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: String,
    },
    /// UID SEARCH command.
    UidSearch {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID FETCH command.
    UidFetch {
        /// UIDs to fetch.
        set: UidSet,
        /// Items to fetch.
        items: FetchItems,
    },
    /// CLOSE command.
    Close,
}

impl Command {
    /// Serializes the command to wire bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Close => buf.extend_from_slice(b"CLOSE"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox);
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox);
            }
            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                write_search_criteria(&mut buf, criteria);
            }
            Self::UidFetch { set, items } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(set.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Writes an astring (atom or quoted string).
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Since(date) => {
            buf.extend_from_slice(b"SINCE ");
            buf.extend_from_slice(date.as_bytes());
        }
        SearchCriteria::Before(date) => {
            buf.extend_from_slice(b"BEFORE ");
            buf.extend_from_slice(date.as_bytes());
        }
        SearchCriteria::On(date) => {
            buf.extend_from_slice(b"ON ");
            buf.extend_from_slice(date.as_bytes());
        }
        SearchCriteria::Subject(s) => {
            buf.extend_from_slice(b"SUBJECT ");
            write_astring(buf, s);
        }
        SearchCriteria::From(s) => {
            buf.extend_from_slice(b"FROM ");
            write_astring(buf, s);
        }
        SearchCriteria::Text(s) => {
            buf.extend_from_slice(b"TEXT ");
            write_astring(buf, s);
        }
        SearchCriteria::UidSet(set) => {
            buf.extend_from_slice(b"UID ");
            buf.extend_from_slice(set.to_string().as_bytes());
        }
        SearchCriteria::And(criteria) => {
            for (i, c) in criteria.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_search_criteria(buf, c);
            }
        }
        SearchCriteria::Or(a, b) => {
            buf.extend_from_slice(b"OR ");
            write_search_criteria(buf, a);
            buf.push(b' ');
            write_search_criteria(buf, b);
        }
        SearchCriteria::Not(c) => {
            buf.extend_from_slice(b"NOT ");
            write_search_criteria(buf, c);
        }
    }
}

fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    if items.0.len() == 1 {
        write_fetch_attribute(buf, &items.0[0]);
    } else {
        buf.push(b'(');
        for (i, attr) in items.0.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }
            write_fetch_attribute(buf, attr);
        }
        buf.push(b')');
    }
}

fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
        FetchAttribute::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::Body { section, peek } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK[");
            } else {
                buf.extend_from_slice(b"BODY[");
            }
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Uid;

    #[test]
    fn tags_are_sequential() {
        let tags = TagGenerator::new();
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.next_tag(), "A0002");
    }

    #[test]
    fn login_quotes_password() {
        let cmd = Command::Login {
            username: "hr@example.com".to_string(),
            password: "p w\"d".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0001"),
            b"A0001 LOGIN hr@example.com \"p w\\\"d\"\r\n"
        );
    }

    #[test]
    fn select_quotes_mailbox_with_space() {
        let cmd = Command::Select {
            mailbox: "Job Applications".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0002"),
            b"A0002 SELECT \"Job Applications\"\r\n"
        );
    }

    #[test]
    fn uid_search_since() {
        let cmd = Command::UidSearch {
            criteria: SearchCriteria::Since("29-Aug-2026".to_string()),
        };
        assert_eq!(
            cmd.serialize("A0003"),
            b"A0003 UID SEARCH SINCE 29-Aug-2026\r\n"
        );
    }

    #[test]
    fn uid_search_and_combines_with_spaces() {
        let cmd = Command::UidSearch {
            criteria: SearchCriteria::And(vec![
                SearchCriteria::Since("01-Jan-2026".to_string()),
                SearchCriteria::Before("02-Jan-2026".to_string()),
            ]),
        };
        assert_eq!(
            cmd.serialize("A0004"),
            b"A0004 UID SEARCH SINCE 01-Jan-2026 BEFORE 02-Jan-2026\r\n"
        );
    }

    #[test]
    fn uid_fetch_body_peek_section() {
        let cmd = Command::UidFetch {
            set: UidSet::Single(Uid::new(42).unwrap()),
            items: FetchItems(vec![
                FetchAttribute::Uid,
                FetchAttribute::Body {
                    section: Some("2.2".to_string()),
                    peek: true,
                },
            ]),
        };
        assert_eq!(
            cmd.serialize("A0005"),
            b"A0005 UID FETCH 42 (UID BODY.PEEK[2.2])\r\n"
        );
    }

    #[test]
    fn uid_fetch_single_item_unparenthesized() {
        let cmd = Command::UidFetch {
            set: UidSet::All,
            items: FetchItems(vec![FetchAttribute::BodyStructure]),
        };
        assert_eq!(
            cmd.serialize("A0006"),
            b"A0006 UID FETCH 1:* BODYSTRUCTURE\r\n"
        );
    }
}
