//! # talentpipe-imap
//!
//! A focused IMAP client for mailbox ingestion: TLS connect, LOGIN,
//! mailbox selection, UID SEARCH, and UID FETCH with full literal and
//! BODYSTRUCTURE handling (RFC 9051 subset).
//!
//! ## Quick Start
//!
//! ```ignore
//! use talentpipe_imap::{FetchAttribute, FetchItems, MailSession, SearchCriteria, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> talentpipe_imap::Result<()> {
//!     let config = SessionConfig::for_email("hr@gmail.com", "app-password")?;
//!     let mut session = MailSession::open(&config).await?;
//!
//!     session.select_mailbox("INBOX", true).await?;
//!     let uids = session
//!         .uid_search(SearchCriteria::Since("01-Aug-2026".to_string()))
//!         .await?;
//!     println!("{} messages", uids.len());
//!
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod framed;
pub mod lexer;
pub mod parse;
pub mod session;
pub mod stream;
pub mod types;

pub use command::{Command, FetchAttribute, FetchItems, SearchCriteria, TagGenerator};
pub use config::{Provider, SessionConfig};
pub use error::{Error, Result};
pub use framed::FramedStream;
pub use parse::{Response, Status, UntaggedResponse, parse_response};
pub use session::MailSession;
pub use stream::{ImapStream, connect_plain, connect_tls};
pub use types::{
    Address, BodyStructure, Envelope, FetchData, FetchResponse, LeafPart, PartPath, SeqNum, Uid,
    UidSet,
};
