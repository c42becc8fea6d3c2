//! High-level IMAP session.
//!
//! `MailSession` manages the connection lifecycle with interior state
//! tracking: authenticated, mailbox selected, or logged out. Callers
//! get a small imperative API and never touch tags or framing.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::{Command, FetchItems, SearchCriteria, TagGenerator};
use crate::config::SessionConfig;
use crate::framed::FramedStream;
use crate::parse::{Response, Status, UntaggedResponse, parse_response};
use crate::stream::{ImapStream, connect_tls};
use crate::types::{FetchResponse, Uid, UidSet};
use crate::{Error, Result};

/// Session state after login.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is selected.
    Selected {
        mailbox: String,
        read_only: bool,
    },
    /// LOGOUT has been sent.
    LoggedOut,
}

/// An authenticated IMAP session.
pub struct MailSession<S> {
    framed: FramedStream<S>,
    tags: TagGenerator,
    state: SessionState,
}

impl MailSession<ImapStream> {
    /// Connects over TLS, reads the greeting, and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectTimeout`] when the server is not
    /// reachable in time and [`Error::Auth`] when login is rejected.
    pub async fn open(config: &SessionConfig) -> Result<Self> {
        let stream = connect_tls(
            &config.host,
            config.port,
            config.connect_timeout,
            config.danger_accept_invalid_certs,
        )
        .await?;
        tracing::debug!(host = %config.host, port = config.port, "connected");

        Self::handshake(stream, &config.username, &config.password).await
    }
}

impl<S> MailSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Performs the greeting and LOGIN exchange on an open stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when the server rejects the login and
    /// [`Error::Bye`] when it closes the connection at greeting time.
    pub async fn handshake(stream: S, username: &str, password: &str) -> Result<Self> {
        let mut session = Self {
            framed: FramedStream::new(stream),
            tags: TagGenerator::new(),
            state: SessionState::Authenticated,
        };

        let greeting = session.framed.read_response().await?;
        match parse_response(&greeting)? {
            Response::Untagged(UntaggedResponse::Bye(text)) => return Err(Error::Bye(text)),
            Response::Untagged(_) => {}
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        let login = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        match session.run(&login).await {
            Ok(_) => {}
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        }
        tracing::debug!(username, "authenticated");

        Ok(session)
    }

    /// Returns the selected mailbox name, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            SessionState::Selected { mailbox, .. } => Some(mailbox),
            _ => None,
        }
    }

    /// Selects a mailbox, read-only via EXAMINE or writable via SELECT.
    ///
    /// Returns the message count reported by the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`] when the mailbox does not exist.
    pub async fn select_mailbox(&mut self, mailbox: &str, read_only: bool) -> Result<u32> {
        self.ensure_usable()?;

        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.to_string(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.to_string(),
            }
        };
        let untagged = self.run(&command).await?;

        let exists = untagged
            .iter()
            .find_map(|r| match r {
                UntaggedResponse::Exists(n) => Some(*n),
                _ => None,
            })
            .unwrap_or(0);

        self.state = SessionState::Selected {
            mailbox: mailbox.to_string(),
            read_only,
        };
        tracing::debug!(mailbox, exists, read_only, "mailbox selected");

        Ok(exists)
    }

    /// Runs a UID SEARCH and returns matching UIDs in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when no mailbox is selected.
    pub async fn uid_search(&mut self, criteria: SearchCriteria) -> Result<Vec<Uid>> {
        self.ensure_selected()?;

        let untagged = self.run(&Command::UidSearch { criteria }).await?;

        let mut uids = Vec::new();
        for response in untagged {
            if let UntaggedResponse::Search(found) = response {
                uids.extend(found);
            }
        }
        Ok(uids)
    }

    /// Runs a UID FETCH and returns the per-message responses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when no mailbox is selected.
    pub async fn uid_fetch(&mut self, set: UidSet, items: FetchItems) -> Result<Vec<FetchResponse>> {
        self.ensure_selected()?;

        let untagged = self.run(&Command::UidFetch { set, items }).await?;

        let mut fetched = Vec::new();
        for response in untagged {
            if let UntaggedResponse::Fetch(fetch) = response {
                fetched.push(fetch);
            }
        }
        Ok(fetched)
    }

    /// Closes the selected mailbox. A no-op when none is selected.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport fails mid-command.
    pub async fn close(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Selected { .. }) {
            return Ok(());
        }
        self.run(&Command::Close).await?;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Logs out. Idempotent; the session is unusable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport fails before the server
    /// confirms the logout.
    pub async fn logout(&mut self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Ok(());
        }
        // The server answers LOGOUT with BYE before the tagged OK.
        match self.run(&Command::Logout).await {
            Ok(_) | Err(Error::Bye(_)) => {}
            Err(e) => return Err(e),
        }
        self.state = SessionState::LoggedOut;
        Ok(())
    }

    /// Sends one command and collects its untagged responses.
    async fn run(&mut self, command: &Command) -> Result<Vec<UntaggedResponse>> {
        let tag = self.tags.next_tag();
        self.framed.write_command(&command.serialize(&tag)).await?;

        let raw_responses = self.framed.read_until_tagged(&tag).await?;

        let mut untagged = Vec::new();
        let mut bye = None;
        for raw in &raw_responses {
            match parse_response(raw)? {
                Response::Untagged(UntaggedResponse::Bye(text)) => bye = Some(text),
                Response::Untagged(data) => untagged.push(data),
                Response::Tagged { status, text, .. } => match status {
                    Status::Ok => return Ok(untagged),
                    Status::No => return Err(Error::No(text)),
                    Status::Bad => return Err(Error::Bad(text)),
                },
                Response::Continuation(_) => {}
            }
        }

        // Reached only when the tagged line failed to parse as one.
        if let Some(text) = bye {
            return Err(Error::Bye(text));
        }
        Err(Error::Protocol("missing tagged completion".to_string()))
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Err(Error::InvalidState("session is logged out".to_string()));
        }
        Ok(())
    }

    fn ensure_selected(&self) -> Result<()> {
        match self.state {
            SessionState::Selected { .. } => Ok(()),
            _ => Err(Error::InvalidState("no mailbox selected".to_string())),
        }
    }
}

impl<S> std::fmt::Debug for MailSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSession")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::command::FetchAttribute;
    use tokio_test::io::Builder;

    async fn logged_in(
        mock: tokio_test::io::Mock,
    ) -> MailSession<tokio_test::io::Mock> {
        MailSession::handshake(mock, "hr@corp.example", "secret")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn handshake_logs_in() {
        let mock = Builder::new()
            .read(b"* OK IMAP4rev1 ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK LOGIN completed\r\n")
            .build();

        let session = logged_in(mock).await;
        assert!(session.selected_mailbox().is_none());
    }

    #[tokio::test]
    async fn handshake_rejected_login_is_auth_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] invalid credentials\r\n")
            .build();

        let err = MailSession::handshake(mock, "hr@corp.example", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn handshake_bye_greeting_fails() {
        let mock = Builder::new().read(b"* BYE overloaded\r\n").build();

        let err = MailSession::handshake(mock, "x", "y").await.unwrap_err();
        assert!(matches!(err, Error::Bye(_)));
    }

    #[tokio::test]
    async fn examine_reports_exists_and_state() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 EXAMINE INBOX\r\n")
            .read(b"* 17 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"A0002 OK [READ-ONLY] EXAMINE completed\r\n")
            .build();

        let mut session = logged_in(mock).await;
        let exists = session.select_mailbox("INBOX", true).await.unwrap();
        assert_eq!(exists, 17);
        assert_eq!(session.selected_mailbox(), Some("INBOX"));
    }

    #[tokio::test]
    async fn missing_mailbox_is_no_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 SELECT Recruiting\r\n")
            .read(b"A0002 NO no such mailbox\r\n")
            .build();

        let mut session = logged_in(mock).await;
        let err = session
            .select_mailbox("Recruiting", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert!(session.selected_mailbox().is_none());
    }

    #[tokio::test]
    async fn uid_search_returns_server_order() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 EXAMINE INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 UID SEARCH SINCE 29-Aug-2026\r\n")
            .read(b"* SEARCH 31 9 54\r\n")
            .read(b"A0003 OK SEARCH completed\r\n")
            .build();

        let mut session = logged_in(mock).await;
        session.select_mailbox("INBOX", true).await.unwrap();
        let uids = session
            .uid_search(SearchCriteria::Since("29-Aug-2026".to_string()))
            .await
            .unwrap();

        let values: Vec<u32> = uids.iter().map(|u| u.get()).collect();
        assert_eq!(values, vec![31, 9, 54]);
    }

    #[tokio::test]
    async fn uid_search_without_selection_fails() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        let mut session = logged_in(mock).await;
        let err = session.uid_search(SearchCriteria::All).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn uid_fetch_body_peek_literal() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 EXAMINE INBOX\r\n")
            .read(b"* 5 EXISTS\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 UID FETCH 42 (UID BODY.PEEK[2])\r\n")
            .read(b"* 5 FETCH (UID 42 BODY[2] {11}\r\nhello world)\r\n")
            .read(b"A0003 OK FETCH completed\r\n")
            .build();

        let mut session = logged_in(mock).await;
        session.select_mailbox("INBOX", true).await.unwrap();
        let fetched = session
            .uid_fetch(
                UidSet::Single(Uid::new(42).unwrap()),
                FetchItems(vec![
                    FetchAttribute::Uid,
                    FetchAttribute::Body {
                        section: Some("2".to_string()),
                        peek: true,
                    },
                ]),
            )
            .await
            .unwrap();

        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].uid().unwrap().get(), 42);
        assert_eq!(fetched[0].body_bytes().unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        let mut session = logged_in(mock).await;
        session.close().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn logout_accepts_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN hr@corp.example secret\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 LOGOUT\r\n")
            .read(b"* BYE see you\r\n")
            .read(b"A0002 OK LOGOUT completed\r\n")
            .build();

        let mut session = logged_in(mock).await;
        session.logout().await.unwrap();
        session.logout().await.unwrap();

        let err = session.select_mailbox("INBOX", true).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
