//! Parsing of server responses into structured types.

#![allow(clippy::missing_errors_doc)]

use crate::lexer::{Lexer, Token};
use crate::types::{
    Address, BodyStructure, Envelope, FetchData, FetchResponse, LeafPart, SeqNum, Uid,
};
use crate::{Error, Result};

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or invalid in this state.
    Bad,
}

/// One parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged command completion.
    Tagged {
        /// Command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable text, including any response code.
        text: String,
    },
    /// Untagged server data.
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation(String),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* SEARCH n n n` result UIDs (for UID SEARCH).
    Search(Vec<Uid>),
    /// `* n EXISTS` message count.
    Exists(u32),
    /// `* n FETCH (...)` data.
    Fetch(FetchResponse),
    /// `* BYE` from the server.
    Bye(String),
    /// `* OK`, `* NO`, `* BAD` status text.
    Status(Status, String),
    /// Anything this client does not consume.
    Other(String),
}

/// Parses one complete response as framed off the wire.
pub fn parse_response(input: &[u8]) -> Result<Response> {
    let mut lexer = Lexer::new(input);

    match lexer.next_token()? {
        Token::Asterisk => {
            lexer.expect_space()?;
            parse_untagged(&mut lexer).map(Response::Untagged)
        }
        Token::Plus => {
            if lexer.peek() == Some(b' ') {
                lexer.advance();
            }
            Ok(Response::Continuation(lexer.rest_as_text()))
        }
        Token::Atom(tag) => {
            let tag = tag.to_string();
            lexer.expect_space()?;
            let status = parse_status(&mut lexer)?;
            if lexer.peek() == Some(b' ') {
                lexer.advance();
            }
            Ok(Response::Tagged {
                tag,
                status,
                text: lexer.rest_as_text(),
            })
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("unexpected response start: {token:?}"),
        }),
    }
}

fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
    match lexer.next_token()? {
        Token::Atom(s) if s.eq_ignore_ascii_case("OK") => Ok(Status::Ok),
        Token::Atom(s) if s.eq_ignore_ascii_case("NO") => Ok(Status::No),
        Token::Atom(s) if s.eq_ignore_ascii_case("BAD") => Ok(Status::Bad),
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected status, got {token:?}"),
        }),
    }
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    match lexer.next_token()? {
        // "* n EXISTS", "* n FETCH (...)", "* n RECENT", "* n EXPUNGE"
        Token::Number(n) => {
            lexer.expect_space()?;
            let keyword = match lexer.next_token()? {
                Token::Atom(s) => s.to_uppercase(),
                token => {
                    return Err(Error::Parse {
                        position: lexer.position(),
                        message: format!("expected keyword after number, got {token:?}"),
                    });
                }
            };
            match keyword.as_str() {
                "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                "FETCH" => {
                    let seq = SeqNum::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "sequence number cannot be 0".to_string(),
                    })?;
                    lexer.expect_space()?;
                    let items = parse_fetch_items(lexer)?;
                    Ok(UntaggedResponse::Fetch(FetchResponse { seq, items }))
                }
                _ => Ok(UntaggedResponse::Other(format!("{n} {keyword}"))),
            }
        }
        Token::Atom(s) => {
            let keyword = s.to_uppercase();
            match keyword.as_str() {
                "SEARCH" => {
                    let mut uids = Vec::new();
                    loop {
                        match lexer.next_token()? {
                            Token::Space => {}
                            Token::Number(n) => {
                                let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                                    position: lexer.position(),
                                    message: "search result UID cannot be 0".to_string(),
                                })?;
                                uids.push(uid);
                            }
                            Token::Crlf | Token::Eof => break,
                            token => {
                                return Err(Error::Parse {
                                    position: lexer.position(),
                                    message: format!("unexpected search token: {token:?}"),
                                });
                            }
                        }
                    }
                    Ok(UntaggedResponse::Search(uids))
                }
                "BYE" => {
                    if lexer.peek() == Some(b' ') {
                        lexer.advance();
                    }
                    Ok(UntaggedResponse::Bye(lexer.rest_as_text()))
                }
                "OK" | "NO" | "BAD" => {
                    let status = match keyword.as_str() {
                        "OK" => Status::Ok,
                        "NO" => Status::No,
                        _ => Status::Bad,
                    };
                    if lexer.peek() == Some(b' ') {
                        lexer.advance();
                    }
                    Ok(UntaggedResponse::Status(status, lexer.rest_as_text()))
                }
                _ => Ok(UntaggedResponse::Other(format!(
                    "{keyword} {}",
                    lexer.rest_as_text()
                ))),
            }
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("unexpected untagged data: {token:?}"),
        }),
    }
}

/// Parses the parenthesized item list of a FETCH response.
fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchData>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                let upper = name.to_uppercase();
                match upper.as_str() {
                    "UID" => {
                        lexer.expect_space()?;
                        let n = lexer.read_number()?;
                        let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                            position: lexer.position(),
                            message: format!("invalid UID value: {n}"),
                        })?;
                        items.push(FetchData::Uid(uid));
                    }
                    "RFC822.SIZE" => {
                        lexer.expect_space()?;
                        items.push(FetchData::Rfc822Size(lexer.read_number()?));
                    }
                    "INTERNALDATE" => {
                        lexer.expect_space()?;
                        if let Token::QuotedString(date) = lexer.next_token()? {
                            items.push(FetchData::InternalDate(date));
                        }
                    }
                    "ENVELOPE" => {
                        lexer.expect_space()?;
                        let envelope = parse_envelope(lexer)?;
                        items.push(FetchData::Envelope(Box::new(envelope)));
                    }
                    "BODYSTRUCTURE" => {
                        lexer.expect_space()?;
                        let body_structure = parse_body_structure(lexer)?;
                        items.push(FetchData::BodyStructure(body_structure));
                    }
                    "BODY" => {
                        let section = parse_body_section(lexer)?;
                        lexer.expect_space()?;
                        let data = match lexer.next_token()? {
                            Token::Literal(d) => Some(d),
                            Token::QuotedString(s) => Some(s.into_bytes()),
                            _ => None,
                        };
                        items.push(FetchData::Body { section, data });
                    }
                    _ => skip_fetch_item(lexer)?,
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected fetch item token: {token:?}"),
                });
            }
        }
    }

    Ok(items)
}

/// Parses the `[section]` suffix of a BODY fetch response item.
fn parse_body_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    if lexer.peek() != Some(b'[') {
        return Ok(None);
    }
    lexer.advance();

    let mut section = String::new();
    loop {
        match lexer.peek() {
            Some(b']') => {
                lexer.advance();
                break;
            }
            Some(b) => {
                section.push(b as char);
                lexer.advance();
            }
            None => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unterminated body section".to_string(),
                });
            }
        }
    }

    Ok((!section.is_empty()).then_some(section))
}

/// Parses an ENVELOPE structure (ten fixed fields).
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let _sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let _reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let _cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let _bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let _in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        to,
        message_id,
    })
}

fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => break,
                }
            }
            Ok(addresses)
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected address list, got {token:?}"),
        }),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;

    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let _adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        mailbox,
        host,
    })
}

/// Parses a BODYSTRUCTURE response.
///
/// Single parts keep the extension fields we act on: the
/// Content-Disposition type and its parameters, which carry the
/// attachment filename. Multipart extension data is skipped.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    if lexer.peek() == Some(b'(') {
        // Multipart: nested parts, then the subtype.
        let mut parts = Vec::new();
        while lexer.peek() == Some(b'(') {
            parts.push(parse_body_structure(lexer)?);
            if lexer.peek() == Some(b' ') {
                lexer.advance();
            }
        }

        let subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
        skip_to_close_paren(lexer)?;

        Ok(BodyStructure::Multipart { parts, subtype })
    } else {
        let media_type = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
        lexer.expect_space()?;
        let media_subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
        lexer.expect_space()?;

        let params = parse_param_list(lexer)?;
        lexer.expect_space()?;

        let _id = lexer.read_nstring()?;
        lexer.expect_space()?;
        let _description = lexer.read_nstring()?;
        lexer.expect_space()?;

        let encoding = lexer.read_nstring()?.unwrap_or_default();
        lexer.expect_space()?;

        let size = lexer.read_number()?;

        // TEXT parts carry a line count before the extension fields.
        if media_type == "TEXT" && lexer.peek() == Some(b' ') {
            lexer.advance();
            let _lines = lexer.read_number()?;
        }

        // Extension fields, in order: MD5, disposition, then
        // language and location which we skip.
        let mut disposition = None;
        let mut disposition_params = Vec::new();

        if lexer.peek() == Some(b' ') {
            lexer.advance();
            let _md5 = lexer.read_nstring()?;

            if lexer.peek() == Some(b' ') {
                lexer.advance();
                if let Some((kind, dparams)) = parse_disposition(lexer)? {
                    disposition = Some(kind);
                    disposition_params = dparams;
                }
            }
        }

        skip_to_close_paren(lexer)?;

        Ok(BodyStructure::Part(LeafPart {
            media_type,
            media_subtype,
            params,
            encoding,
            size,
            disposition,
            disposition_params,
        }))
    }
}

/// Parses a disposition: NIL or `("attachment" ("filename" "x"))`.
fn parse_disposition(lexer: &mut Lexer<'_>) -> Result<Option<(String, Vec<(String, String)>)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::LParen => {
            let kind = lexer.read_nstring()?.unwrap_or_default().to_lowercase();
            let mut params = Vec::new();
            if lexer.peek() == Some(b' ') {
                lexer.advance();
                params = parse_param_list(lexer)?;
            }
            lexer.expect(Token::RParen)?;
            Ok(Some((kind, params)))
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected disposition, got {token:?}"),
        }),
    }
}

/// Parses NIL or `(key value key value ...)`, lowercasing keys.
fn parse_param_list(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => {
                        let key = lexer.read_nstring()?.unwrap_or_default().to_lowercase();
                        if lexer.peek() == Some(b' ') {
                            lexer.advance();
                        }
                        let value = lexer.read_nstring()?.unwrap_or_default();
                        params.push((key, value));
                    }
                }
            }
            Ok(params)
        }
        _ => Ok(Vec::new()),
    }
}

/// Skips to the closing parenthesis at the current nesting level.
fn skip_to_close_paren(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 1;
    while depth > 0 {
        match lexer.peek() {
            Some(b'(') => {
                depth += 1;
                lexer.advance();
            }
            Some(b')') => {
                depth -= 1;
                lexer.advance();
            }
            Some(b'{') => {
                let _ = lexer.next_token()?;
            }
            Some(_) => {
                lexer.advance();
            }
            None => break,
        }
    }
    Ok(())
}

/// Skips an unknown fetch item value.
fn skip_fetch_item(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    let mut paren_depth = 0;
    loop {
        match lexer.peek() {
            Some(b'(') => {
                paren_depth += 1;
                lexer.advance();
            }
            Some(b')') => {
                if paren_depth == 0 {
                    break;
                }
                paren_depth -= 1;
                lexer.advance();
            }
            Some(b' ') if paren_depth == 0 => break,
            Some(b'{') => {
                let _ = lexer.next_token()?;
            }
            Some(_) => {
                lexer.advance();
            }
            None => break,
        }
    }

    Ok(())
}
