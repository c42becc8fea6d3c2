//! Framed I/O over the IMAP wire.
//!
//! IMAP responses are CRLF-terminated lines that may embed literals
//! of the form `{n}\r\n<n bytes>`. The framed stream reassembles one
//! logical response (line plus any literals) per read.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Result;

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion. Resumes are
/// small; anything near this bound is not a document we want.
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Buffered IMAP connection with line and literal framing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response: a line plus any embedded literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            // A trailing {n} means n literal bytes follow, then the
            // line continues.
            if let Some(literal_len) = parse_literal_length(&line) {
                if literal_len > MAX_LITERAL_SIZE {
                    return Err(crate::Error::Protocol(format!(
                        "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                    )));
                }
                let mut literal = vec![0u8; literal_len];
                self.reader.read_exact(&mut literal).await?;
                response.extend_from_slice(&literal);
            } else {
                break;
            }
        }

        Ok(response)
    }

    /// Reads responses until the tagged completion for `tag`.
    ///
    /// The tagged response is the last element of the returned list.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();

        loop {
            let response = self.read_response().await?;
            let is_tagged = response
                .get(..tag.len())
                .is_some_and(|prefix| prefix == tag.as_bytes())
                && response.get(tag.len()).is_some_and(|&b| b == b' ');

            responses.push(response);

            if is_tagged {
                return Ok(responses);
            }
        }
    }

    /// Reads a single CRLF-terminated line.
    ///
    /// The transport hands out bytes in arbitrary chunks, so the
    /// terminator scan must cover the seam between chunks: a chunk
    /// ending in `\r` with the `\n` in the next read is still one
    /// terminator.
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(crate::Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            let carry_cr = line.last() == Some(&b'\r');
            if let Some(end) = line_end(carry_cr, buf) {
                line.extend_from_slice(&buf[..end]);
                self.reader.consume(end);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(crate::Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes a command to the stream and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Finds the index just past a CRLF terminator in `buf`.
///
/// `carry_cr` marks a `\r` that already arrived at the end of the
/// accumulated line, so a leading `\n` completes it.
fn line_end(carry_cr: bool, buf: &[u8]) -> Option<usize> {
    if carry_cr && buf.first() == Some(&b'\n') {
        return Some(1);
    }
    buf.windows(2).position(|w| w == b"\r\n").map(|pos| pos + 2)
}

/// Parses a literal length from the end of a line.
///
/// Matches `{123}\r\n` and the non-synchronizing form `{123+}\r\n`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);

    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = std::str::from_utf8(&body[open + 1..]).ok()?;
    digits.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn line_end_positions() {
        assert_eq!(line_end(false, b"hello\r\n"), Some(7));
        assert_eq!(line_end(false, b"\r\n"), Some(2));
        assert_eq!(line_end(false, b"no newline"), None);
        assert_eq!(line_end(false, b"just\n"), None);
        assert_eq!(line_end(true, b"\nrest"), Some(1));
        assert_eq!(line_end(true, b"more\r\n"), Some(6));
    }

    #[test]
    fn literal_length_forms() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
    }

    #[tokio::test]
    async fn reads_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn reads_line_with_split_terminator() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn split_terminator_does_not_merge_lines() {
        // The tagged completion must stay a separate response even
        // when the CRLF of the line before it straddles two reads.
        let mock = Builder::new()
            .read(b"* SEARCH 4\r")
            .read(b"\nA001 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* SEARCH 4\r\n");
        assert_eq!(framed.read_response().await.unwrap(), b"A001 OK done\r\n");
    }

    #[tokio::test]
    async fn reads_embedded_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[1] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[1] {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn collects_until_tagged() {
        let mock = Builder::new()
            .read(b"* SEARCH 4 8 15\r\n")
            .read(b"A001 OK SEARCH completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = framed.read_until_tagged("A001").await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], b"* SEARCH 4 8 15\r\n");
        assert_eq!(responses[1], b"A001 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn tag_prefix_must_match_exactly() {
        // A0011 must not satisfy a reader waiting for A001.
        let mock = Builder::new()
            .read(b"A0011 OK unrelated\r\n")
            .read(b"A001 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = framed.read_until_tagged("A001").await.unwrap();
        assert_eq!(responses.len(), 2);
    }

    #[tokio::test]
    async fn oversized_literal_rejected() {
        let literal_size = MAX_LITERAL_SIZE + 1;
        let header = format!("* 1 FETCH (BODY[1] {{{literal_size}}}\r\n");

        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn overlong_line_rejected() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn writes_command() {
        let mock = Builder::new().write(b"A001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A001 NOOP\r\n").await.unwrap();
    }
}
