//! Line framing for the APRS-IS protocol.
//!
//! APRS-IS is a plain text protocol with one packet or server comment
//! per line:
//! ```text
//! ┌──────────────────────────┬──────────┐
//! │   line (no CR/LF)        │  \r\n    │
//! │   up to 512 bytes        │  2 bytes │
//! └──────────────────────────┴──────────┘
//! ```
//! Servers terminate lines with CR/LF, but a bare LF is accepted too.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Line terminator sent to the server.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Maximum line length accepted from the server, excluding the terminator.
pub const MAX_LINE_LEN: usize = 512;

/// Marker that starts a server comment line.
pub const COMMENT_MARKER: u8 = b'#';

/// Encodes a line for the wire.
///
/// Any trailing CR/LF in `line` is stripped first so that the result is
/// always terminated exactly once.
#[must_use]
pub fn encode(line: &[u8]) -> Bytes {
    let body = trim_line_end(line);
    let mut buf = BytesMut::with_capacity(body.len() + LINE_TERMINATOR.len());
    buf.put_slice(body);
    buf.put_slice(LINE_TERMINATOR);
    buf.freeze()
}

/// Strips trailing CR and LF bytes.
#[must_use]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

/// Returns true if the line is a server comment (`# ...`).
#[must_use]
pub fn is_comment(line: &[u8]) -> bool {
    line.first() == Some(&COMMENT_MARKER)
}

/// Line decoder that handles partial data.
///
/// Never buffers more than one maximum-length line without a terminator;
/// an overlong line is discarded up to its terminator.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    discarding: bool,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            discarding: false,
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.discard_overflow();
    }

    /// Drops an unterminated line once it can no longer fit.
    fn discard_overflow(&mut self) {
        // Room for a trailing CR still waiting for its LF
        if self.buffer.len() <= MAX_LINE_LEN + 1 || self.buffer.contains(&b'\n') {
            return;
        }
        if !self.discarding {
            tracing::warn!("line exceeds {MAX_LINE_LEN} bytes, dropping it");
            self.discarding = true;
        }
        self.buffer.clear();
    }

    /// Attempts to decode the next complete line.
    ///
    /// Returns `Some(line)` without its terminator once a full line is
    /// buffered, or `None` if more data is needed. Empty lines are skipped,
    /// and so are lines longer than [`MAX_LINE_LEN`].
    pub fn decode(&mut self) -> Option<Bytes> {
        loop {
            let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') else {
                self.discard_overflow();
                return None;
            };

            let mut line = self.buffer.split_to(newline);
            self.buffer.advance(1);

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if line.is_empty() {
                continue;
            }
            if line.len() > MAX_LINE_LEN {
                tracing::warn!(
                    "line of {} bytes exceeds {MAX_LINE_LEN}, dropping it",
                    line.len()
                );
                continue;
            }

            return Some(line.freeze());
        }
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_terminator() {
        let line = encode(b"DF1JSL-15>APRS:>hello");
        assert_eq!(&line[..], b"DF1JSL-15>APRS:>hello\r\n");
    }

    #[test]
    fn test_encode_does_not_double_terminate() {
        assert_eq!(&encode(b"hello\r\n")[..], b"hello\r\n");
        assert_eq!(&encode(b"hello\n")[..], b"hello\r\n");
        assert_eq!(&encode(b"\r\n")[..], b"\r\n");
    }

    #[test]
    fn test_is_comment() {
        assert!(is_comment(b"# aprsc 2.1.19"));
        assert!(!is_comment(b"DF1JSL>APRS:>test"));
        assert!(!is_comment(b""));
    }

    #[test]
    fn test_decode_complete_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"hello\r\n");

        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"hello")));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut decoder = LineDecoder::new();

        decoder.feed(b"hel");
        assert_eq!(decoder.decode(), None);

        decoder.feed(b"lo\r\n");
        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"hello")));
    }

    #[test]
    fn test_decode_bare_newline_and_blank_lines() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"\r\n\nfirst\nsecond\r\n");

        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"first")));
        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"second")));
        assert_eq!(decoder.decode(), None);
    }

    #[test]
    fn test_decode_drops_long_line() {
        let mut decoder = LineDecoder::new();
        let mut data = vec![b'x'; MAX_LINE_LEN + 10];
        data.extend_from_slice(b"END\r\nnext\r\n");
        decoder.feed(&data);

        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"next")));
        assert_eq!(decoder.decode(), None);
    }

    #[test]
    fn test_decode_accepts_max_length_line() {
        let mut decoder = LineDecoder::new();
        let line = vec![b'x'; MAX_LINE_LEN];
        decoder.feed(&line);
        decoder.feed(b"\r");
        decoder.feed(b"\n");

        assert_eq!(decoder.decode().as_deref(), Some(&line[..]));
    }

    #[test]
    fn test_unterminated_stream_is_bounded() {
        let mut decoder = LineDecoder::new();
        let chunk = [b'x'; 1024];
        for _ in 0..1024 {
            decoder.feed(&chunk);
            assert!(decoder.buffered() <= MAX_LINE_LEN + 1);
            assert_eq!(decoder.decode(), None);
        }

        // The rest of the overlong line is dropped too
        decoder.feed(b"tail END\r\nDF1JSL>APRS:>next\r\n");
        assert_eq!(
            decoder.decode(),
            Some(Bytes::from_static(b"DF1JSL>APRS:>next"))
        );
    }

    #[test]
    fn test_clear_resets_discarding() {
        let mut decoder = LineDecoder::new();
        decoder.feed(&[b'x'; MAX_LINE_LEN + 2]);
        decoder.clear();

        decoder.feed(b"fresh\r\n");
        assert_eq!(decoder.decode(), Some(Bytes::from_static(b"fresh")));
    }
}
