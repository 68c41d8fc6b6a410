//! Inbound framing
//!
//! Turns the client byte stream into nickname and message units. Two
//! framings are supported: newline-delimited lines, and raw read chunks
//! capped at a size limit (the historical behaviour, where a long message
//! arrives as several units).

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::config::Framing;
use crate::error::AppError;

/// Decoder for client input, one `String` per nickname or message
///
/// Invalid UTF-8 surfaces as `AppError::Decode` under either framing.
#[derive(Debug)]
pub struct InboundCodec {
    framing: Framing,
    chunk_limit: usize,
    /// Bytes already scanned for a newline
    next_index: usize,
}

impl InboundCodec {
    /// `chunk_limit` only applies to chunked framing and is clamped to 1
    pub fn new(framing: Framing, chunk_limit: usize) -> Self {
        Self {
            framing,
            chunk_limit: chunk_limit.max(1),
            next_index: 0,
        }
    }

    /// Change the chunk cap, e.g. when moving from nickname entry to chat
    pub fn set_chunk_limit(&mut self, chunk_limit: usize) {
        self.chunk_limit = chunk_limit.max(1);
    }

    #[cfg(test)]
    pub(crate) fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }

    fn decode_line(&mut self, buf: &mut BytesMut) -> Result<Option<String>, AppError> {
        match buf[self.next_index..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let line = buf.split_to(end + 1);
                line_text(&line[..end]).map(Some)
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_line_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, AppError> {
        if let Some(line) = self.decode_line(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        // Unterminated tail
        let rest = buf.split();
        line_text(&rest).map(Some)
    }
}

impl Decoder for InboundCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, AppError> {
        match self.framing {
            Framing::Lines => self.decode_line(buf),
            Framing::Chunked => decode_chunk(buf, self.chunk_limit, false),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, AppError> {
        match self.framing {
            Framing::Lines => self.decode_line_eof(buf),
            Framing::Chunked => decode_chunk(buf, self.chunk_limit, true),
        }
    }
}

/// Line body without its `\r`, as UTF-8
fn line_text(bytes: &[u8]) -> Result<String, AppError> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// Take up to `limit` bytes, never splitting a UTF-8 character
fn decode_chunk(buf: &mut BytesMut, limit: usize, eof: bool) -> Result<Option<String>, AppError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let window = buf.len().min(limit);
    let cut = match std::str::from_utf8(&buf[..window]) {
        Ok(_) => window,
        Err(e) if e.valid_up_to() > 0 => e.valid_up_to(),
        Err(e) if e.error_len().is_some() => return Err(e.into()),
        Err(e) => {
            // Window holds only the start of one character: widen to it
            let width = utf8_width(buf[0]);
            if buf.len() < width {
                if eof {
                    return Err(e.into());
                }
                return Ok(None);
            }
            std::str::from_utf8(&buf[..width])?;
            width
        }
    };

    let chunk = buf.split_to(cut);
    let text = std::str::from_utf8(&chunk)?.to_string();
    Ok(Some(text))
}

/// Encoded length implied by a UTF-8 lead byte
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut InboundCodec, input: &[u8]) -> Vec<String> {
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            out.push(item);
        }
        while let Some(item) = codec.decode_eof(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_lines_strip_terminators() {
        let mut codec = InboundCodec::new(Framing::Lines, 100);
        let items = decode_all(&mut codec, b"alice\r\nhello there\n");
        assert_eq!(items, vec!["alice", "hello there"]);
    }

    #[test]
    fn test_lines_waits_for_newline() {
        let mut codec = InboundCodec::new(Framing::Lines, 100);
        let mut buf = BytesMut::from(&b"partial"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        // Unterminated tail is delivered at end of stream
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("partial"));
    }

    #[test]
    fn test_lines_arriving_in_pieces() {
        let mut codec = InboundCodec::new(Framing::Lines, 100);
        let mut buf = BytesMut::from(&b"hel"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo\nwor");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("hello"));
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ld\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("world"));
    }

    #[test]
    fn test_lines_invalid_utf8_is_decode_error() {
        let mut codec = InboundCodec::new(Framing::Lines, 100);
        let mut buf = BytesMut::from(&b"fine\n\xff\xfe\nafter\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("fine"));
        assert!(matches!(codec.decode(&mut buf), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_lines_invalid_utf8_in_tail_is_decode_error() {
        let mut codec = InboundCodec::new(Framing::Lines, 100);
        let mut buf = BytesMut::from(&b"\xc3"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(codec.decode_eof(&mut buf), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_chunked_fragments_long_input() {
        let mut codec = InboundCodec::new(Framing::Chunked, 4);
        let items = decode_all(&mut codec, b"abcdefghij");
        assert_eq!(items, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunked_keeps_newlines_verbatim() {
        let mut codec = InboundCodec::new(Framing::Chunked, 100);
        let items = decode_all(&mut codec, b"hello\n");
        assert_eq!(items, vec!["hello\n"]);
    }

    #[test]
    fn test_chunked_never_splits_multibyte_char() {
        // 'é' is two bytes; a 2-byte window would cut it after 'h'
        let mut codec = InboundCodec::new(Framing::Chunked, 2);
        let items = decode_all(&mut codec, "héllo".as_bytes());
        assert_eq!(items.concat(), "héllo");
        assert_eq!(items[0], "h");
        assert_eq!(items[1], "é");
    }

    #[test]
    fn test_chunked_limit_smaller_than_char() {
        let mut codec = InboundCodec::new(Framing::Chunked, 1);
        let items = decode_all(&mut codec, "€!".as_bytes());
        assert_eq!(items, vec!["€", "!"]);
    }

    #[test]
    fn test_chunked_waits_for_rest_of_char() {
        let mut codec = InboundCodec::new(Framing::Chunked, 100);
        let euro = "€".as_bytes();
        let mut buf = BytesMut::from(&euro[..1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&euro[1..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("€"));
    }

    #[test]
    fn test_chunked_invalid_utf8_is_error() {
        let mut codec = InboundCodec::new(Framing::Chunked, 100);
        let mut buf = BytesMut::from(&[b'o', b'k', 0xff, b'!'][..]);
        // Valid prefix first, then the bad byte fails
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ok"));
        assert!(matches!(codec.decode(&mut buf), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_chunked_truncated_char_at_eof_is_error() {
        let mut codec = InboundCodec::new(Framing::Chunked, 100);
        let mut buf = BytesMut::from(&"€".as_bytes()[..2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(codec.decode_eof(&mut buf).is_err());
    }

    #[test]
    fn test_set_chunk_limit() {
        let mut codec = InboundCodec::new(Framing::Chunked, 1000);
        codec.set_chunk_limit(3);
        assert_eq!(codec.chunk_limit(), 3);
        let items = decode_all(&mut codec, b"abcdef");
        assert_eq!(items, vec!["abc", "def"]);

        codec.set_chunk_limit(0);
        assert_eq!(codec.chunk_limit(), 1);
    }
}
