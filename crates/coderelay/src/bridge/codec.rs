//! Codecs for the compiler subprocess streams.
//!
//! The compiler speaks free text: submissions go in as single lines on stdin,
//! and whatever it prints on stdout/stderr comes back as text chunks. There is
//! no framing beyond the trailing newline on input.

use std::io;

use tokio_util::bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Encodes a submission as one line: the code followed by exactly one `\n`.
///
/// A single trailing `\n` (or `\r\n`) already present on the code is not
/// doubled, so the compiler always sees one line terminator per submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubmissionCodec;

impl SubmissionCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Strip one trailing line terminator, if any.
pub fn strip_line_terminator(code: &str) -> &str {
    code.strip_suffix("\r\n")
        .or_else(|| code.strip_suffix('\n'))
        .unwrap_or(code)
}

impl<T: AsRef<str>> Encoder<T> for SubmissionCodec {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = strip_line_terminator(item.as_ref());
        tracing::trace!(line_len = line.len(), "Encoding submission");
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Decodes raw subprocess output into UTF-8 text chunks as bytes arrive.
///
/// Chunks are emitted eagerly; only an incomplete multi-byte sequence at the
/// end of the buffer is held back until the rest of it arrives. Invalid bytes
/// are replaced with U+FFFD rather than failing the stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputCodec;

impl OutputCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes`.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0b1100_0000 == 0b1000_0000 {
            // continuation byte, keep looking for the lead byte
            continue;
        }
        let needed = match b {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

impl Decoder for OutputCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let ready = src.len() - incomplete_tail_len(src);
        if ready == 0 {
            return Ok(None);
        }
        let chunk = src.split_to(ready);
        Ok(Some(String::from_utf8_lossy(&chunk).into_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // Stream ended mid-sequence: flush whatever is left lossily.
        let chunk = src.split_to(src.len());
        Ok(Some(String::from_utf8_lossy(&chunk).into_owned()))
    }
}
