//! Line codec for the server connection.
//!
//! Lines are split on `\n` with the trailing `\r\n` removed. Lines that are
//! not valid UTF-8 are decoded as Windows-1252, which is what most legacy
//! clients send. A line longer than the limit is dropped as a whole and
//! reading continues with the next one.

use bytes::{BufMut, BytesMut};
use encoding_rs::WINDOWS_1252;
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Default maximum line length in bytes, including the line ending.
pub const MAX_LINE_LEN: usize = 8 * 1024;

#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Dropping the rest of an overlong line.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    fn decode_line(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match std::str::from_utf8(raw) {
            Ok(line) => line.to_string(),
            Err(_) => WINDOWS_1252.decode_without_bom_handling(raw).0.into_owned(),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    if !self.discarding {
                        warn!(limit = self.max_len, "Dropping overlong line");
                    }
                    self.discarding = true;
                    src.clear();
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > self.max_len {
                warn!(length = line.len(), limit = self.max_len, "Dropping overlong line");
                continue;
            }
            return Ok(Some(Self::decode_line(&line)));
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    /// Writes one line, cut at the first CR or LF so that text taken from
    /// chat can never smuggle in a second command.
    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        let end = line.find(['\r', '\n']).unwrap_or(line.len());
        dst.reserve(end + 2);
        dst.put_slice(&line.as_bytes()[..end]);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
