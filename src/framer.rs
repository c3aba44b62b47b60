//! Newline framing for the stream protocol.
//!
//! TCP hands us an unstructured byte stream: one read may carry half a
//! line, or several lines at once. `LineFramer` keeps the bytes that have
//! not yet been terminated by `\n` and hands out complete lines as they
//! appear.
//!
//! ```text
//! feed("capital of fr")   -> pending: "capital of fr"         yields: -
//! feed("ance\nhi\nby")    -> pending: "by"                    yields: "capital of france", "hi"
//! feed("e\n")             -> pending: ""                      yields: "bye"
//! ```
//!
//! A line with no trailing newline is never yielded. If the connection
//! closes first, those bytes are dropped with the framer.

use bytes::{Buf, Bytes, BytesMut};

/// Initial capacity of the pending buffer.
const BUFFER_SIZE: usize = 4 * 1024;

/// Accumulates stream bytes and splits them into `\n`-terminated lines.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
        }
    }

    /// Append received bytes to the pending buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Drain complete lines, in order.
    ///
    /// The iterator is lazy: each `next()` removes one line (without its
    /// newline) from the front of the buffer. Whatever is left when it
    /// returns `None` contains no newline.
    pub fn extract_messages(&mut self) -> Lines<'_> {
        Lines {
            buffer: &mut self.buffer,
        }
    }

    /// Bytes waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of complete lines drained from a [`LineFramer`].
#[derive(Debug)]
pub struct Lines<'a> {
    buffer: &'a mut BytesMut,
}

impl Iterator for Lines<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line = self.buffer.split_to(pos).freeze();
        self.buffer.advance(1); // newline
        Some(line)
    }
}

/// Decode one line into a message.
///
/// Invalid UTF-8 sequences are dropped rather than rejected, then the
/// result is trimmed. Returns `None` when nothing is left, so blank lines
/// produce no reply.
pub fn decode_message(line: &[u8]) -> Option<String> {
    let decoded: String = line.utf8_chunks().map(|chunk| chunk.valid()).collect();
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
