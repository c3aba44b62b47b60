//! Per-connection state machine.
//!
//! A session drives one stream connection from the welcome line through
//! any number of question/answer exchanges until it closes:
//!
//! ```text
//! Greeting -> AwaitingMessage <-> Processing
//!                   |                 |
//!                   +---> Closed <----+
//! ```
//!
//! Every failure (read error, write error, peer hang-up) ends in `Closed`
//! and is reported through [`CloseReason`]. Nothing propagates to the
//! acceptor, so one broken client cannot affect the others.

use crate::answer::{is_goodbye, AnswerEngine};
use crate::framer::{decode_message, LineFramer};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Largest chunk taken from the stream per read.
const READ_CHUNK: usize = 1024;

/// Sent unsolicited as soon as the session starts.
pub const WELCOME: &[u8] = b"Welcome to Synyi Voron, your European capitals TCP based chat bot.\n";

/// Session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Sending the welcome line.
    Greeting,
    /// Waiting for the next chunk of bytes.
    AwaitingMessage,
    /// Answering the messages extracted from the last read.
    Processing,
    /// Terminal. The stream has been released.
    Closed(CloseReason),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side of the stream.
    PeerClosed,
    /// A goodbye reply was sent.
    Goodbye,
    ReadFailed,
    WriteFailed,
    /// More than the configured maximum arrived without a newline.
    LineTooLong,
}

/// One client conversation over any byte stream.
pub struct Session<S> {
    stream: S,
    engine: Arc<AnswerEngine>,
    framer: LineFramer,
    /// Decoded messages from the last read, not yet answered.
    pending: VecDeque<String>,
    state: SessionState,
    max_line_length: usize,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, engine: Arc<AnswerEngine>) -> Self {
        Self {
            stream,
            engine,
            framer: LineFramer::new(),
            pending: VecDeque::new(),
            state: SessionState::Greeting,
            max_line_length: 0,
        }
    }

    /// Close the session if a line grows past `limit` bytes (0 = no limit).
    pub fn max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// Run the conversation to completion.
    pub async fn run(mut self) -> CloseReason {
        loop {
            self.state = match self.state {
                SessionState::Greeting => self.greet().await,
                SessionState::AwaitingMessage => self.await_message().await,
                SessionState::Processing => self.process().await,
                SessionState::Closed(reason) => {
                    self.close().await;
                    return reason;
                }
            };
        }
    }

    async fn greet(&mut self) -> SessionState {
        // Best effort: a client that never reads the greeting can still talk.
        if let Err(e) = self.stream.write_all(WELCOME).await {
            debug!(error = %e, "Failed to send greeting");
        }
        SessionState::AwaitingMessage
    }

    async fn await_message(&mut self) -> SessionState {
        if self.max_line_length > 0 && self.framer.pending_len() > self.max_line_length {
            debug!(pending = self.framer.pending_len(), "Line exceeds limit");
            return SessionState::Closed(CloseReason::LineTooLong);
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk).await {
            Ok(0) => {
                trace!("Connection closed by client");
                SessionState::Closed(CloseReason::PeerClosed)
            }
            Ok(n) => {
                trace!(bytes = n, "Read chunk");
                self.framer.feed(&chunk[..n]);
                let messages = self
                    .framer
                    .extract_messages()
                    .filter_map(|line| decode_message(&line));
                self.pending.extend(messages);

                if self.pending.is_empty() {
                    SessionState::AwaitingMessage
                } else {
                    SessionState::Processing
                }
            }
            Err(e) => {
                debug!(error = %e, "Read failed");
                SessionState::Closed(CloseReason::ReadFailed)
            }
        }
    }

    async fn process(&mut self) -> SessionState {
        while let Some(message) = self.pending.pop_front() {
            let response = self.engine.answer(&message);
            trace!(%message, response, "Answering");

            let mut reply = String::with_capacity(response.len() + 1);
            reply.push_str(response);
            reply.push('\n');

            if let Err(e) = self.write_reply(reply.as_bytes()).await {
                debug!(error = %e, "Write failed");
                return SessionState::Closed(CloseReason::WriteFailed);
            }

            if is_goodbye(response) {
                // Anything pipelined after the goodbye is dropped.
                return SessionState::Closed(CloseReason::Goodbye);
            }
        }
        SessionState::AwaitingMessage
    }

    async fn write_reply(&mut self, reply: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(reply).await?;
        self.stream.flush().await
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            trace!(error = %e, "Shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    fn engine() -> Arc<AnswerEngine> {
        Arc::new(AnswerEngine::new())
    }

    fn reply(engine: &AnswerEngine, query: &str) -> Vec<u8> {
        format!("{}\n", engine.answer(query)).into_bytes()
    }

    #[tokio::test]
    async fn test_greeting_then_peer_close() {
        let stream = Builder::new().write(WELCOME).build();
        let reason = Session::new(stream, engine()).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_question_and_answer() {
        let engine = engine();
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"capital of france\n")
            .write(&reply(&engine, "capital of france"))
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_split_and_coalesced_reads() {
        let engine = engine();
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"capital of ")
            .read(b"spain\nhel")
            .write(&reply(&engine, "capital of spain"))
            .read(b"lo\n\n   \ncapital of mars\n")
            .write(&reply(&engine, "hello"))
            .write(&reply(&engine, "capital of mars"))
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_goodbye_discards_pipelined_input() {
        let engine = engine();
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"hi\nbye\ncapital of italy\n")
            .write(&reply(&engine, "hi"))
            .write(b"Bye!\n")
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::Goodbye);
    }

    #[tokio::test]
    async fn test_greeting_failure_is_not_fatal() {
        let engine = engine();
        let stream = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .read(b"hello\n")
            .write(&reply(&engine, "hello"))
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_read_error_closes() {
        let stream = Builder::new()
            .write(WELCOME)
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let reason = Session::new(stream, engine()).run().await;
        assert_eq!(reason, CloseReason::ReadFailed);
    }

    #[tokio::test]
    async fn test_write_error_closes() {
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"capital of poland\nhello\n")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();

        let reason = Session::new(stream, engine()).run().await;
        assert_eq!(reason, CloseReason::WriteFailed);
    }

    #[tokio::test]
    async fn test_partial_line_at_close_is_dropped() {
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"capital of france")
            .build();

        let reason = Session::new(stream, engine()).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_answered() {
        let engine = engine();
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"capital\xff of germany\n")
            .write(&reply(&engine, "capital of germany"))
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_long_line_is_buffered_across_reads() {
        let engine = engine();
        let mut line = vec![b'a'; 70_000];
        line.extend_from_slice(b" capital of france\n");

        let stream = Builder::new()
            .write(WELCOME)
            .read(&line)
            .write(&reply(&engine, "capital of france"))
            .build();

        let reason = Session::new(stream, engine).run().await;
        assert_eq!(reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let stream = Builder::new()
            .write(WELCOME)
            .read(b"0123456789abcdef")
            .build();

        let reason = Session::new(stream, engine())
            .max_line_length(8)
            .run()
            .await;
        assert_eq!(reason, CloseReason::LineTooLong);
    }
}
