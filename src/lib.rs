//! capitals-chat: a question-answering chat bot about EU capitals.
//!
//! The bot is reachable over two transports:
//! - TCP: newline-delimited text, one long-lived session per connection
//! - UDP: one datagram per question, one datagram per answer
//!
//! Modules, leaves first:
//! - `answer`: normalization and the fixed lookup table
//! - `framer`: recovers lines from a TCP byte stream
//! - `session`: per-connection state machine
//! - `server`: TCP acceptor spawning one session task per connection
//! - `udp`: stateless datagram responder
//! - `client`: console clients for both transports
//! - `config`: CLI arguments merged over an optional TOML file

pub mod answer;
pub mod client;
pub mod config;
pub mod error;
pub mod framer;
pub mod server;
pub mod session;
pub mod udp;

pub use answer::AnswerEngine;
pub use config::{Config, TransportType};
pub use error::{ClientError, ServerError};
