//! Datagram responder.
//!
//! Each datagram is already a complete message, so there is no framing and
//! no per-client state: decode, answer, reply to the sender. Lost or
//! failed datagrams are logged and forgotten.

use crate::answer::AnswerEngine;
use crate::config::Config;
use crate::error::ServerError;
use crate::framer::decode_message;
use crate::server::resolve_addr;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

/// Largest datagram read; longer ones are truncated by the socket.
pub const DATAGRAM_SIZE: usize = 2048;

/// Bound UDP socket answering one reply per datagram.
pub struct UdpResponder {
    socket: UdpSocket,
    engine: Arc<AnswerEngine>,
}

impl UdpResponder {
    pub async fn bind(config: &Config, engine: Arc<AnswerEngine>) -> Result<Self, ServerError> {
        let addr = resolve_addr(config).await?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(UdpResponder { socket, engine })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answer datagrams until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr().map_err(ServerError::Accept)?,
            "Responder listening"
        );

        let mut buf = vec![0u8; DATAGRAM_SIZE];
        loop {
            let (n, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "Failed to receive datagram");
                    continue;
                }
            };

            let message = decode_message(&buf[..n]).unwrap_or_default();
            let response = self.engine.answer(&message);
            trace!(peer = %peer, %message, response, "Answering datagram");

            let reply = format!("{response}\n");
            if let Err(e) = self.socket.send_to(reply.as_bytes(), peer).await {
                warn!(peer = %peer, error = %e, "Failed to send reply");
            }
        }
    }
}

/// Bind and serve datagrams on the configured address.
pub async fn serve(config: &Config, engine: Arc<AnswerEngine>) -> Result<(), ServerError> {
    UdpResponder::bind(config, engine).await?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::UNKNOWN_QUERY;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn start() -> SocketAddr {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Config::default()
        };
        let responder = UdpResponder::bind(&config, Arc::new(AnswerEngine::new()))
            .await
            .unwrap();
        let addr = responder.local_addr().unwrap();
        tokio::spawn(responder.run());
        addr
    }

    async fn ask(socket: &UdpSocket, server: SocketAddr, query: &[u8]) -> String {
        socket.send_to(query, server).await.unwrap();
        let mut buf = [0u8; DATAGRAM_SIZE];
        let (n, from) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from, server);
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_one_reply_per_datagram() {
        let server = start().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let reply = ask(&client, server, b"capital of france").await;
        assert!(reply.contains("Paris"));
        assert!(reply.ends_with('\n'));

        let reply = ask(&client, server, b"  Capital  OF   France!!\n").await;
        assert!(reply.contains("Paris"));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_datagrams() {
        let server = start().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let reply = ask(&client, server, b"capital of mars").await;
        assert_eq!(reply, format!("{UNKNOWN_QUERY}\n"));

        let reply = ask(&client, server, b"").await;
        assert_eq!(reply, format!("{UNKNOWN_QUERY}\n"));
    }

    #[tokio::test]
    async fn test_bye_is_just_a_reply() {
        let server = start().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        assert_eq!(ask(&client, server, b"bye").await, "Bye!\n");
        // No connection to close: the responder keeps answering.
        assert!(ask(&client, server, b"hi").await.starts_with("Hi!"));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let server = start().await;
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: server.port(),
            ..Config::default()
        };
        let result = UdpResponder::bind(&config, Arc::new(AnswerEngine::new())).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
