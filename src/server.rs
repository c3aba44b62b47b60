//! TCP acceptor for the chat protocol.
//!
//! Owns the listening socket, accepts connections forever and hands each
//! one to its own [`Session`] task. The accept loop never waits on a
//! session, so new clients are admitted while others are mid-conversation.

use crate::answer::AnswerEngine;
use crate::config::Config;
use crate::error::ServerError;
use crate::session::Session;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Listen backlog for the stream socket
const LISTEN_BACKLOG: i32 = 1024;

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Bound TCP server, ready to accept.
pub struct TcpServer {
    listener: TcpListener,
    engine: Arc<AnswerEngine>,
    /// `None` when connections are unbounded.
    connection_limit: Option<Arc<Semaphore>>,
    max_line_length: usize,
}

impl TcpServer {
    /// Bind the listening socket. A bind failure is returned, never retried.
    pub async fn bind(config: &Config, engine: Arc<AnswerEngine>) -> Result<Self, ServerError> {
        let addr = resolve_addr(config).await?;
        let listener = create_listener(addr).map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let connection_limit = match config.max_connections {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Ok(TcpServer {
            listener,
            engine,
            connection_limit,
            max_line_length: config.max_line_length,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr().map_err(ServerError::Accept)?,
            max_connections = ?self.connection_limit.as_ref().map(|s| s.available_permits()),
            "Server listening"
        );

        loop {
            // Wait for a connection slot
            let permit = match &self.connection_limit {
                Some(limit) => Some(
                    Arc::clone(limit)
                        .acquire_owned()
                        .await
                        .map_err(|e| ServerError::Accept(io::Error::other(e)))?,
                ),
                None => None,
            };

            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");

                    let session = Session::new(stream, Arc::clone(&self.engine))
                        .max_line_length(self.max_line_length);

                    tokio::spawn(async move {
                        let reason = session.run().await;
                        debug!(peer = %peer, ?reason, "Connection closed");
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

/// Bind and serve on the configured address.
pub async fn serve(config: &Config, engine: Arc<AnswerEngine>) -> Result<(), ServerError> {
    TcpServer::bind(config, engine).await?.run().await
}

/// Resolve the configured host and port to one socket address.
pub(crate) async fn resolve_addr(config: &Config) -> Result<SocketAddr, ServerError> {
    tokio::net::lookup_host((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Resolve {
            addr: config.address(),
            source,
        })?
        .next()
        .ok_or_else(|| ServerError::InvalidAddress(config.address()))
}

fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    // Quick restart; an actively listening port still refuses the bind.
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    TcpListener::from_std(socket.into())
}
