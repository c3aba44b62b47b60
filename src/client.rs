//! Line-oriented console clients for both transports.
//!
//! The clients read one query per input line, send it, and print the
//! reply. Input and output are generic async handles so the loops run the
//! same against a terminal or an in-memory buffer.

use crate::answer::is_goodbye;
use crate::config::TransportType;
use crate::error::ClientError;
use crate::session::WELCOME;
use crate::udp::DATAGRAM_SIZE;
use clap::Parser;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// How long the TCP client waits for the unsolicited greeting.
const GREETING_WAIT: Duration = Duration::from_millis(200);

const TCP_HELP: &str = "Type your message in the format 'capital of ...' and press Enter. 'bye' to exit.\n";
const UDP_HELP: &str = "Type your message in the format 'capital of ...' and press Enter. 'bye' to get a goodbye. Ctrl+C to exit.\n";
const SERVER_CLOSED: &str = "Server closed connection.\n";
const NO_REPLY: &str = "[UDP] No reply we lost your reply. Try again.\n";

/// Command-line arguments for the chat client
#[derive(Parser, Debug)]
#[command(name = "capitals-chat-client")]
#[command(version)]
#[command(about = "Console client for the EU capitals chat bot", long_about = None)]
pub struct ClientArgs {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short, long, default_value_t = 12000)]
    pub port: u16,

    /// Transport to use
    #[arg(short, long, value_enum, default_value_t = TransportType::Tcp)]
    pub transport: TransportType,

    /// Seconds to wait for a UDP reply
    #[arg(long, default_value_t = 2.0)]
    pub timeout: f64,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl ClientArgs {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reply_timeout(&self) -> Result<Duration, ClientError> {
        Duration::try_from_secs_f64(self.timeout)
            .map_err(|_| ClientError::InvalidTimeout(self.timeout))
    }
}

/// Run the client selected by `args` against stdin and stdout.
pub async fn run(args: &ClientArgs) -> Result<(), ClientError> {
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    match args.transport {
        TransportType::Tcp => run_tcp(&args.address(), input, &mut output).await,
        TransportType::Udp => {
            run_udp(&args.address(), args.reply_timeout()?, input, &mut output).await
        }
    }
}

/// Stream client: one reply line per sent line, stop on goodbye or close.
pub async fn run_tcp<R, W>(addr: &str, input: R, output: &mut W) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    debug!(peer = addr, "Connected");

    let (reader, mut writer) = stream.into_split();
    let mut replies = BufReader::new(reader);
    let mut reply = String::new();

    // Only wait for the first bytes of the greeting: `fill_buf` is cancel
    // safe, so nothing is consumed when the wait times out.
    let mut greeted = false;
    let greeting_started = matches!(
        timeout(GREETING_WAIT, replies.fill_buf()).await,
        Ok(Ok(buf)) if !buf.is_empty()
    );
    if greeting_started && replies.read_line(&mut reply).await? > 0 {
        output.write_all(reply.as_bytes()).await?;
        greeted = true;
    }
    output.write_all(TCP_HELP.as_bytes()).await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(message) = lines.next_line().await? {
        // The server answers nothing for a blank line.
        if message.trim().is_empty() {
            continue;
        }

        writer.write_all(format!("{message}\n").as_bytes()).await?;

        let closed = loop {
            reply.clear();
            if replies.read_line(&mut reply).await? == 0 {
                break true;
            }
            // A greeting that missed the wait comes before the first answer.
            if !greeted && reply.as_bytes() == WELCOME {
                output.write_all(reply.as_bytes()).await?;
                greeted = true;
                continue;
            }
            break false;
        };
        if closed {
            output.write_all(SERVER_CLOSED.as_bytes()).await?;
            break;
        }

        let text = reply.trim();
        output.write_all(format!("{text}\n").as_bytes()).await?;
        output.flush().await?;

        if is_goodbye(text) {
            break;
        }
    }

    output.flush().await?;
    Ok(())
}

/// Datagram client: one datagram per line, wait `reply_timeout` for each reply.
pub async fn run_udp<R, W>(
    addr: &str,
    reply_timeout: Duration,
    input: R,
    output: &mut W,
) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let server = tokio::net::lookup_host(addr)
        .await
        .map_err(|source| ClientError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))?;

    let local: SocketAddr = match server {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local).await?;
    let mut buf = vec![0u8; DATAGRAM_SIZE];

    output.write_all(UDP_HELP.as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        socket.send_to(line.trim().as_bytes(), server).await?;

        match timeout(reply_timeout, socket.recv_from(&mut buf)).await {
            Ok(received) => {
                let (n, _) = received?;
                let text = String::from_utf8_lossy(&buf[..n]);
                let text = text.trim();
                output.write_all(format!("{text}\n").as_bytes()).await?;
                if is_goodbye(text) {
                    break;
                }
            }
            Err(_) => {
                debug!(timeout = ?reply_timeout, "No reply");
                output.write_all(NO_REPLY.as_bytes()).await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
