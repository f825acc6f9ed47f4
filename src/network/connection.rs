//! Connection - the bot's single link to the IRC server.
//!
//! One task owns the socket and runs a `tokio::select!` loop over three
//! sources:
//!
//! ```text
//!   socket lines ──▶ PING? answer directly : hand to the bot
//!   outbox queue ──▶ write to socket
//!   shutdown     ──▶ flush queue, QUIT, return
//! ```
//!
//! The bot callback must not block; it spawns the dispatch and returns.

use super::codec::LineCodec;
use crate::error::ConnectionError;
use frank_proto::Message;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Lines starting like this carry the nickserv password and are not logged in full.
const IDENTIFY: &str = "privmsg nickserv :identify";

pub struct Connection<S = TcpStream> {
    framed: Framed<S, LineCodec>,
}

impl Connection<TcpStream> {
    /// Open a plain TCP connection to `server` (`host:port`).
    pub async fn connect(server: &str) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(server).await?;
        stream.set_nodelay(true)?;
        info!(server = %server, "Connected");
        Ok(Self::new(stream))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }

    async fn write(&mut self, line: String) -> Result<(), ConnectionError> {
        if line.to_ascii_lowercase().starts_with(IDENTIFY) {
            debug!(">>> {IDENTIFY} ***");
        } else {
            debug!(">>> {line}");
        }
        self.framed.send(line).await?;
        Ok(())
    }

    /// Send NICK and USER.
    pub async fn register(&mut self, nick: &str, realname: &str) -> Result<(), ConnectionError> {
        self.write(Message::nick_change(nick).to_string()).await?;
        self.write(Message::user(nick, realname).to_string()).await
    }

    /// Pump lines until the server hangs up or shutdown is signalled.
    ///
    /// Every parsed line except PING goes to `on_message`.
    pub async fn run<F>(
        mut self,
        mut outbound: mpsc::UnboundedReceiver<String>,
        mut shutdown: broadcast::Receiver<()>,
        mut on_message: F,
    ) -> Result<(), ConnectionError>
    where
        F: FnMut(Message),
    {
        loop {
            tokio::select! {
                incoming = self.framed.next() => {
                    let line = match incoming {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(ConnectionError::Closed),
                    };
                    debug!("<<< {line}");
                    let msg = match line.parse::<Message>() {
                        Ok(msg) => msg,
                        Err(e) => {
                            warn!(error = %e, line = %line, "Dropping unparsable line");
                            continue;
                        }
                    };
                    if msg.is("PING") {
                        let token = msg.trailing.clone().or_else(|| msg.target().map(str::to_string));
                        self.write(Message::pong(token.unwrap_or_default()).to_string()).await?;
                        continue;
                    }
                    on_message(msg);
                }
                queued = outbound.recv() => {
                    match queued {
                        Some(line) => self.write(line).await?,
                        None => {
                            info!("Outbox closed, stopping connection");
                            return Ok(());
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down connection");
                    while let Ok(line) = outbound.try_recv() {
                        self.write(line).await?;
                    }
                    self.write("QUIT".to_string()).await?;
                    return Ok(());
                }
            }
        }
    }
}
