use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use thiserror::Error;

use super::message::{Framing, Message};
use crate::{algo::Trajectory, config::StreamerConfig};

/// How often blocking waits wake up to check for cancellation and deadlines
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Size of the buffer the acknowledgement is read into
const ACK_BUFFER: usize = 4096;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("no client connected within {0:?}")]
    AcceptTimeout(Duration),

    #[error("session cancelled")]
    Cancelled,

    #[error("client did not acknowledge within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("client closed the connection during the handshake")]
    ConnectionClosed,

    #[error("unexpected handshake acknowledgement {0:?}")]
    UnexpectedAck(String),

    #[error("connection lost after {sent} messages: {source}")]
    ConnectionLost {
        sent: usize,
        #[source]
        source: io::Error,
    },

    #[error("the streamer has already served its session")]
    AlreadyServed,
}

/// Progress of a replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    HandshakeSent,
    Streaming,
    Done,
    Failed,
}

/// Cooperative cancellation for a running session, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub peer: SocketAddr,
    /// Number of movement messages sent, excluding the terminator
    pub moves_sent: usize,
}

/// Streams a [`Trajectory`] to exactly one client
///
/// The session runs `R?` → `R` → `M {col} {row}`... → `E`. Anything other than `R` in
/// reply to the query ends the session with [`SessionError::UnexpectedAck`] before any
/// movement is sent. A streamer serves one session in its lifetime.
pub struct ReplayStreamer {
    listener: TcpListener,
    config: StreamerConfig,
    state: SessionState,
    cancel: CancelToken,
}

impl ReplayStreamer {
    /// Bind the listening socket at `config.addr`
    pub fn bind(config: StreamerConfig) -> Result<Self, SessionError> {
        let listener = TcpListener::bind(config.addr)?;
        Ok(Self {
            listener,
            config,
            state: SessionState::Listening,
            cancel: CancelToken::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// A handle that aborts the session at its next wait point
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for a client, complete the handshake and stream every position of `trajectory`
    pub fn serve(&mut self, trajectory: Trajectory) -> Result<SessionSummary, SessionError> {
        if self.state != SessionState::Listening {
            return Err(SessionError::AlreadyServed);
        }

        let result = self.run(trajectory);
        match &result {
            Ok(summary) => {
                self.state = SessionState::Done;
                info!("Finished streaming {} moves to {}", summary.moves_sent, summary.peer);
            }
            Err(e) => {
                self.state = SessionState::Failed;
                error!("Replay session failed: {e}");
            }
        }
        result
    }

    fn run(&mut self, trajectory: Trajectory) -> Result<SessionSummary, SessionError> {
        let (mut stream, peer) = self.accept()?;
        stream.set_write_timeout(self.config.write_timeout)?;

        self.handshake(&mut stream)?;

        self.state = SessionState::Streaming;
        info!("Streaming {} moves to {peer}", trajectory.len());
        let framing = self.config.framing;
        let mut sent = 0;
        for pos in trajectory {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            send(&mut stream, framing, &Message::movement(pos))
                .map_err(|source| SessionError::ConnectionLost { sent, source })?;
            debug!("Sent {pos:?}");
            sent += 1;
            thread::sleep(self.config.pace);
        }
        send(&mut stream, framing, &Message::End)
            .map_err(|source| SessionError::ConnectionLost { sent, source })?;

        Ok(SessionSummary {
            peer,
            moves_sent: sent,
        })
    }

    fn accept(&mut self) -> Result<(TcpStream, SocketAddr), SessionError> {
        info!("Waiting for a client on {}", self.local_addr()?);
        self.listener.set_nonblocking(true)?;
        let deadline = self.config.accept_timeout.map(|t| (Instant::now() + t, t));

        loop {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("Client connected from {peer}");
                    stream.set_nonblocking(false)?;
                    return Ok((stream, peer));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if let Some((at, timeout)) = deadline {
                        if Instant::now() >= at {
                            return Err(SessionError::AcceptTimeout(timeout));
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn handshake(&mut self, stream: &mut TcpStream) -> Result<(), SessionError> {
        send(stream, self.config.framing, &Message::Query)?;
        self.state = SessionState::HandshakeSent;

        stream.set_read_timeout(Some(POLL_INTERVAL))?;
        let deadline = self
            .config
            .handshake_timeout
            .map(|t| (Instant::now() + t, t));
        let mut buf = [0u8; ACK_BUFFER];

        let n = loop {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            match stream.read(&mut buf) {
                Ok(0) => return Err(SessionError::ConnectionClosed),
                Ok(n) => break n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    if let Some((at, timeout)) = deadline {
                        if Instant::now() >= at {
                            return Err(SessionError::HandshakeTimeout(timeout));
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };
        stream.set_read_timeout(None)?;

        let ack = String::from_utf8_lossy(&buf[..n]);
        let ack = ack.trim();
        match ack.parse() {
            Ok(Message::Ready) => {
                debug!("Client is ready");
                Ok(())
            }
            _ => {
                warn!("Closing connection after acknowledgement {ack:?}");
                Err(SessionError::UnexpectedAck(ack.to_string()))
            }
        }
    }
}

fn send(stream: &mut TcpStream, framing: Framing, message: &Message) -> io::Result<()> {
    stream.write_all(&framing.encode(message))?;
    stream.flush()
}
