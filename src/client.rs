//! Secure transport client: the EVCC's connection to the SECC.
//!
//! One client owns one connection attempt, its socket halves, and the
//! inbound queue. Lifecycle is an explicit state value, not a process-wide
//! flag:
//!
//! ```text
//! Uninitialized -> Connecting -> Connected -> Closed
//!                       |             |
//!                       +--> Failed <-+
//! ```
//!
//! `Closed` and `Failed` are terminal. Reaching either emits exactly one
//! terminal event on the session handoff channel, whether the trigger was
//! the peer (EOF, reset), an I/O failure, or the caller's `close()`.
//!
//! Establishment is separated from the receive loop on purpose: a failure
//! inside [`SeccClient::create`] means "never connected" and comes back
//! synchronously *and* on the handoff channel, while a failure after that
//! means "connection dropped" and is observable only through the channel
//! and the queue's end of stream. The session logic upstream recovers
//! differently from the two, and owns any retry or timeout policy; this
//! client never reconnects and never imposes a deadline of its own.

use std::fmt;
use std::net::SocketAddrV6;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{SeccEndpoint, TransportConfig};
use crate::error::{Error, Result};
use crate::event::{SessionEvent, SessionSender};
use crate::iface::{self, Zoned};
use crate::queue::{self, InboundQueue, InboundSender};
use crate::stream::{self, SeccStream};

/// Receive granularity of the background loop. V2G messages are small;
/// one read rarely fills this.
const RECV_CHUNK: usize = 8 * 1024;

/// Transport lifecycle state. Exactly one per client; transitions are
/// monotonic and [`Closed`](Self::Closed)/[`Failed`](Self::Failed) are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl ConnectionState {
    /// Whether any transition can still leave this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State and handoff channel shared between the client and its receive
/// loop task.
struct Shared {
    peer: SocketAddrV6,
    state: Mutex<ConnectionState>,
    events: SessionSender,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn advance(&self, next: ConnectionState) {
        *self.state.lock().unwrap() = next;
    }

    /// Move to a terminal state and emit its handoff event. The first
    /// terminal transition wins; later callers get `false` and emit
    /// nothing, which is what makes `close()` racing the receive loop (or
    /// being called twice) produce a single terminal event.
    fn finish(&self, next: ConnectionState, event: SessionEvent) -> bool {
        debug_assert!(next.is_terminal());
        {
            let mut state = self.state.lock().unwrap();
            if state.is_terminal() {
                return false;
            }
            *state = next;
        }
        tracing::debug!(
            v2g.peer = %self.peer,
            v2g.state = %next,
            v2g.event = event.name(),
            "terminal transition"
        );
        let _ = self.events.send(event);
        true
    }
}

/// Async client for the SECC's stream endpoint.
///
/// Created connected via [`create`](Self::create). The client exclusively
/// owns the socket halves and the inbound queue; the handoff channel is
/// the caller's, and the client only produces into it.
pub struct SeccClient {
    shared: Arc<Shared>,
    writer: Option<WriteHalf<SeccStream>>,
    inbound: Option<InboundQueue>,
    reader_task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    last_sent_len: Option<usize>,
}

impl SeccClient {
    /// Resolve the link-local zone, connect, and start the receive loop.
    ///
    /// Interface resolution runs when the host is link-local (a zone is
    /// mandatory there) or when a hint was supplied; a global or loopback
    /// IPv6 host connects unzoned. With TLS configured, the handshake
    /// completes before this returns.
    ///
    /// Failures come back synchronously *and* as one event on the handoff
    /// channel: [`Error::ConnectionRefused`] mirrors as
    /// [`SessionEvent::ConnectionRefused`], anything else connect-time as
    /// [`SessionEvent::ConnectionError`]. Resolution and configuration
    /// errors fail before any network activity and emit nothing.
    pub async fn create(
        endpoint: SeccEndpoint,
        config: TransportConfig,
        events: SessionSender,
    ) -> Result<SeccClient> {
        config.validate()?;

        let (peer, local) = if endpoint.is_link_local() || config.interface_hint.is_some() {
            let iface = iface::resolve(config.interface_hint.as_deref())?;
            tracing::debug!(
                v2g.peer = %Zoned { addr: endpoint.host, zone: &iface.name },
                v2g.port = endpoint.port,
                "using zoned peer address"
            );
            (
                endpoint.to_socket_addr(iface.index),
                Some(SocketAddrV6::new(iface.addr, 0, 0, iface.index)),
            )
        } else {
            (endpoint.to_socket_addr(0), None)
        };

        let shared = Arc::new(Shared {
            peer,
            state: Mutex::new(ConnectionState::Uninitialized),
            events,
        });

        shared.advance(ConnectionState::Connecting);
        tracing::debug!(v2g.peer = %peer, v2g.tls = config.use_tls, "connecting");

        let stream = match stream::connect(peer, local, config.tls.as_ref()).await {
            Ok(stream) => stream,
            Err(error) => {
                shared.finish(ConnectionState::Failed, connect_failure_event(peer, &error));
                return Err(error);
            }
        };

        shared.advance(ConnectionState::Connected);
        let _ = shared.events.send(SessionEvent::Connected { peer });
        tracing::info!(v2g.peer = %peer, v2g.tls = config.use_tls, "transport connected");

        let (reader, writer) = tokio::io::split(stream);
        let (inbound_tx, inbound) = queue::channel();
        let cancel = CancellationToken::new();
        let reader_task = tokio::spawn(receive_loop(
            reader,
            inbound_tx,
            shared.clone(),
            cancel.clone(),
        ));

        Ok(SeccClient {
            shared,
            writer: Some(writer),
            inbound: Some(inbound),
            reader_task: Some(reader_task),
            cancel,
            last_sent_len: None,
        })
    }

    /// Write and flush a message to the peer.
    ///
    /// Valid only while [`ConnectionState::Connected`]; any other state
    /// fails with [`Error::NotConnected`] without touching the stream. An
    /// I/O failure moves the client to `Failed`, emits one `Disconnected`
    /// event and returns [`Error::Write`].
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(Error::NotConnected { state });
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::NotConnected { state });
        };

        tracing::trace!(v2g.peer = %self.shared.peer, v2g.bytes = data.len(), "send");
        let result = async {
            writer.write_all(data).await?;
            writer.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                self.last_sent_len = Some(data.len());
                Ok(())
            }
            Err(source) => {
                tracing::warn!(v2g.peer = %self.shared.peer, error = %source, "write failed");
                self.shared
                    .finish(ConnectionState::Failed, SessionEvent::Disconnected);
                Err(Error::Write { source })
            }
        }
    }

    /// Wait for the next inbound chunk. `None` means end of stream, or
    /// that the queue was handed out via [`take_inbound`](Self::take_inbound).
    pub async fn recv(&mut self) -> Option<Bytes> {
        match self.inbound.as_mut() {
            Some(queue) => queue.pop().await,
            None => None,
        }
    }

    /// Move the inbound queue out of the client, so a dedicated consumer
    /// task can own it while the client stays with the sending side.
    pub fn take_inbound(&mut self) -> Option<InboundQueue> {
        self.inbound.take()
    }

    /// Release the transport.
    ///
    /// Stops the receive loop, shuts the stream down and waits for the
    /// read half to be dropped, so the socket is released on every exit
    /// path before this returns. Transitions to `Closed` unless the client
    /// already failed. Idempotent: repeat calls (and calls after the peer
    /// already ended the stream) do nothing and emit no further event.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(task) = self.reader_task.take() {
            let _ = task.await;
        }
        if self
            .shared
            .finish(ConnectionState::Closed, SessionEvent::Disconnected)
        {
            tracing::debug!(v2g.peer = %self.shared.peer, "transport closed");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// The (zoned) peer address this client connects to.
    pub fn peer(&self) -> SocketAddrV6 {
        self.shared.peer
    }

    /// Byte length of the last successful [`send`](Self::send), for the
    /// session logic's retransmission bookkeeping.
    pub fn last_sent_len(&self) -> Option<usize> {
        self.last_sent_len
    }
}

impl Drop for SeccClient {
    fn drop(&mut self) {
        // A client dropped without close() must still stop the receive
        // loop; the halves drop with it and the socket is released.
        self.cancel.cancel();
    }
}

impl fmt::Debug for SeccClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeccClient")
            .field("peer", &self.shared.peer)
            .field("state", &self.state())
            .finish()
    }
}

fn connect_failure_event(peer: SocketAddrV6, error: &Error) -> SessionEvent {
    match error {
        Error::ConnectionRefused { .. } => SessionEvent::ConnectionRefused { peer },
        _ => SessionEvent::ConnectionError {
            peer,
            message: error.to_string(),
        },
    }
}

/// Background task owning the read side of the stream exclusively.
///
/// Chunks go to the inbound queue in arrival order. EOF transitions to
/// `Closed` (graceful), a read error to `Failed`; either emits its event
/// exactly once. Dropping the queue sender on exit is what turns the
/// consumer's next `pop()` into end of stream.
async fn receive_loop(
    mut reader: ReadHalf<SeccStream>,
    inbound: InboundSender,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let mut buf = BytesMut::with_capacity(RECV_CHUNK);
    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_buf(&mut buf) => read,
        };
        match read {
            Ok(0) => {
                tracing::debug!(v2g.peer = %shared.peer, "peer closed the stream");
                shared.finish(ConnectionState::Closed, SessionEvent::Disconnected);
                break;
            }
            Ok(n) => {
                tracing::trace!(v2g.peer = %shared.peer, v2g.bytes = n, "inbound chunk");
                if !inbound.push(buf.split().freeze()) {
                    tracing::debug!(v2g.peer = %shared.peer, "consumer gone, stopping receive loop");
                    break;
                }
                buf.reserve(RECV_CHUNK);
            }
            Err(error) => {
                tracing::warn!(v2g.peer = %shared.peer, error = %error, "read failed");
                shared.finish(
                    ConnectionState::Failed,
                    SessionEvent::ConnectionError {
                        peer: shared.peer,
                        message: error.to_string(),
                    },
                );
                break;
            }
        }
    }
}
