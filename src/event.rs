//! Session handoff channel.
//!
//! The transport reports lifecycle changes to the owning session logic
//! through an unbounded channel the caller creates and keeps the receive
//! side of. The transport only ever produces into it. Each client emits at
//! most one terminal event (`Disconnected`, `ConnectionRefused` or
//! `ConnectionError`); the state machine in [`crate::client`] guards that.

use std::net::SocketAddrV6;

use tokio::sync::mpsc;

/// A transport lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transport is established (TLS handshake included, if configured).
    Connected { peer: SocketAddrV6 },
    /// The transport ended: the peer closed the stream, a post-connect I/O
    /// write failed, or the caller closed the client.
    Disconnected,
    /// The peer actively refused the connection.
    ConnectionRefused { peer: SocketAddrV6 },
    /// Connection establishment or the receive loop failed for any other
    /// reason. The message is the rendered underlying cause.
    ConnectionError { peer: SocketAddrV6, message: String },
}

impl SessionEvent {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected => "disconnected",
            Self::ConnectionRefused { .. } => "connection_refused",
            Self::ConnectionError { .. } => "connection_error",
        }
    }
}

/// Producing side of the handoff channel, held by the transport.
pub type SessionSender = mpsc::UnboundedSender<SessionEvent>;

/// Consuming side of the handoff channel, held by the session logic.
pub type SessionReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the handoff channel. The receiver stays with the caller; the
/// sender goes into [`SeccClient::create`](crate::SeccClient::create).
pub fn session_channel() -> (SessionSender, SessionReceiver) {
    mpsc::unbounded_channel()
}
