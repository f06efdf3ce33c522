//! Error types for evcc-transport.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.

use std::io;
use std::net::SocketAddrV6;

use crate::client::ConnectionState;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Library error type.
///
/// Connect-time failures are classified as either [`Error::ConnectionRefused`]
/// (the peer actively rejected the connection) or [`Error::Connection`]
/// (anything else: no route, handshake failure, reset during establishment).
/// The owning session logic drives its retry policy off that distinction;
/// this crate never retries on its own.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No local interface carries a usable link-local IPv6 address.
    #[error("no interface with a usable link-local IPv6 address")]
    NoInterfaceFound,

    /// An interface hint was supplied but matches no local interface.
    #[error("interface hint {hint:?} does not match any interface with a link-local IPv6 address")]
    InterfaceHintInvalid { hint: Box<str> },

    /// Enumerating local interfaces failed at the OS level.
    #[error("failed to enumerate network interfaces: {source}")]
    Enumerate {
        #[source]
        source: io::Error,
    },

    /// The TLS flag and the TLS context disagree.
    #[error("TLS configuration mismatch: {reason}")]
    TlsConfig { reason: &'static str },

    /// The peer actively refused the connection.
    #[error("connection refused by {peer}")]
    ConnectionRefused {
        peer: SocketAddrV6,
        #[source]
        source: io::Error,
    },

    /// Connection establishment failed for any reason other than refusal.
    #[error("failed to connect to {peer}: {source}")]
    Connection {
        peer: SocketAddrV6,
        #[source]
        source: io::Error,
    },

    /// An operation that requires a connected transport was called in
    /// another state.
    #[error("transport is {state}, not connected")]
    NotConnected { state: ConnectionState },

    /// Writing to the established stream failed.
    #[error("write to peer failed: {source}")]
    Write {
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an interface-hint error from the hint that failed to match.
    pub fn interface_hint_invalid(hint: impl Into<Box<str>>) -> Self {
        Self::InterfaceHintInvalid { hint: hint.into() }
    }

    /// Get the peer address if this error has one.
    pub fn peer(&self) -> Option<SocketAddrV6> {
        match self {
            Self::ConnectionRefused { peer, .. } => Some(*peer),
            Self::Connection { peer, .. } => Some(*peer),
            _ => None,
        }
    }
}
