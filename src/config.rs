//! Caller-supplied configuration: target endpoint and TLS choice.
//!
//! The TLS context is opaque here. Certificate provisioning and trust
//! decisions belong to the security subsystem; this crate only threads a
//! ready-made [`rustls::ClientConfig`] into the handshake.

use std::fmt;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;

use crate::error::{Error, Result};

/// The charging-station-side endpoint to connect to.
///
/// The host is an IPv6 literal; in a real charging session it is the
/// link-local address the SECC advertised during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeccEndpoint {
    pub host: Ipv6Addr,
    pub port: u16,
}

impl SeccEndpoint {
    pub fn new(host: Ipv6Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Whether the host needs a zone before it can be connected to.
    pub fn is_link_local(&self) -> bool {
        self.host.is_unicast_link_local()
    }

    pub(crate) fn to_socket_addr(self, scope_id: u32) -> SocketAddrV6 {
        SocketAddrV6::new(self.host, self.port, 0, scope_id)
    }
}

impl fmt::Display for SeccEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}", self.host, self.port)
    }
}

/// Transport-level configuration supplied by the session logic.
#[derive(Clone)]
pub struct TransportConfig {
    /// Negotiate TLS before reporting the transport as connected.
    pub use_tls: bool,
    /// Opaque TLS context from the security subsystem. Present iff
    /// `use_tls` is set; [`validate`](Self::validate) enforces this before
    /// any network activity.
    pub tls: Option<Arc<rustls::ClientConfig>>,
    /// Preferred interface name for link-local resolution.
    pub interface_hint: Option<String>,
}

impl TransportConfig {
    /// Plain TCP, no interface preference.
    pub fn plain() -> Self {
        Self {
            use_tls: false,
            tls: None,
            interface_hint: None,
        }
    }

    /// TLS with the given context.
    pub fn tls(context: Arc<rustls::ClientConfig>) -> Self {
        Self {
            use_tls: true,
            tls: Some(context),
            interface_hint: None,
        }
    }

    /// Prefer the named interface when resolving the link-local zone.
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interface_hint = Some(name.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match (self.use_tls, &self.tls) {
            (true, None) => Err(Error::TlsConfig {
                reason: "TLS enabled but no TLS context supplied",
            }),
            (false, Some(_)) => Err(Error::TlsConfig {
                reason: "TLS context supplied but TLS disabled",
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("use_tls", &self.use_tls)
            .field("tls", &self.tls.is_some())
            .field("interface_hint", &self.interface_hint)
            .finish()
    }
}
