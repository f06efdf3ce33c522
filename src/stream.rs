//! The SECC-facing byte stream: plain TCP or TLS over TCP.
//!
//! Send and receive logic elsewhere in the crate is written once against
//! [`SeccStream`]; whether the bytes cross a TLS session is decided here,
//! at connect time, and nowhere else.

use std::io;
use std::net::{IpAddr, SocketAddr, SocketAddrV6};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::error::{Error, Result};
use crate::util::v6_tcp_socket;

/// An established stream to the SECC.
#[derive(Debug)]
pub enum SeccStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// Open a stream to `peer`, optionally bound to `local` (the resolved
/// interface's own link-local address) and optionally TLS-wrapped.
///
/// The zone travels as the `scope_id` inside both socket addresses. The
/// TLS handshake, when configured, completes before this returns: a
/// `Connected` report never precedes a working record layer.
pub(crate) async fn connect(
    peer: SocketAddrV6,
    local: Option<SocketAddrV6>,
    tls: Option<&Arc<rustls::ClientConfig>>,
) -> Result<SeccStream> {
    let socket = v6_tcp_socket(local).map_err(|source| Error::Connection { peer, source })?;

    let tcp = socket
        .connect(SocketAddr::V6(peer))
        .await
        .map_err(|source| classify_connect(peer, source))?;

    // V2G exchanges are small request/response messages; don't batch them.
    let _ = tcp.set_nodelay(true);

    match tls {
        None => Ok(SeccStream::Plain(tcp)),
        Some(context) => {
            let connector = TlsConnector::from(context.clone());
            // The SECC is addressed by IP literal; there is no hostname to
            // put in SNI. The zone is local routing detail, not identity,
            // so the unscoped address is what gets verified.
            let server_name = ServerName::from(IpAddr::V6(*peer.ip()));
            let stream = connector
                .connect(server_name, tcp)
                .await
                .map_err(|source| Error::Connection { peer, source })?;
            tracing::debug!(v2g.peer = %peer, "TLS handshake complete");
            Ok(SeccStream::Tls(Box::new(stream)))
        }
    }
}

/// Refusal is the one connect failure the session logic treats
/// differently (the SECC is up but not listening yet); everything else is
/// a generic connection error with the cause attached.
fn classify_connect(peer: SocketAddrV6, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::ConnectionRefused {
        Error::ConnectionRefused { peer, source }
    } else {
        Error::Connection { peer, source }
    }
}

impl AsyncRead for SeccStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SeccStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            SeccStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SeccStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SeccStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            SeccStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SeccStream::Plain(s) => Pin::new(s).poll_flush(cx),
            SeccStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SeccStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            SeccStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
