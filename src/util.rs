//! Internal utilities.

use std::io;
use std::net::{SocketAddr, SocketAddrV6};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpSocket;

/// Create an IPv6 TCP socket, optionally bound to a local address.
///
/// Link-local traffic is IPv6-only territory, so `IPV6_V6ONLY` stays on.
/// Binding the resolved interface's own link-local address (scope id
/// included) pins the kernel's source-address selection to the interface
/// the zone names.
///
/// The socket is set non-blocking before it is handed to tokio.
pub(crate) fn v6_tcp_socket(bind: Option<SocketAddrV6>) -> io::Result<TcpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;

    socket.set_only_v6(true)?;
    socket.set_nonblocking(true)?;

    if let Some(addr) = bind {
        socket.bind(&SocketAddr::V6(addr).into())?;
    }

    Ok(TcpSocket::from_std_stream(socket.into()))
}
