//! In-process SECC doubles: loopback listeners, a TLS echo peer, and
//! handoff-channel helpers.
//!
//! The doubles listen on `::1`. Loopback is not link-local, so the client
//! skips interface resolution and the tests run in any environment,
//! network interfaces or not.

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use evcc_transport::{SeccEndpoint, SessionEvent, SessionReceiver};
use rustls_pki_types::PrivatePkcs8KeyDer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Bind a loopback listener and the endpoint pointing at it.
pub async fn listener() -> (TcpListener, SeccEndpoint) {
    let listener = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, SeccEndpoint::new(Ipv6Addr::LOCALHOST, port))
}

/// An endpoint where nothing listens: the listener is bound for its port
/// and dropped again, so a connect attempt gets refused.
pub async fn refused_endpoint() -> SeccEndpoint {
    let (listener, endpoint) = listener().await;
    drop(listener);
    endpoint
}

/// Opt-in tracing for debugging a failing test: run with `RUST_LOG=trace`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Wait for the next handoff event, with a guard against hanging tests.
pub async fn next_event(rx: &mut SessionReceiver) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a handoff event")
        .expect("handoff channel closed")
}

/// Everything currently buffered on the handoff channel.
pub fn drain_events(rx: &mut SessionReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A self-signed server config for `::1` and a client config trusting
/// exactly that certificate.
pub fn tls_test_pair() -> (Arc<rustls::ServerConfig>, Arc<rustls::ClientConfig>) {
    let key = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::default();
    params.subject_alt_names = vec![rcgen::SanType::IpAddress(Ipv6Addr::LOCALHOST.into())];
    let cert = params.self_signed(&key).unwrap();

    let cert_der = cert.der().clone();
    let key_der = PrivatePkcs8KeyDer::from(key.serialize_der());

    let server = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der.clone()], key_der.into())
        .unwrap();

    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert_der).unwrap();
    let client = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    (Arc::new(server), Arc::new(client))
}

/// Accept one TLS connection and echo whatever arrives until EOF.
pub fn spawn_tls_echo(
    listener: TcpListener,
    config: Arc<rustls::ServerConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let acceptor = tokio_rustls::TlsAcceptor::from(config);
        let (tcp, _) = listener.accept().await.unwrap();
        let Ok(mut tls) = acceptor.accept(tcp).await else {
            // Handshake-failure tests land here; nothing to echo.
            return;
        };
        let mut buf = [0u8; 1024];
        loop {
            let n = match tls.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if tls.write_all(&buf[..n]).await.is_err() {
                break;
            }
            let _ = tls.flush().await;
        }
    })
}
