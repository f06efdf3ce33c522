//! Async transport establishment for the EV side of an ISO 15118 session.
//!
//! An EVCC (the vehicle's communication controller) reaches its SECC (the
//! charging station's) over IPv6 link-local addressing, which is ambiguous
//! without a zone: the crate resolves the local interface whose scope id
//! disambiguates the peer, opens the stream (plain TCP or TLS, chosen at
//! construction from an opaque, caller-provided context) and bridges it
//! into two asynchronous channels: an inbound queue of received chunks and
//! a handoff channel of lifecycle events for the owning session logic.
//!
//! What this crate is *not*: it does not interpret V2G messages, frame
//! them, provision certificates, or run the session state machine. It
//! establishes a transport, keeps it until either side ends it, and
//! reports what happened exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use evcc_transport::{SeccClient, SeccEndpoint, TransportConfig, session_channel};
//!
//! # async fn example() -> evcc_transport::Result<()> {
//! let (events, mut lifecycle) = session_channel();
//!
//! let endpoint = SeccEndpoint::new("fe80::1ac0:4dff:fe02:1b4d".parse().unwrap(), 61341);
//! let config = TransportConfig::plain().with_interface("eth0");
//!
//! let mut client = SeccClient::create(endpoint, config, events).await?;
//! client.send(b"\x01\xfe\x80\x01\x00\x00\x00\x02\x10\x00").await?;
//!
//! while let Some(chunk) = client.recv().await {
//!     println!("{} bytes from the SECC", chunk.len());
//! }
//!
//! client.close().await;
//! while let Some(event) = lifecycle.recv().await {
//!     println!("lifecycle: {event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod iface;
pub mod prelude;
pub mod queue;
pub mod stream;

mod util;

pub use client::{ConnectionState, SeccClient};
pub use config::{SeccEndpoint, TransportConfig};
pub use error::{Error, Result};
pub use event::{SessionEvent, SessionReceiver, SessionSender, session_channel};
pub use queue::InboundQueue;
pub use stream::SeccStream;
