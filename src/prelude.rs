//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use evcc_transport::prelude::*;
//! ```

pub use crate::client::{ConnectionState, SeccClient};
pub use crate::config::{SeccEndpoint, TransportConfig};
pub use crate::error::{Error, Result};
pub use crate::event::{SessionEvent, SessionReceiver, SessionSender, session_channel};
pub use crate::queue::InboundQueue;
