//! # wsengine - Server-side WebSocket Protocol Engine
//!
//! `wsengine` is the per-connection protocol core of an RFC 6455 WebSocket
//! server: everything that happens after the HTTP upgrade has completed.
//!
//! ## Features
//!
//! - **Full RFC 6455 server-side compliance** with strict validation
//!   (masking, RSV bits, control-frame constraints, close-code policy)
//! - **Message reassembly** with UTF-8 validation and bounded buffers
//! - **Compliant closing handshake** from either side
//! - **Heartbeat liveness**: idle peers are pinged, dead peers dropped
//! - **Single-task engine** - no locks; external callers are marshalled
//!   onto the connection's task through a cloneable handle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsengine::{Config, Connection, FramedChannel, UpgradeRequest};
//!
//! // after the HTTP upgrade completed on `stream`:
//! let channel = FramedChannel::new(stream, Config::new());
//! let request = UpgradeRequest::new("/chat")
//!     .with_header("Sec-WebSocket-Extensions", extensions_header);
//! let (connection, handle) = Connection::attach(channel, request, &service, Config::new());
//! tokio::spawn(connection.run());
//! ```

pub mod channel;
pub mod close;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod request;
pub mod service;

pub use channel::{Channel, FramedChannel};
pub use close::{CloseReason, DisconnectReason};
pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionHandle, ConnectionState, MessageState};
pub use error::{Error, Result};
pub use protocol::{Frame, OpCode};
pub use request::UpgradeRequest;
pub use service::Service;
