//! Per-connection engine: state machine, reassembly, close orchestration,
//! and heartbeats.
//!
//! ## Connection Lifecycle
//!
//! 1. **Open** - Attached to its channel after a successful upgrade
//! 2. **Closing** - Close frame sent or received, handshake in progress
//! 3. **Closed** - Channel inactive; `disconnected` has fired exactly once
//!
//! ## Example
//!
//! ```rust,ignore
//! use wsengine::{Config, Connection, FramedChannel, UpgradeRequest};
//!
//! let channel = FramedChannel::new(stream, Config::new());
//! let (connection, handle) = Connection::attach(
//!     channel,
//!     UpgradeRequest::new("/chat"),
//!     &service,
//!     Config::new(),
//! );
//! tokio::spawn(connection.run());
//! handle.send_text("hello");
//! ```

mod handle;
mod state;

pub use handle::ConnectionHandle;
pub use state::{ConnectionState, MessageState};

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
