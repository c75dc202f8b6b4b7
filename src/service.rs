//! Service trait: the application-facing callback surface (push model).
//!
//! The connection drives the service as frames arrive; the service talks
//! back through the [`ConnectionHandle`] it is given. Services are shared
//! across connections via `Arc` — each connection keeps only a `Weak`
//! back-reference, so dropping the service quiesces its connections.

use crate::close::DisconnectReason;
use crate::connection::ConnectionHandle;

/// Handler for WebSocket connection events.
pub trait Service: Send + Sync + 'static {
    /// The connection has been attached to its channel and is open.
    fn connected(&self, connection: &ConnectionHandle);

    /// The connection has terminated. Delivered at most once; after this,
    /// no further events arrive for `connection`.
    fn disconnected(&self, connection: &ConnectionHandle, reason: DisconnectReason);

    /// A complete text message was received. Fragmented messages are
    /// reassembled and UTF-8 validated before delivery.
    fn received_text(&self, text: String, connection: &ConnectionHandle);

    /// A complete binary message was received.
    fn received_binary(&self, data: Vec<u8>, connection: &ConnectionHandle);

    /// Connection timeout in seconds, if this service wants heartbeats.
    ///
    /// When set, the engine pings an idle peer every half-timeout and
    /// hard-closes the channel after a missed pong.
    fn connection_timeout(&self) -> Option<u64> {
        None
    }
}
