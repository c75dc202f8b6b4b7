//! Cloneable handle through which the service (or any thread) talks to a
//! connection.
//!
//! The connection itself runs as a single task; handle operations are
//! marshalled onto that task through an unbounded command queue, so the
//! engine observes a serial schedule and needs no internal locks. Order is
//! preserved per sending thread. Once the connection task has terminated,
//! operations become silent no-ops.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::close::CloseReason;

/// Outbound operation marshalled onto the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Close(Option<CloseReason>),
    ForceClose(Option<CloseReason>),
}

/// Handle to a live connection.
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: Arc<str>, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { id, commands }
    }

    /// Stable opaque identifier of this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the connection task is still running.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Enqueue a text message (single frame, FIN set).
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Text(text.into()));
    }

    /// Enqueue a binary message (single frame, FIN set).
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) {
        let _ = self.commands.send(Command::Binary(data.into()));
    }

    /// Enqueue a ping frame with the given payload (at most 125 octets).
    pub fn ping(&self, payload: impl Into<Vec<u8>>) {
        let _ = self.commands.send(Command::Ping(payload.into()));
    }

    /// Soft close: send a close frame, then keep reading until the peer
    /// completes the handshake. `None` sends an empty close payload.
    pub fn close(&self, reason: Option<CloseReason>) {
        let _ = self.commands.send(Command::Close(reason));
    }

    /// Hard close: send a close frame, then shut down the write half once
    /// it has been flushed.
    pub fn force_close(&self, reason: Option<CloseReason>) {
        let _ = self.commands.send(Command::ForceClose(reason));
    }
}
