//! Connection and message-reassembly state machines.

/// WebSocket connection state.
///
/// The engine is created in `Open` (the upgrade handshake happens
/// upstream), moves to `Closing` once either side has sent a close frame,
/// and reaches the terminal `Closed` when the channel goes inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Connection is open and ready for data transfer.
    #[default]
    Open,
    /// Close handshake in progress (close frame sent or received).
    Closing,
    /// Connection is fully closed. No re-entry.
    Closed,
}

impl ConnectionState {
    /// Check if the connection is in an active state.
    ///
    /// Returns `true` for `Open` or `Closing`.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Check if sending data is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if receiving data is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Reassembly mode across fragmented frames.
///
/// `Unknown` means no message is in flight; the reassembly buffer is empty
/// exactly when the state is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageState {
    /// No fragmented message in progress.
    #[default]
    Unknown,
    /// Reassembling a text message.
    Text,
    /// Reassembling a binary message.
    Binary,
}

impl MessageState {
    /// Whether no fragmented message is in progress.
    #[must_use]
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, MessageState::Unknown)
    }
}
