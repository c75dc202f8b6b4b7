//! Close codes and close reasons as defined in RFC 6455 Section 7.4.
//!
//! Two views of the same information live here: the on-wire status code
//! (a `u16` in network byte order at the start of a close payload) and the
//! [`DisconnectReason`] the service observes. Inbound codes are normalized
//! during decoding: codes below 3000 that are not part of the recognized
//! set collapse to [`DisconnectReason::ProtocolError`], while 3000-4999
//! remain application-defined.

use crate::error::{Error, Result};

/// Maximum close payload length (control frame limit).
const MAX_CLOSE_PAYLOAD: usize = 125;

/// Reason a connection is terminating, as surfaced to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal closure (1000). The connection successfully completed.
    #[default]
    Normal,
    /// Going away (1001). Endpoint is going away (e.g., server shutdown, browser navigating away).
    GoingAway,
    /// Protocol error (1002). Endpoint received a malformed frame or protocol violation.
    ProtocolError,
    /// Unacceptable data (1003). Endpoint received a data type it cannot handle.
    InvalidDataType,
    /// Data inconsistent with message type (1007), e.g. non-UTF-8 in a text message.
    InvalidDataContents,
    /// Policy violation (1008). Endpoint received a message that violates its policy.
    PolicyViolation,
    /// Message too big (1009). Endpoint received a message too large to process.
    MessageTooLarge,
    /// Missing extension (1010). Client expected the server to negotiate an extension.
    ExtensionMissing,
    /// Unexpected server error (1011).
    ServerError,
    /// The peer went away without sending a close code (1005, never on the wire).
    NoReasonCodeSent,
    /// Application-defined close code (3000-4999).
    UserDefined(u16),
}

impl DisconnectReason {
    /// Decode an on-wire close code into a disconnect reason.
    ///
    /// Unrecognized codes below 3000 are promoted to `ProtocolError`; this
    /// rejects the RFC-reserved slots (1004, 1005, 1006, 1014, 1015) along
    /// with anything else an endpoint must not send.
    #[must_use]
    pub const fn from_wire(code: u16) -> Self {
        match code {
            1000 => DisconnectReason::Normal,
            1001 => DisconnectReason::GoingAway,
            1002 => DisconnectReason::ProtocolError,
            1003 => DisconnectReason::InvalidDataType,
            1007 => DisconnectReason::InvalidDataContents,
            1008 => DisconnectReason::PolicyViolation,
            1009 => DisconnectReason::MessageTooLarge,
            1010 => DisconnectReason::ExtensionMissing,
            1011 => DisconnectReason::ServerError,
            code if code < 3000 => DisconnectReason::ProtocolError,
            code => DisconnectReason::UserDefined(code),
        }
    }

    /// Get the on-wire value of this reason.
    ///
    /// `NoReasonCodeSent` maps to 1005, which RFC 6455 forbids on the wire;
    /// the engine never emits it in a close frame.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            DisconnectReason::Normal => 1000,
            DisconnectReason::GoingAway => 1001,
            DisconnectReason::ProtocolError => 1002,
            DisconnectReason::InvalidDataType => 1003,
            DisconnectReason::InvalidDataContents => 1007,
            DisconnectReason::PolicyViolation => 1008,
            DisconnectReason::MessageTooLarge => 1009,
            DisconnectReason::ExtensionMissing => 1010,
            DisconnectReason::ServerError => 1011,
            DisconnectReason::NoReasonCodeSent => 1005,
            DisconnectReason::UserDefined(code) => *code,
        }
    }
}

/// Close reason: a disconnect reason plus an optional UTF-8 description.
///
/// On the wire this is laid out as `u16 code (network order) || description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Why the connection is closing.
    pub reason: DisconnectReason,
    /// Human-readable description (UTF-8, at most 123 bytes on the wire).
    pub description: Option<String>,
}

impl CloseReason {
    /// Create a close reason without a description.
    #[must_use]
    pub const fn new(reason: DisconnectReason) -> Self {
        Self {
            reason,
            description: None,
        }
    }

    /// Create a close reason with a description.
    #[must_use]
    pub fn with_description(reason: DisconnectReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: Some(description.into()),
        }
    }

    /// Normal closure, no description.
    #[must_use]
    pub const fn normal() -> Self {
        Self::new(DisconnectReason::Normal)
    }

    /// Protocol error with a description.
    #[must_use]
    pub fn protocol_error(description: impl Into<String>) -> Self {
        Self::with_description(DisconnectReason::ProtocolError, description)
    }

    /// Decode the payload of an inbound close frame.
    ///
    /// - Empty payload: normal closure with no description.
    /// - 2 to 125 octets: status code followed by an optional UTF-8 description.
    /// - Length 1 or above 125: protocol error.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolViolation`] for an illegal payload length.
    /// - [`Error::InvalidUtf8`] if the description is not valid UTF-8.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Ok(Self::normal());
        }
        if payload.len() < 2 || payload.len() > MAX_CLOSE_PAYLOAD {
            return Err(Error::ProtocolViolation(
                "Close frames, that have a payload, must be between 2 and 125 octets inclusive"
                    .into(),
            ));
        }

        let code = u16::from_be_bytes([payload[0], payload[1]]);
        let reason = DisconnectReason::from_wire(code);
        let description = if payload.len() > 2 {
            Some(
                std::str::from_utf8(&payload[2..])
                    .map_err(|_| Error::InvalidUtf8)?
                    .to_owned(),
            )
        } else {
            None
        };

        Ok(Self {
            reason,
            description,
        })
    }

    /// Encode this reason as a close-frame payload.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        let description = self.description.as_deref().unwrap_or("");
        let mut payload = Vec::with_capacity(2 + description.len());
        payload.extend_from_slice(&self.reason.as_u16().to_be_bytes());
        payload.extend_from_slice(description.as_bytes());
        payload
    }

    /// Translate a framing-layer error into the close reason sent to the peer.
    #[must_use]
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::ControlFrameTooLarge(_) => Self::protocol_error(
                "Control frames are only allowed to have payload up to and including 125 octets",
            ),
            Error::FragmentedControlFrame => {
                Self::protocol_error("Control frames must not be fragmented")
            }
            Error::FrameTooLarge { .. } => Self::protocol_error(
                "Frames must be smaller than the configured maximum acceptable frame size",
            ),
            Error::ReservedOpcode(code) => Self::protocol_error(format!(
                "Parsed a frame with an invalid operation code of {code}"
            )),
            Error::ProtocolViolation(message) => Self::protocol_error(message.clone()),
            Error::InvalidUtf8 => Self::with_description(
                DisconnectReason::InvalidDataContents,
                "Failed to convert received payload to UTF-8 String",
            ),
            Error::MessageTooLarge { .. } | Error::TooManyFragments { .. } => {
                Self::with_description(DisconnectReason::MessageTooLarge, err.to_string())
            }
            other => Self::with_description(DisconnectReason::ServerError, other.to_string()),
        }
    }
}
