//! Frame opcodes (RFC 6455 Section 5.2).

use crate::error::{Error, Result};

/// Interpretation of a frame's payload, from the 4-bit opcode field.
///
/// Data opcodes (continuation, text, binary) participate in message
/// reassembly; control opcodes (close, ping, pong) may interleave with a
/// fragmented message but never open or continue one. The remaining bit
/// patterns (0x3-0x7 and 0xB-0xF) are reserved for future protocol
/// revisions and are rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum OpCode {
    /// Non-first fragment of a message (0x0).
    Continuation = 0x0,
    /// UTF-8 text message (0x1).
    Text = 0x1,
    /// Arbitrary binary message (0x2).
    Binary = 0x2,
    /// Closing-handshake frame (0x8).
    Close = 0x8,
    /// Liveness probe (0x9); answered with a pong carrying the same payload.
    Ping = 0x9,
    /// Answer to a ping, or an unsolicited one-way heartbeat (0xA).
    Pong = 0xA,
}

impl OpCode {
    /// Decode the opcode field of a frame header.
    ///
    /// # Errors
    ///
    /// `Error::ReservedOpcode` for the ten reserved bit patterns.
    pub const fn from_wire(bits: u8) -> Result<Self> {
        Ok(match bits {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            reserved => return Err(Error::ReservedOpcode(reserved)),
        })
    }

    /// The 4-bit wire encoding of this opcode.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Close, ping, or pong. Control frames carry at most 125 octets and
    /// must not be fragmented.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        // control opcodes occupy the high half of the assigned space
        self.bits() >= 0x8
    }

    /// Continuation, text, or binary; subject to reassembly.
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        !self.is_control()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OpCode::Continuation => "continuation",
            OpCode::Text => "text",
            OpCode::Binary => "binary",
            OpCode::Close => "close",
            OpCode::Ping => "ping",
            OpCode::Pong => "pong",
        })
    }
}
