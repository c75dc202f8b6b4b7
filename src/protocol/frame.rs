//! WebSocket frame parsing and serialization (RFC 6455).

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::OpCode;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// A WebSocket frame as defined in RFC 6455.
///
/// Frames are the basic unit of communication in the WebSocket protocol.
/// This struct supports both parsing incoming frames and creating outgoing
/// frames.
///
/// The parser leaves inbound payloads exactly as they arrived: a masked
/// frame keeps its mask key in [`Frame::mask`] and its payload XORed until
/// [`Frame::unmask`] is called. Outgoing frames are written unmasked
/// (server role).
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Must be 0 unless an extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must be 0 unless an extension is negotiated.
    pub rsv2: bool,
    /// Reserved bit 3. Must be 0 unless an extension is negotiated.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    /// Mask key carried by a client frame. Cleared by [`Frame::unmask`].
    pub mask: Option<[u8; 4]>,
    /// Frame payload data.
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new outgoing frame with the given parameters.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            mask: None,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = if let Some(code) = code {
            let mut data = code.to_be_bytes().to_vec();
            data.extend_from_slice(reason.as_bytes());
            data
        } else {
            Vec::new()
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Whether this frame arrived with a mask key.
    #[inline]
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Unmask the payload in place, consuming the mask key.
    ///
    /// A second call is a no-op.
    pub fn unmask(&mut self) {
        if let Some(key) = self.mask.take() {
            apply_mask_fast(&mut self.payload, key);
        }
    }

    /// Parse a frame from a buffer.
    ///
    /// Returns the parsed frame and the number of bytes consumed. Masked
    /// payloads are not unmasked here.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let byte0 = buf[0];
        let byte1 = buf[1];

        let fin = (byte0 & 0x80) != 0;
        let rsv1 = (byte0 & 0x40) != 0;
        let rsv2 = (byte0 & 0x20) != 0;
        let rsv3 = (byte0 & 0x10) != 0;
        let opcode = OpCode::from_wire(byte0 & 0x0F)?;

        let masked = (byte1 & 0x80) != 0;
        let payload_len_initial = byte1 & 0x7F;

        let (payload_len, header_size) = match payload_len_initial {
            0..=125 => (payload_len_initial as usize, 2),
            126 => {
                if buf.len() < 4 {
                    return Err(Error::IncompleteFrame {
                        needed: 4 - buf.len(),
                    });
                }
                (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
            }
            127 => {
                if buf.len() < 10 {
                    return Err(Error::IncompleteFrame {
                        needed: 10 - buf.len(),
                    });
                }
                let len_u64 = u64::from_be_bytes([
                    buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
                ]);
                let len = usize::try_from(len_u64).map_err(|_| Error::FrameTooLarge {
                    size: usize::MAX,
                    max: usize::MAX,
                })?;
                (len, 10)
            }
            _ => unreachable!(),
        };

        let total_header_size = if masked { header_size + 4 } else { header_size };
        if buf.len() < total_header_size {
            return Err(Error::IncompleteFrame {
                needed: total_header_size - buf.len(),
            });
        }

        let mask = if masked {
            Some([
                buf[header_size],
                buf[header_size + 1],
                buf[header_size + 2],
                buf[header_size + 3],
            ])
        } else {
            None
        };

        let total_size =
            total_header_size
                .checked_add(payload_len)
                .ok_or(Error::FrameTooLarge {
                    size: payload_len,
                    max: usize::MAX - total_header_size,
                })?;

        if buf.len() < total_size {
            return Err(Error::IncompleteFrame {
                needed: total_size - buf.len(),
            });
        }

        let payload = buf[total_header_size..total_size].to_vec();

        Ok((
            Frame {
                fin,
                rsv1,
                rsv2,
                rsv3,
                opcode,
                mask,
                payload,
            },
            total_size,
        ))
    }

    /// Validate the control-frame constraints of RFC 6455.
    ///
    /// # Errors
    ///
    /// - `Error::FragmentedControlFrame` if a control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if a control payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }
        Ok(())
    }

    /// Serialize the frame into `buf`, unmasked (server role).
    ///
    /// Returns the number of bytes written.
    pub fn write(&self, buf: &mut BytesMut) -> usize {
        let payload_len = self.payload.len();

        let mut byte0 = self.opcode.bits();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }

        buf.reserve(self.wire_size());
        buf.put_u8(byte0);

        if payload_len <= 125 {
            buf.put_u8(payload_len as u8);
        } else if payload_len <= 65535 {
            buf.put_u8(126);
            buf.put_u16(payload_len as u16);
        } else {
            buf.put_u8(127);
            buf.put_u64(payload_len as u64);
        }

        buf.put_slice(&self.payload);
        self.wire_size()
    }

    /// Calculate the serialized size of this frame.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        let payload_len = self.payload.len();
        let extended_len_size = if payload_len <= 125 {
            0
        } else if payload_len <= 65535 {
            2
        } else {
            8
        };
        2 + extended_len_size + payload_len
    }
}
