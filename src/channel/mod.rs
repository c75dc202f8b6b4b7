//! Transport abstraction the connection engine is written against.
//!
//! The engine never touches sockets directly: it reads and writes
//! [`Frame`]s through a [`Channel`]. The production implementation is
//! [`FramedChannel`], which runs the octet-level codec over any async
//! byte stream; tests substitute in-memory channels.

mod framed;

pub use framed::FramedChannel;

use crate::error::Result;
use crate::protocol::Frame;

/// A frame-level transport for one WebSocket connection.
///
/// Implementations are owned by a single connection task; none of the
/// methods need to be re-entrant.
#[allow(async_fn_in_trait)]
pub trait Channel {
    /// Read the next frame from the peer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) once
    /// the peer has closed the stream, or a framing/I-O error.
    async fn read_frame(&mut self) -> Result<Frame>;

    /// Serialize a frame and flush it to the peer.
    async fn write_and_flush(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and shut down the write half, leaving the read half open.
    async fn shutdown_output(&mut self) -> Result<()>;

    /// Close the transport in both directions.
    async fn close(&mut self) -> Result<()>;

    /// Whether frames can still be written.
    fn is_writable(&self) -> bool;

    /// Whether the transport is still attached (not closed and not at EOF).
    fn is_active(&self) -> bool;
}
