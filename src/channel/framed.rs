use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::channel::Channel;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::Frame;

/// Frame-level reader/writer over an async byte stream.
///
/// Buffers reads into a [`BytesMut`] and parses frames out of it as they
/// complete. Frame-size limits are enforced from the raw header before a
/// payload is buffered, so an oversized frame fails fast instead of
/// ballooning the read buffer. Control-frame constraints (FIN set, payload
/// at most 125 octets) are checked on every parsed frame.
pub struct FramedChannel<T> {
    io: T,
    read_buf: BytesMut,
    write_buf: BytesMut,
    config: Config,
    writable: bool,
    active: bool,
    /// Set after an unrecoverable framing error: the stream cannot be
    /// resynchronized, so further reads report the channel closed. The
    /// write half stays up so a close frame can still go out.
    poisoned: bool,
}

impl<T> FramedChannel<T> {
    /// Create a channel over `io` with the given configuration.
    #[must_use]
    pub fn new(io: T, config: Config) -> Self {
        Self {
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            write_buf: BytesMut::with_capacity(config.write_buffer_size),
            config,
            io,
            writable: true,
            active: true,
            poisoned: false,
        }
    }

    /// Access the configuration this channel was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the channel and return the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

/// Extract the payload length from a raw frame header, if enough bytes of
/// it have arrived to tell.
fn peek_payload_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    match buf[1] & 0x7F {
        len @ 0..=125 => Some(len as usize),
        126 if buf.len() >= 4 => Some(u16::from_be_bytes([buf[2], buf[3]]) as usize),
        127 if buf.len() >= 10 => u64::from_be_bytes([
            buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
        ])
        .try_into()
        .ok()
        .or(Some(usize::MAX)),
        _ => None,
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Channel for FramedChannel<T> {
    async fn read_frame(&mut self) -> Result<Frame> {
        if !self.active || self.poisoned {
            return Err(Error::ChannelClosed);
        }

        loop {
            // Refuse oversized frames from the raw header, before the
            // payload is buffered. The stream cannot be resynchronized
            // past a frame we refuse to read.
            if let Some(len) = peek_payload_len(&self.read_buf) {
                if let Err(err) = self.config.limits.check_frame_size(len) {
                    self.poisoned = true;
                    return Err(err);
                }
            }

            match Frame::parse(&self.read_buf) {
                Ok((frame, consumed)) => {
                    self.read_buf.advance(consumed);
                    frame.validate()?;
                    return Ok(frame);
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(err) => {
                    self.poisoned = true;
                    return Err(err);
                }
            }

            match self.io.read_buf(&mut self.read_buf).await {
                Ok(0) => {
                    self.active = false;
                    self.writable = false;
                    return Err(Error::ChannelClosed);
                }
                Ok(_) => {}
                Err(err) => {
                    self.poisoned = true;
                    return Err(err.into());
                }
            }
        }
    }

    async fn write_and_flush(&mut self, frame: &Frame) -> Result<()> {
        if !self.writable {
            return Err(Error::ChannelClosed);
        }

        self.write_buf.clear();
        frame.write(&mut self.write_buf);
        self.io.write_all(&self.write_buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn shutdown_output(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        self.writable = false;
        self.io.shutdown().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.active = false;
        if self.writable {
            self.writable = false;
            self.io.shutdown().await?;
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
