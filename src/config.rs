//! Connection configuration and resource caps.

/// Hard caps on what a single connection may buffer.
///
/// Frames are refused from their raw header, before any payload octet is
/// read; the message and fragment caps apply while reassembling. Each cap
/// trips its own error variant so the close reason can name exactly what
/// was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest single frame accepted, in bytes.
    pub max_frame_size: usize,
    /// Largest reassembled message accepted, in bytes.
    pub max_message_size: usize,
    /// Most fragments a single message may span.
    pub max_fragment_count: usize,
}

/// 16 MB frames, 64 MB messages, 128 fragments.
const DEFAULT_LIMITS: Limits = Limits {
    max_frame_size: 16 << 20,
    max_message_size: 64 << 20,
    max_fragment_count: 128,
};

impl Default for Limits {
    fn default() -> Self {
        DEFAULT_LIMITS
    }
}

impl Limits {
    /// Caps with explicit values.
    #[must_use]
    pub const fn new(
        max_frame_size: usize,
        max_message_size: usize,
        max_fragment_count: usize,
    ) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_fragment_count,
        }
    }

    /// A tight profile for memory-constrained deployments: 64 KB frames,
    /// 256 KB messages, 16 fragments.
    #[must_use]
    pub const fn constrained() -> Self {
        Self::new(64 << 10, 256 << 10, 16)
    }

    /// Accept or refuse a frame of `size` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) when `size` is over the cap.
    pub const fn check_frame_size(&self, size: usize) -> Result<(), crate::Error> {
        if size <= self.max_frame_size {
            Ok(())
        } else {
            Err(crate::Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        }
    }

    /// Accept or refuse a (partially) reassembled message of `size` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) when `size` is over the cap.
    pub const fn check_message_size(&self, size: usize) -> Result<(), crate::Error> {
        if size <= self.max_message_size {
            Ok(())
        } else {
            Err(crate::Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        }
    }

    /// Accept or refuse a message spanning `count` fragments so far.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyFragments`](crate::Error::TooManyFragments) when `count` is over the cap.
    pub const fn check_fragment_count(&self, count: usize) -> Result<(), crate::Error> {
        if count <= self.max_fragment_count {
            Ok(())
        } else {
            Err(crate::Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        }
    }
}

/// Per-connection configuration: resource caps and channel buffer sizing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource caps.
    pub limits: Limits,

    /// Initial capacity of the channel's read buffer, in bytes.
    pub read_buffer_size: usize,

    /// Initial capacity of the channel's write buffer, in bytes.
    pub write_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            read_buffer_size: 8 << 10,
            write_buffer_size: 8 << 10,
        }
    }
}

impl Config {
    /// Default caps and 8 KB channel buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the resource caps.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the read buffer's initial capacity.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the write buffer's initial capacity.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }
}
