//! Snapshot of the HTTP upgrade request a connection was established from.
//!
//! The upgrade handshake itself happens upstream; the engine only needs an
//! immutable view of the request headers, chiefly to decide whether an
//! extension was negotiated (which relaxes RSV1 validation).

use std::collections::HashMap;

/// Immutable snapshot of the HTTP request that upgraded to WebSocket.
///
/// Header names are stored lowercased, so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    path: String,
    headers: HashMap<String, String>,
}

impl UpgradeRequest {
    /// Create a snapshot for the given request path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a header to the snapshot (builder style).
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// The request path (e.g., "/chat").
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up a header value, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Whether a frame-transforming extension was negotiated for this
    /// connection.
    ///
    /// The `Sec-WebSocket-Extensions` header is split at `;`; only a first
    /// token of `permessage-deflate` counts as a negotiated extension. Any
    /// other value, or an absent header, means no extension.
    #[must_use]
    pub fn extension_negotiated(&self) -> bool {
        self.header("sec-websocket-extensions")
            .and_then(|value| value.split(';').next())
            .is_some_and(|token| token.trim() == "permessage-deflate")
    }
}
