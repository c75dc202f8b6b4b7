use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::channel::Channel;
use crate::close::{CloseReason, DisconnectReason};
use crate::config::Config;
use crate::connection::handle::Command;
use crate::connection::{ConnectionHandle, ConnectionState, MessageState};
use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};
use crate::request::UpgradeRequest;
use crate::service::Service;

/// The per-connection protocol engine.
///
/// One `Connection` exists per upgraded WebSocket and runs as a single
/// task: all frame processing, state transitions, heartbeats, and service
/// callbacks happen in program order on that task. External callers reach
/// the connection through its [`ConnectionHandle`], whose operations are
/// marshalled onto the task.
///
/// ## Example
///
/// ```rust,ignore
/// use wsengine::{Config, Connection, FramedChannel, UpgradeRequest};
///
/// let channel = FramedChannel::new(stream, Config::new());
/// let request = UpgradeRequest::new("/chat");
/// let (connection, handle) = Connection::attach(channel, request, &service, Config::new());
/// tokio::spawn(connection.run());
///
/// handle.send_text("welcome");
/// ```
pub struct Connection<C, S> {
    id: Arc<str>,
    request: UpgradeRequest,
    channel: C,
    service: Weak<S>,
    handle: ConnectionHandle,
    commands: mpsc::UnboundedReceiver<Command>,
    config: Config,
    state: ConnectionState,
    message_state: MessageState,
    message_buffer: BytesMut,
    fragment_count: usize,
    waiting_for_pong: bool,
    await_close: bool,
    disconnected_fired: bool,
    extension_negotiated: bool,
    idle_interval: Option<Duration>,
    last_io: Instant,
}

/// Generate a random 128-bit connection id, formatted as lower-hex.
/// Falls back to system time if getrandom fails.
fn generate_id() -> String {
    use std::fmt::Write as _;

    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0x1234_5678);
        bytes.copy_from_slice(&nanos.to_le_bytes());
    }

    bytes.iter().fold(String::with_capacity(32), |mut id, byte| {
        let _ = write!(id, "{byte:02x}");
        id
    })
}

impl<C: Channel, S: Service> Connection<C, S> {
    /// Attach a connection to its channel.
    ///
    /// Reads the service's `connection_timeout` to arm the idle detector
    /// (at half the timeout) and inspects the upgrade request for a
    /// negotiated extension. The returned handle is the service's way to
    /// reach the connection; the `connected` callback fires once
    /// [`Connection::run`] starts.
    pub fn attach(
        channel: C,
        request: UpgradeRequest,
        service: &Arc<S>,
        config: Config,
    ) -> (Self, ConnectionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id: Arc<str> = Arc::from(generate_id());
        let handle = ConnectionHandle::new(Arc::clone(&id), tx);
        let idle_interval = service
            .connection_timeout()
            .filter(|&secs| secs > 0)
            .map(|secs| Duration::from_secs(secs) / 2);
        let extension_negotiated = request.extension_negotiated();

        let connection = Self {
            id,
            request,
            channel,
            service: Arc::downgrade(service),
            handle: handle.clone(),
            commands: rx,
            config,
            state: ConnectionState::Open,
            message_state: MessageState::Unknown,
            message_buffer: BytesMut::new(),
            fragment_count: 0,
            waiting_for_pong: false,
            await_close: false,
            disconnected_fired: false,
            extension_negotiated,
            idle_interval,
            last_io: Instant::now(),
        };
        (connection, handle)
    }

    /// Stable opaque identifier of this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The upgrade request this connection was established from.
    #[must_use]
    pub fn request(&self) -> &UpgradeRequest {
        &self.request
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// A fresh handle to this connection.
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Drive the connection until it is closed.
    ///
    /// Fires `connected`, then processes inbound frames, marshalled
    /// outbound operations, and idle events until either side completes a
    /// close or the channel goes inactive. `disconnected` is delivered
    /// exactly once before this returns.
    pub async fn run(mut self) {
        tracing::debug!(id = %self.id, path = %self.request.path(), "connection attached");
        if let Some(service) = self.service.upgrade() {
            service.connected(&self.handle);
        }
        self.last_io = Instant::now();

        while self.state.is_active() {
            let idle_deadline = self.idle_interval.map(|interval| self.last_io + interval);

            tokio::select! {
                result = self.channel.read_frame() => match result {
                    Ok(frame) => {
                        self.last_io = Instant::now();
                        if let Err(err) = self.on_frame(frame).await {
                            self.fail(err).await;
                        }
                    }
                    Err(Error::ChannelClosed) => {
                        self.state = ConnectionState::Closed;
                    }
                    Err(err) => self.fail(err).await,
                },
                command = self.commands.recv() => {
                    if let Some(command) = command {
                        self.on_command(command).await;
                    }
                }
                () = idle_expired(idle_deadline) => {
                    self.on_idle().await;
                }
            }
        }

        self.detach();
    }

    /// Process one decoded inbound frame.
    async fn on_frame(&mut self, mut frame: Frame) -> Result<()> {
        tracing::trace!(
            id = %self.id,
            opcode = %frame.opcode,
            fin = frame.fin,
            len = frame.payload().len(),
            "inbound frame"
        );

        self.validate_rsv(&frame)?;

        if matches!(frame.opcode, OpCode::Text | OpCode::Binary) && !frame.is_masked() {
            return Err(Error::ProtocolViolation(
                "Received a frame from a client that wasn't masked".into(),
            ));
        }
        frame.unmask();

        match frame.opcode {
            OpCode::Text => self.on_text(frame),
            OpCode::Binary => self.on_binary(frame),
            OpCode::Continuation => self.on_continuation(frame),
            OpCode::Close => self.on_close(frame).await,
            OpCode::Ping => self.on_ping(frame).await,
            OpCode::Pong => {
                self.on_pong();
                Ok(())
            }
        }
    }

    /// RSV bits must be 0 unless an extension defines them: RSV1 is
    /// legitimate only when the upgrade negotiated one, RSV2/RSV3 always
    /// violate.
    fn validate_rsv(&self, frame: &Frame) -> Result<()> {
        let mut offending: Vec<&str> = Vec::new();
        if frame.rsv1 && !self.extension_negotiated {
            offending.push("RSV1");
        }
        if frame.rsv2 {
            offending.push("RSV2");
        }
        if frame.rsv3 {
            offending.push("RSV3");
        }

        if offending.is_empty() {
            Ok(())
        } else {
            Err(Error::ProtocolViolation(format!(
                "{} must be 0 unless negotiated to define meaning for non-zero values",
                offending.join(", ")
            )))
        }
    }

    fn on_text(&mut self, frame: Frame) -> Result<()> {
        if !self.message_state.is_unknown() {
            return Err(Error::ProtocolViolation(
                "A text frame must be the first in the message".into(),
            ));
        }
        if frame.fin {
            let text = String::from_utf8(frame.into_payload()).map_err(|_| Error::InvalidUtf8)?;
            self.deliver_text(text);
            Ok(())
        } else {
            self.buffer_fragment(frame.payload())?;
            self.message_state = MessageState::Text;
            Ok(())
        }
    }

    fn on_binary(&mut self, frame: Frame) -> Result<()> {
        if !self.message_state.is_unknown() {
            return Err(Error::ProtocolViolation(
                "A binary frame must be the first in the message".into(),
            ));
        }
        if frame.fin {
            self.deliver_binary(frame.into_payload());
            Ok(())
        } else {
            self.buffer_fragment(frame.payload())?;
            self.message_state = MessageState::Binary;
            Ok(())
        }
    }

    fn on_continuation(&mut self, frame: Frame) -> Result<()> {
        if self.message_state.is_unknown() {
            return Err(Error::ProtocolViolation(
                "Continuation sent with prior binary or text frame".into(),
            ));
        }
        self.buffer_fragment(frame.payload())?;

        if frame.fin {
            let payload = self.message_buffer.split().to_vec();
            self.fragment_count = 0;
            match std::mem::take(&mut self.message_state) {
                MessageState::Text => {
                    let text = String::from_utf8(payload).map_err(|_| Error::InvalidUtf8)?;
                    self.deliver_text(text);
                }
                MessageState::Binary => self.deliver_binary(payload),
                MessageState::Unknown => unreachable!(),
            }
        }
        Ok(())
    }

    fn buffer_fragment(&mut self, payload: &[u8]) -> Result<()> {
        self.config
            .limits
            .check_fragment_count(self.fragment_count + 1)?;
        self.config
            .limits
            .check_message_size(self.message_buffer.len() + payload.len())?;
        self.message_buffer.extend_from_slice(payload);
        self.fragment_count += 1;
        Ok(())
    }

    /// Echo an inbound ping as a pong with the identical payload.
    ///
    /// Control-frame constraints (FIN set, payload at most 125 octets) are
    /// enforced by the channel before the frame reaches this point.
    async fn on_ping(&mut self, frame: Frame) -> Result<()> {
        if self.channel.is_writable() {
            let pong = Frame::pong(frame.into_payload());
            self.channel.write_and_flush(&pong).await?;
            self.last_io = Instant::now();
        }
        Ok(())
    }

    fn on_pong(&mut self) {
        if self.waiting_for_pong {
            self.waiting_for_pong = false;
            tracing::trace!(id = %self.id, "heartbeat pong received");
        }
    }

    async fn on_close(&mut self, frame: Frame) -> Result<()> {
        let reason = CloseReason::decode(frame.payload())?;

        if self.await_close {
            // We initiated; the peer's close frame completes the handshake.
            self.shutdown_channel().await;
            return Ok(());
        }

        tracing::debug!(
            id = %self.id,
            code = reason.reason.as_u16(),
            "peer initiated close"
        );

        if self.channel.is_writable() {
            let reply = Frame::close(
                Some(reason.reason.as_u16()),
                reason.description.as_deref().unwrap_or(""),
            );
            let _ = self.channel.write_and_flush(&reply).await;
        }
        self.await_close = true;
        self.state = ConnectionState::Closing;
        self.fire_disconnected(reason.reason);
        self.shutdown_channel().await;
        Ok(())
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Text(text) => self.send_frame(Frame::text(text)).await,
            Command::Binary(data) => self.send_frame(Frame::binary(data)).await,
            Command::Ping(payload) => self.send_frame(Frame::ping(payload)).await,
            Command::Close(reason) => self.begin_close(reason, false).await,
            Command::ForceClose(reason) => self.begin_close(reason, true).await,
        }
    }

    async fn send_frame(&mut self, frame: Frame) {
        if self.await_close || !self.channel.is_writable() || !self.channel.is_active() {
            tracing::trace!(
                id = %self.id,
                opcode = %frame.opcode,
                "outbound frame suppressed"
            );
            return;
        }
        match self.channel.write_and_flush(&frame).await {
            Ok(()) => self.last_io = Instant::now(),
            Err(err) => self.fail(err).await,
        }
    }

    /// Send a close frame and enter the closing state.
    ///
    /// A `hard` close also shuts down the write half once the frame has
    /// been flushed. If the channel cannot be written to, it is closed
    /// outright without a frame.
    async fn begin_close(&mut self, reason: Option<CloseReason>, hard: bool) {
        if self.await_close {
            if hard {
                let _ = self.channel.shutdown_output().await;
            }
            return;
        }
        if !self.channel.is_writable() || !self.channel.is_active() {
            self.shutdown_channel().await;
            return;
        }

        let frame = match &reason {
            Some(reason) => Frame::close(
                Some(reason.reason.as_u16()),
                reason.description.as_deref().unwrap_or(""),
            ),
            None => Frame::close(None, ""),
        };
        if self.channel.write_and_flush(&frame).await.is_err() {
            self.shutdown_channel().await;
            return;
        }
        self.last_io = Instant::now();
        self.await_close = true;
        self.state = ConnectionState::Closing;
        if hard {
            let _ = self.channel.shutdown_output().await;
        }
    }

    /// Translate a framing or processing error into a close sequence.
    async fn fail(&mut self, err: Error) {
        tracing::warn!(id = %self.id, error = %err, "closing connection after error");
        let reason = CloseReason::for_error(&err);
        self.begin_close(Some(reason), true).await;
    }

    /// Idle-event handler: first miss sends a heartbeat ping, a second
    /// miss (or an idle period while closing) hard-closes the channel
    /// without a close frame, since the peer is presumed unreachable.
    async fn on_idle(&mut self) {
        if !self.waiting_for_pong && !self.await_close && self.channel.is_writable() {
            match self.channel.write_and_flush(&Frame::ping(Vec::new())).await {
                Ok(()) => {
                    self.waiting_for_pong = true;
                    self.last_io = Instant::now();
                    tracing::trace!(id = %self.id, "heartbeat ping sent");
                }
                Err(err) => self.fail(err).await,
            }
        } else {
            tracing::debug!(id = %self.id, "idle with no pong, hard-closing channel");
            self.shutdown_channel().await;
        }
    }

    async fn shutdown_channel(&mut self) {
        let _ = self.channel.close().await;
        self.state = ConnectionState::Closed;
    }

    fn detach(&mut self) {
        tracing::debug!(id = %self.id, "connection detached");
        self.fire_disconnected(DisconnectReason::NoReasonCodeSent);
    }

    fn fire_disconnected(&mut self, reason: DisconnectReason) {
        if self.disconnected_fired {
            return;
        }
        self.disconnected_fired = true;
        if let Some(service) = self.service.upgrade() {
            service.disconnected(&self.handle, reason);
        }
    }

    fn deliver_text(&self, text: String) {
        if let Some(service) = self.service.upgrade() {
            service.received_text(text, &self.handle);
        }
    }

    fn deliver_binary(&self, data: Vec<u8>) {
        if let Some(service) = self.service.upgrade() {
            service.received_binary(data, &self.handle);
        }
    }
}

async fn idle_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
