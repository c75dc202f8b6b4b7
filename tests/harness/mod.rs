//! Shared test harness: an in-memory peer driving a real `FramedChannel`
//! over a duplex pipe, plus a recording service.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use wsengine::{
    Config, Connection, ConnectionHandle, DisconnectReason, Frame, FramedChannel, Service,
    UpgradeRequest,
};

/// Everything a service observes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected(DisconnectReason),
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Default)]
pub struct RecordingService {
    events: Mutex<Vec<Event>>,
    timeout: Option<u64>,
}

impl RecordingService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_timeout(secs: u64) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            timeout: Some(secs),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn disconnect_reasons(&self) -> Vec<DisconnectReason> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Disconnected(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl Service for RecordingService {
    fn connected(&self, _connection: &ConnectionHandle) {
        self.events.lock().unwrap().push(Event::Connected);
    }

    fn disconnected(&self, _connection: &ConnectionHandle, reason: DisconnectReason) {
        self.events.lock().unwrap().push(Event::Disconnected(reason));
    }

    fn received_text(&self, text: String, _connection: &ConnectionHandle) {
        self.events.lock().unwrap().push(Event::Text(text));
    }

    fn received_binary(&self, data: Vec<u8>, _connection: &ConnectionHandle) {
        self.events.lock().unwrap().push(Event::Binary(data));
    }

    fn connection_timeout(&self) -> Option<u64> {
        self.timeout
    }
}

pub const OP_CONTINUATION: u8 = 0x0;
pub const OP_TEXT: u8 = 0x1;
pub const OP_BINARY: u8 = 0x2;
pub const OP_CLOSE: u8 = 0x8;
pub const OP_PING: u8 = 0x9;
pub const OP_PONG: u8 = 0xA;

/// Encode a client frame with a zero mask key (masked payload equals the
/// plaintext, which keeps test vectors readable).
pub fn client_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + payload.len());
    out.push(if fin { 0x80 | opcode } else { opcode });

    let len = payload.len();
    if len <= 125 {
        out.push(0x80 | len as u8);
    } else if len <= 65535 {
        out.push(0x80 | 126);
        out.extend((len as u16).to_be_bytes());
    } else {
        out.push(0x80 | 127);
        out.extend((len as u64).to_be_bytes());
    }
    out.extend([0u8; 4]); // zero mask key
    out.extend(payload);
    out
}

pub fn client_close(code: Option<u16>, reason: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    if let Some(code) = code {
        payload.extend(code.to_be_bytes());
        payload.extend(reason.as_bytes());
    }
    client_frame(true, OP_CLOSE, &payload)
}

/// The peer's half of the wire: writes client bytes, parses server frames.
pub struct TestClient {
    reader: ReadHalf<DuplexStream>,
    writer: Option<WriteHalf<DuplexStream>>,
    buffer: Vec<u8>,
}

impl TestClient {
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer
            .as_mut()
            .expect("client already hung up")
            .write_all(bytes)
            .await
            .unwrap();
    }

    pub async fn send_frame(&mut self, fin: bool, opcode: u8, payload: &[u8]) {
        let bytes = client_frame(fin, opcode, payload);
        self.send_raw(&bytes).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.send_frame(true, OP_TEXT, text.as_bytes()).await;
    }

    pub async fn send_close(&mut self, code: Option<u16>, reason: &str) {
        let bytes = client_close(code, reason);
        self.send_raw(&bytes).await;
    }

    /// Shut down the write half; the server sees EOF once it has drained
    /// the bytes already sent.
    ///
    /// This must go through `AsyncWrite::shutdown` rather than simply
    /// dropping the `WriteHalf`: `tokio::io::split` keeps the underlying
    /// `DuplexStream` alive via a shared `Arc` as long as the `ReadHalf`
    /// exists, so dropping only the `WriteHalf` never signals EOF to the
    /// peer.
    pub async fn hang_up(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.unwrap();
        }
    }

    /// Read the next server frame, or `None` once the server has closed.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        loop {
            match Frame::parse(&self.buffer) {
                Ok((frame, consumed)) => {
                    self.buffer.drain(..consumed);
                    return Some(frame);
                }
                Err(wsengine::Error::IncompleteFrame { .. }) => {}
                Err(err) => panic!("server sent an unparseable frame: {err}"),
            }

            let mut chunk = [0u8; 1024];
            let n = self.reader.read(&mut chunk).await.unwrap();
            if n == 0 {
                assert!(
                    self.buffer.is_empty(),
                    "server closed mid-frame: {:?}",
                    self.buffer
                );
                return None;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Drain all remaining server frames until EOF.
    pub async fn recv_all(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.recv_frame().await {
            frames.push(frame);
        }
        frames
    }
}

/// Wire a connection to an in-memory peer and start its task.
pub fn connect(
    service: &Arc<RecordingService>,
    request: UpgradeRequest,
    config: Config,
) -> (ConnectionHandle, TestClient, JoinHandle<()>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let channel = FramedChannel::new(server_io, config.clone());
    let (connection, handle) = Connection::attach(channel, request, service, config);
    let task = tokio::spawn(connection.run());

    let (reader, writer) = tokio::io::split(client_io);
    let client = TestClient {
        reader,
        writer: Some(writer),
        buffer: Vec::new(),
    };
    (handle, client, task)
}

pub fn connect_default(
    service: &Arc<RecordingService>,
) -> (ConnectionHandle, TestClient, JoinHandle<()>) {
    connect(service, UpgradeRequest::new("/test"), Config::new())
}
