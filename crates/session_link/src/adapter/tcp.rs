//! Pure Rust transport speaking the game server's line protocol.
//!
//! Every payload is a single line of text terminated by `\n`. Received bytes
//! are buffered until a full line is available; a line longer than the receive
//! buffer is discarded with a warning rather than growing without bound.

use super::{InboundSender, TransportAdapter};
use crate::error::{status, AdapterError};
use crate::queue::Message;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Size of the receive buffer, and the longest line that can be delivered.
pub const RECV_BUFFER_SIZE: usize = 16 * 1024;

/// How long a connect attempt may take before reporting `ERR_TIMEOUT`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Link {
    stream: TcpStream,
    pending: Vec<u8>,
    scratch: Box<[u8]>,
}

impl Link {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(RECV_BUFFER_SIZE),
            scratch: vec![0u8; RECV_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    fn take_lines(&mut self) -> Vec<Message> {
        split_lines(&mut self.pending)
    }
}

/// Splits every complete line out of `pending`, keeping the unfinished tail.
///
/// Empty lines are skipped and a trailing `\r` is stripped. If the tail has
/// grown to the buffer size without a newline it is dropped.
fn split_lines(pending: &mut Vec<u8>) -> Vec<Message> {
    let mut lines = Vec::new();
    while let Some(end) = pending.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw[..end]);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    if pending.len() >= RECV_BUFFER_SIZE {
        warn!(
            "⚠️ Receive buffer overflow ({} bytes without a newline), resetting",
            pending.len()
        );
        pending.clear();
    }
    lines
}

/// Line-oriented TCP transport.
#[derive(Debug)]
pub struct TcpAdapter {
    link: Mutex<Option<Link>>,
    connected: AtomicBool,
    sink: OnceCell<InboundSender>,
    connect_timeout: Duration,
}

impl Default for TcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpAdapter {
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
            sink: OnceCell::new(),
            connect_timeout,
        }
    }

    fn deliver(&self, lines: Vec<Message>) -> usize {
        let count = lines.len();
        match self.sink.get() {
            Some(sink) => {
                for line in lines {
                    // The receiving side lives as long as the manager.
                    let _ = sink.send(line);
                }
            }
            None if count > 0 => warn!("Dropping {} inbound message(s): no sink registered", count),
            None => {}
        }
        count
    }

    fn close(&self, link: &mut Option<Link>) {
        self.connected.store(false, Ordering::Release);
        *link = None;
    }

    async fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
        let addrs: Vec<SocketAddr> = match lookup_host((host, port)).await {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                debug!("Address lookup for {}:{} failed: {}", host, port, e);
                return None;
            }
        };
        addrs
            .iter()
            .copied()
            .find(SocketAddr::is_ipv4)
            .or_else(|| addrs.first().copied())
    }
}

#[async_trait]
impl TransportAdapter for TcpAdapter {
    async fn connect(&self, host: &str, port: u16) -> Result<i32, AdapterError> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(status::OK);
        }

        let mut link = self.link.lock().await;
        let Some(addr) = Self::resolve(host, port).await else {
            return Ok(status::ERR_ADDRESS);
        };

        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                debug!("Connect to {} failed: {}", addr, e);
                return Ok(status::ERR_CONNECT);
            }
            Err(_) => {
                debug!("Connect to {} timed out after {:?}", addr, self.connect_timeout);
                return Ok(status::ERR_TIMEOUT);
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY: {}", e);
        }
        *link = Some(Link::new(stream));
        self.connected.store(true, Ordering::Release);
        Ok(status::OK)
    }

    async fn disconnect(&self) -> Result<i32, AdapterError> {
        let mut link = self.link.lock().await;
        if let Some(mut open) = link.take() {
            if let Err(e) = open.stream.shutdown().await {
                debug!("Shutdown of TCP stream failed: {}", e);
            }
        }
        self.close(&mut link);
        Ok(status::OK)
    }

    async fn send(&self, payload: &str) -> Result<i32, AdapterError> {
        let mut guard = self.link.lock().await;
        let Some(link) = guard.as_mut() else {
            return Ok(status::ERR_NOT_CONNECTED);
        };

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload.as_bytes());
        frame.push(b'\n');

        if let Err(e) = link.stream.write_all(&frame).await {
            warn!("Send failed, dropping connection: {}", e);
            self.close(&mut guard);
            return Ok(status::ERR_SEND);
        }
        Ok(status::OK)
    }

    fn is_connected(&self) -> Result<bool, AdapterError> {
        Ok(self.connected.load(Ordering::Acquire))
    }

    async fn pump_messages(&self) -> Result<i32, AdapterError> {
        let mut guard = self.link.lock().await;
        let Some(link) = guard.as_mut() else {
            return Ok(status::ERR_NOT_CONNECTED);
        };

        let mut closed = false;
        loop {
            match link.stream.try_read(&mut link.scratch) {
                Ok(0) => {
                    debug!("Server closed the connection");
                    closed = true;
                    break;
                }
                Ok(n) => link.pending.extend_from_slice(&link.scratch[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Receive failed: {}", e);
                    closed = true;
                    break;
                }
            }
        }

        let delivered = self.deliver(link.take_lines());
        if closed {
            self.close(&mut guard);
            return Ok(status::ERR_CONNECT);
        }
        Ok(i32::try_from(delivered).unwrap_or(i32::MAX))
    }

    fn register_inbound(&self, sink: InboundSender) -> Result<(), AdapterError> {
        self.sink
            .set(sink)
            .map_err(|_| AdapterError::SinkAlreadyRegistered)
    }
}
