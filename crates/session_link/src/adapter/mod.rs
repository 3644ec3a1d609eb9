//! Transport adapter boundary.
//!
//! The control plane never touches sockets itself. It drives an adapter that
//! exposes the primitive operations of a game client library and reports
//! results as integer status codes (see [`crate::error::status`]).
//!
//! Inbound payloads are handed over through an [`InboundSender`] registered
//! once per adapter. The adapter sends into it from `pump_messages`, and the
//! poll loop moves whatever arrived into the consumer's queue.

pub mod native;
pub mod tcp;

pub use native::NativeAdapter;
pub use tcp::TcpAdapter;

use crate::error::AdapterError;
use crate::queue::Message;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sending half of the inbound delivery channel.
pub type InboundSender = mpsc::UnboundedSender<Message>;
/// Receiving half of the inbound delivery channel.
pub type InboundReceiver = mpsc::UnboundedReceiver<Message>;

/// Creates the channel an adapter delivers inbound payloads into.
pub fn inbound_channel() -> (InboundSender, InboundReceiver) {
    mpsc::unbounded_channel()
}

/// Primitive operations of a game client transport.
///
/// `Err` means the adapter itself faulted. A transport that merely failed
/// returns `Ok` with a non-zero status code.
#[async_trait]
pub trait TransportAdapter: Send + Sync + std::fmt::Debug + 'static {
    /// Opens the connection. Returns `0` on success.
    async fn connect(&self, host: &str, port: u16) -> Result<i32, AdapterError>;

    /// Closes the connection. Best effort.
    async fn disconnect(&self) -> Result<i32, AdapterError>;

    /// Writes one payload. Returns `0` on success.
    async fn send(&self, payload: &str) -> Result<i32, AdapterError>;

    /// Ground-truth connection query. Must not have side effects.
    fn is_connected(&self) -> Result<bool, AdapterError>;

    /// Delivers every buffered inbound payload to the registered sink before
    /// returning.
    async fn pump_messages(&self) -> Result<i32, AdapterError>;

    /// Registers the inbound sink. Called once, before the first pump; the
    /// adapter keeps it for its whole lifetime.
    fn register_inbound(&self, sink: InboundSender) -> Result<(), AdapterError>;
}
