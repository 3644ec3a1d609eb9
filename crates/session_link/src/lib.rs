//! # session_link
//!
//! Client-side connection control plane for the Xiangqi game client.
//!
//! The crate keeps one connection to the game server alive on behalf of a
//! front-end that only knows how to call `connect`, `send` and
//! `get_messages`:
//!
//! * **Transport adapters** perform the actual I/O ([`TcpAdapter`] in pure
//!   Rust, [`NativeAdapter`] over the C client library)
//! * **Poll loop** pumps inbound payloads into a [`MessageQueue`] and detects
//!   silent connection loss
//! * **Reconnect loop** retries at a fixed interval within a bounded window,
//!   reporting progress as `connection_status` notifications
//! * **[`ConnectionManager`]** ties it together behind a small façade
//!
//! ## Example
//!
//! ```no_run
//! use session_link::{ConnectionConfig, ConnectionManager, TcpAdapter};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), session_link::LinkError> {
//! let config = ConnectionConfig::from_env()?;
//! let manager = ConnectionManager::with_adapter(config, Arc::new(TcpAdapter::new()))?;
//!
//! let result = manager.connect(None, None).await;
//! if result.success {
//!     manager.send(r#"{"type":"ping","payload":{}}"#).await;
//!     for message in manager.get_messages() {
//!         println!("{message}");
//!     }
//! }
//! manager.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod link;
pub mod manager;
pub mod queue;
pub mod reconnect;
pub mod status;
pub mod stop;

mod poll;

#[cfg(test)]
mod testing;

pub use adapter::{NativeAdapter, TcpAdapter, TransportAdapter};
pub use config::ConnectionConfig;
pub use error::{AdapterError, LinkError, OperationResult};
pub use link::Endpoint;
pub use manager::ConnectionManager;
pub use queue::{Message, MessageQueue};
pub use reconnect::ReconnectPhase;
pub use status::{ConnectionState, ConnectionStatus, StatusEnvelope};
pub use stop::StopSignal;
