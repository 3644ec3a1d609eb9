//! Error types for the connection control plane.
//!
//! Every failure in this crate is recoverable. Errors are either turned into an
//! [`OperationResult`] for the caller or reported as a queued status
//! notification; none of them are allowed to take the process down.

use serde::{Deserialize, Serialize};

/// Status codes shared by every transport adapter.
///
/// The values mirror the C client library so the native and pure Rust
/// adapters report failures identically.
pub mod status {
    pub const OK: i32 = 0;
    pub const ERR_SOCKET: i32 = -1;
    pub const ERR_ADDRESS: i32 = -2;
    pub const ERR_CONNECT: i32 = -3;
    pub const ERR_TIMEOUT: i32 = -4;
    pub const ERR_MEMORY: i32 = -5;
    pub const ERR_SEND: i32 = -6;
    pub const ERR_NOT_CONNECTED: i32 = -7;
}

/// Faults raised by an adapter implementation itself, as opposed to a
/// non-zero status code returned by the transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    /// The shared library could not be opened or a symbol was missing
    #[error("Library loading error: {0}")]
    Library(String),

    /// The adapter was already initialized for this process
    #[error("Adapter already loaded")]
    AlreadyLoaded,

    /// `register_inbound` was called a second time
    #[error("Inbound sink already registered")]
    SinkAlreadyRegistered,

    /// An argument could not be handed to the transport (e.g. interior NUL)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The blocking worker running a native call went away
    #[error("Worker failure: {0}")]
    Worker(String),

    /// Any other transport-level fault
    #[error("Transport fault: {0}")]
    Transport(String),
}

/// Enumeration of control plane failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkError {
    /// No transport adapter has been installed
    #[error("Transport adapter not loaded")]
    AdapterUnavailable,

    /// A transport adapter was already installed on this manager
    #[error("Transport adapter already loaded")]
    AdapterAlreadyLoaded,

    /// The transport refused or failed the connection attempt
    #[error("{}", describe_connect_code(*code))]
    ConnectFailure { code: i32 },

    /// The transport failed to write a payload
    #[error("Send failed (code: {code})")]
    SendFailure { code: i32 },

    /// The operation requires an active connection
    #[error("Not connected")]
    NotConnected,

    /// A reconnection is already running and owns the connection state
    #[error("Reconnection in progress")]
    ReconnectInProgress,

    /// The bounded retry window elapsed without a successful connect
    #[error("Reconnect timed out after {0}s")]
    ReconnectTimeout(u64),

    /// Fault raised by the adapter layer
    #[error("{0}")]
    Adapter(#[from] AdapterError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Maps a transport connect status to a human-readable reason.
pub fn describe_connect_code(code: i32) -> String {
    match code {
        status::ERR_SOCKET => "Socket creation failed".to_string(),
        status::ERR_ADDRESS => "Invalid IP address".to_string(),
        status::ERR_CONNECT => "Connection refused".to_string(),
        other => format!("Connection failed (code: {other})"),
    }
}

/// Outcome of a public [`ConnectionManager`](crate::ConnectionManager) operation.
///
/// This is what the front-end receives: a success flag plus a message that
/// can be shown to the player as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Success without a message, used by `send`.
    pub fn ok_silent() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<LinkError> for OperationResult {
    fn from(error: LinkError) -> Self {
        Self::failed(error.to_string())
    }
}
