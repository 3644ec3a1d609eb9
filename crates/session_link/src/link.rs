//! State shared between the manager and its workers.

use crate::queue::MessageQueue;
use crate::status::ConnectionState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A server address that produced a successful connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connection state and the last known good endpoint, guarded together.
#[derive(Debug, Default)]
pub(crate) struct LinkState {
    pub(crate) state: ConnectionState,
    pub(crate) endpoint: Option<Endpoint>,
}

#[derive(Debug, Default)]
pub(crate) struct SharedLink {
    state: Mutex<LinkState>,
    pub(crate) queue: MessageQueue,
}

impl SharedLink {
    pub(crate) fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.lock().state
    }
}
