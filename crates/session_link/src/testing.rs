//! Scripted in-memory adapter for exercising the control plane.

use crate::adapter::{InboundSender, TransportAdapter};
use crate::error::{status, AdapterError};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of one scripted `connect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Return this status; `0` also brings the link up
    Status(i32),
    /// Return `0` but leave the link down
    Phantom,
    /// Fail with an adapter fault
    Fault,
}

#[derive(Debug, Default)]
pub(crate) struct MockAdapter {
    connected: AtomicBool,
    query_fault: AtomicBool,
    script: Mutex<VecDeque<Step>>,
    fallback: AtomicI32,
    connect_delay: Mutex<Duration>,
    reset_on_connect: AtomicBool,
    send_code: AtomicI32,
    connects: Mutex<Vec<(String, u16)>>,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<String>>,
    inbound: Mutex<Vec<String>>,
    sink: OnceCell<InboundSender>,
}

impl MockAdapter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for the next `connect` calls.
    pub(crate) fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.script.lock().unwrap().extend(steps);
    }

    /// Status returned once the script is exhausted.
    pub(crate) fn set_fallback(&self, code: i32) {
        self.fallback.store(code, Ordering::SeqCst);
    }

    /// Makes every later `connect` take `delay` before it settles.
    pub(crate) fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    /// Makes `connect` tear down the current link before dialing.
    pub(crate) fn set_reset_on_connect(&self, reset: bool) {
        self.reset_on_connect.store(reset, Ordering::SeqCst);
    }

    pub(crate) fn set_send_code(&self, code: i32) {
        self.send_code.store(code, Ordering::SeqCst);
    }

    pub(crate) fn set_query_fault(&self, fault: bool) {
        self.query_fault.store(fault, Ordering::SeqCst);
    }

    /// Simulates the server going away without a local disconnect.
    pub(crate) fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub(crate) fn push_inbound(&self, message: &str) {
        self.inbound.lock().unwrap().push(message.to_string());
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub(crate) fn last_connect(&self) -> Option<(String, u16)> {
        self.connects.lock().unwrap().last().cloned()
    }

    pub(crate) fn disconnect_calls(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportAdapter for MockAdapter {
    async fn connect(&self, host: &str, port: u16) -> Result<i32, AdapterError> {
        self.connects.lock().unwrap().push((host.to_string(), port));
        if self.reset_on_connect.load(Ordering::SeqCst) {
            self.connected.store(false, Ordering::SeqCst);
        }
        let delay = *self.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::Status(self.fallback.load(Ordering::SeqCst)));

        match step {
            Step::Status(status::OK) => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(status::OK)
            }
            Step::Status(code) => Ok(code),
            Step::Phantom => Ok(status::OK),
            Step::Fault => Err(AdapterError::Transport("mock fault".to_string())),
        }
    }

    async fn disconnect(&self) -> Result<i32, AdapterError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(status::OK)
    }

    async fn send(&self, payload: &str) -> Result<i32, AdapterError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Ok(status::ERR_NOT_CONNECTED);
        }
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(self.send_code.load(Ordering::SeqCst))
    }

    fn is_connected(&self) -> Result<bool, AdapterError> {
        if self.query_fault.load(Ordering::SeqCst) {
            return Err(AdapterError::Transport("query fault".to_string()));
        }
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn pump_messages(&self) -> Result<i32, AdapterError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Ok(status::ERR_NOT_CONNECTED);
        }
        let pending: Vec<String> = std::mem::take(&mut *self.inbound.lock().unwrap());
        let count = pending.len() as i32;
        if let Some(sink) = self.sink.get() {
            for message in pending {
                let _ = sink.send(message);
            }
        }
        Ok(count)
    }

    fn register_inbound(&self, sink: InboundSender) -> Result<(), AdapterError> {
        self.sink
            .set(sink)
            .map_err(|_| AdapterError::SinkAlreadyRegistered)
    }
}
