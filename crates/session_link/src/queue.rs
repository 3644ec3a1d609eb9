//! Thread-safe FIFO buffer bridging asynchronous delivery to a polling consumer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An opaque, already-serialized payload. The control plane never parses it.
pub type Message = String;

/// Unbounded message buffer drained wholesale by the consumer.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    inner: Arc<Mutex<Vec<Message>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a single message.
    pub fn push(&self, message: impl Into<Message>) {
        self.lock().push(message.into());
    }

    /// Appends a batch under one lock so it cannot interleave with other producers.
    pub fn extend<I>(&self, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        self.lock().extend(messages);
    }

    /// Takes every queued message, leaving the queue empty.
    ///
    /// Appends racing with the drain end up entirely in this drain or
    /// entirely in the next one.
    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
