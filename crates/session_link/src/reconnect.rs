//! Fixed-interval reconnection bounded by a wall-clock timeout.
//!
//! Every attempt is announced to the consumer with the attempt number and
//! the whole seconds left, and the episode ends with exactly one
//! `reconnected` or `reconnect_failed` notification unless it is stopped.

use crate::adapter::TransportAdapter;
use crate::error::{describe_connect_code, status, AdapterError, LinkError};
use crate::link::{Endpoint, SharedLink};
use crate::status::{ConnectionState, ConnectionStatus};
use crate::stop::StopSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Phase of a reconnect episode. Everything except `Attempting` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    Attempting,
    Succeeded,
    TimedOut,
    /// Interrupted by the session's stop signal.
    Stopped,
}

pub(crate) struct ReconnectLoop {
    adapter: Arc<dyn TransportAdapter>,
    shared: Arc<SharedLink>,
    stop: StopSignal,
    endpoint: Endpoint,
    timeout: Duration,
    interval: Duration,
    started_at: Instant,
    attempts: u32,
    phase: ReconnectPhase,
}

impl ReconnectLoop {
    pub(crate) fn new(
        adapter: Arc<dyn TransportAdapter>,
        shared: Arc<SharedLink>,
        stop: StopSignal,
        endpoint: Endpoint,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            adapter,
            shared,
            stop,
            endpoint,
            timeout,
            interval,
            started_at: Instant::now(),
            attempts: 0,
            phase: ReconnectPhase::Attempting,
        }
    }

    pub(crate) async fn run(mut self) -> ReconnectPhase {
        info!(
            "🔄 Reconnecting to {} every {}s for up to {}s",
            self.endpoint,
            self.interval.as_secs(),
            self.timeout.as_secs()
        );

        while self.phase == ReconnectPhase::Attempting {
            if self.stop.is_raised() {
                self.finish(ReconnectPhase::Stopped);
                break;
            }

            let elapsed = self.started_at.elapsed();
            if elapsed >= self.timeout {
                self.finish(ReconnectPhase::TimedOut);
                break;
            }

            self.attempts += 1;
            let remaining = self.timeout.saturating_sub(elapsed).as_secs();
            info!("[Reconnect] Attempt {}, {}s remaining...", self.attempts, remaining);
            self.shared
                .queue
                .push(ConnectionStatus::attempt(self.attempts, remaining).to_message());

            let outcome = self.attempt().await;
            if self.stop.is_raised() {
                // Stopped while the attempt was in flight.
                if matches!(outcome, Ok(true)) {
                    self.close_late_link().await;
                }
                self.finish(ReconnectPhase::Stopped);
                break;
            }
            match outcome {
                Ok(true) => {
                    self.finish(ReconnectPhase::Succeeded);
                    break;
                }
                Ok(false) => {}
                Err(e) => warn!("[Reconnect] Attempt {} failed: {}", self.attempts, e),
            }

            if self.stop.wait(self.interval).await {
                self.finish(ReconnectPhase::Stopped);
            }
        }

        self.phase
    }

    async fn attempt(&self) -> Result<bool, AdapterError> {
        let code = self.adapter.connect(&self.endpoint.host, self.endpoint.port).await?;
        if code != status::OK {
            debug!("[Reconnect] Attempt {}: {}", self.attempts, describe_connect_code(code));
            return Ok(false);
        }
        self.adapter.is_connected()
    }

    async fn close_late_link(&self) {
        debug!("[Reconnect] Closing link opened after stop");
        if let Err(e) = self.adapter.disconnect().await {
            warn!("[Reconnect] Closing late link failed: {}", e);
        }
    }

    /// Publishes the terminal phase. State and notification change together
    /// under the link lock.
    fn finish(&mut self, phase: ReconnectPhase) {
        self.phase = phase;
        let mut link = self.shared.lock();
        match phase {
            ReconnectPhase::Succeeded => {
                link.state = ConnectionState::Connected;
                self.shared
                    .queue
                    .push(ConnectionStatus::Reconnected { attempts: self.attempts }.to_message());
                info!("✅ [Reconnect] Success after {} attempts!", self.attempts);
            }
            ReconnectPhase::TimedOut => {
                link.state = ConnectionState::ReconnectFailed;
                self.shared.queue.push(ConnectionStatus::timed_out().to_message());
                warn!(
                    "❌ [Reconnect] {} ({} attempts)",
                    LinkError::ReconnectTimeout(self.timeout.as_secs()),
                    self.attempts
                );
            }
            ReconnectPhase::Stopped => {
                if link.state == ConnectionState::Reconnecting {
                    link.state = ConnectionState::Disconnected;
                }
                debug!("[Reconnect] Stopped after {} attempts", self.attempts);
            }
            ReconnectPhase::Attempting => {}
        }
    }
}
