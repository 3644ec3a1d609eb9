//! Background poll loop.
//!
//! Pumps inbound payloads into the message queue while the transport is up and
//! hands over to the reconnect loop when a live connection silently drops.

use crate::adapter::{InboundReceiver, TransportAdapter};
use crate::config::ConnectionConfig;
use crate::link::{Endpoint, SharedLink};
use crate::reconnect::{ReconnectLoop, ReconnectPhase};
use crate::status::{ConnectionState, ConnectionStatus};
use crate::stop::StopSignal;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

/// Abort handle of the session's current reconnect task, reachable by the
/// manager even after the poll task itself has been aborted.
pub(crate) type ReconnectSlot = Arc<Mutex<Option<AbortHandle>>>;

/// Aborts the reconnect task registered in `slot`, if any.
pub(crate) fn abort_reconnect(slot: &ReconnectSlot) {
    if let Some(handle) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
        handle.abort();
    }
}

pub(crate) struct PollLoop {
    adapter: Arc<dyn TransportAdapter>,
    shared: Arc<SharedLink>,
    inbound: Arc<Mutex<InboundReceiver>>,
    stop: StopSignal,
    reconnect_slot: ReconnectSlot,
    config: ConnectionConfig,
    session: u64,
}

impl PollLoop {
    pub(crate) fn new(
        adapter: Arc<dyn TransportAdapter>,
        shared: Arc<SharedLink>,
        inbound: Arc<Mutex<InboundReceiver>>,
        stop: StopSignal,
        reconnect_slot: ReconnectSlot,
        config: ConnectionConfig,
        session: u64,
    ) -> Self {
        Self {
            adapter,
            shared,
            inbound,
            stop,
            reconnect_slot,
            config,
            session,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        debug!("📡 Poll loop #{} started", self.session);
        let tick = self.config.poll_interval();
        let mut was_connected = false;
        let mut reconnect: Option<JoinHandle<ReconnectPhase>> = None;

        while !self.stop.is_raised() {
            let connected = self.adapter.is_connected().unwrap_or_else(|e| {
                debug!("Connection query failed: {}", e);
                false
            });

            if connected {
                was_connected = true;
                self.pump().await;
            } else if was_connected {
                if let Some(endpoint) = self.begin_reconnect() {
                    was_connected = false;
                    if let Some(previous) = reconnect.take() {
                        // Already out of `Reconnecting`, so it is finishing up.
                        match previous.await {
                            Ok(phase) => debug!("Previous reconnect loop ended in {:?}", phase),
                            Err(e) => warn!("Previous reconnect loop ended abnormally: {}", e),
                        }
                    }
                    reconnect = Some(self.spawn_reconnect(endpoint));
                }
            }

            if self.stop.wait(tick).await {
                break;
            }
        }

        if let Some(handle) = reconnect {
            match handle.await {
                Ok(phase) => debug!("Reconnect loop ended in {:?}", phase),
                Err(e) => warn!("Reconnect loop ended abnormally: {}", e),
            }
        }
        debug!("Poll loop #{} stopped", self.session);
    }

    async fn pump(&self) {
        match self.adapter.pump_messages().await {
            Ok(code) if code < 0 => debug!("Pump reported status {}", code),
            Ok(_) => {}
            Err(e) => warn!("Pumping inbound messages failed: {}", e),
        }
        self.forward_inbound();
    }

    /// Moves everything the adapter delivered into the consumer queue.
    fn forward_inbound(&self) {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = Vec::new();
        while let Ok(message) = inbound.try_recv() {
            batch.push(message);
        }
        if !batch.is_empty() {
            self.shared.queue.extend(batch);
        }
    }

    /// Claims the connection state for a new reconnect episode.
    ///
    /// Returns `None` when an episode is already active.
    fn begin_reconnect(&self) -> Option<Endpoint> {
        let mut link = self.shared.lock();
        if link.state == ConnectionState::Reconnecting {
            return None;
        }

        warn!("🔌 Connection lost! Starting auto-reconnect...");
        link.state = ConnectionState::Reconnecting;
        self.shared
            .queue
            .push(ConnectionStatus::connection_lost(self.config.reconnect_timeout_secs).to_message());

        Some(
            link.endpoint
                .clone()
                .unwrap_or_else(|| Endpoint::new(self.config.host.clone(), self.config.port)),
        )
    }

    fn spawn_reconnect(&self, endpoint: Endpoint) -> JoinHandle<ReconnectPhase> {
        let worker = ReconnectLoop::new(
            Arc::clone(&self.adapter),
            Arc::clone(&self.shared),
            self.stop.clone(),
            endpoint,
            self.config.reconnect_timeout(),
            self.config.reconnect_interval(),
        );
        let handle = tokio::spawn(worker.run());
        *self
            .reconnect_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle.abort_handle());
        handle
    }
}
