//! Connection manager façade.
//!
//! The `ConnectionManager` owns the single connection state of the client,
//! starts and stops the background workers, and exposes the operations the
//! front-end calls. Construct exactly one per process at startup and share it
//! by `Arc`.

use crate::adapter::{inbound_channel, InboundReceiver, InboundSender, TransportAdapter};
use crate::config::ConnectionConfig;
use crate::error::{status, LinkError, OperationResult};
use crate::link::{Endpoint, SharedLink};
use crate::poll::{abort_reconnect, PollLoop, ReconnectSlot};
use crate::queue::Message;
use crate::status::ConnectionState;
use crate::stop::StopSignal;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle on the running poll loop of the current session.
#[derive(Debug)]
struct PollWorker {
    stop: StopSignal,
    handle: JoinHandle<()>,
    reconnect: ReconnectSlot,
}

impl PollWorker {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Coordinates the transport adapter, the poll and reconnect loops, and the
/// message queue.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new) then [`install_adapter`](Self::install_adapter)
///    (or [`with_adapter`](Self::with_adapter))
/// 2. [`connect`](Self::connect) starts the poll loop
/// 3. The consumer drains [`get_messages`](Self::get_messages) at its own pace
/// 4. [`disconnect`](Self::disconnect) or [`cleanup`](Self::cleanup)
///
/// Public operations never return errors; failures come back as an
/// [`OperationResult`] with `success == false`.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    adapter: OnceCell<Arc<dyn TransportAdapter>>,
    shared: Arc<SharedLink>,
    inbound_tx: InboundSender,
    inbound_rx: Arc<Mutex<InboundReceiver>>,
    worker: tokio::sync::Mutex<Option<PollWorker>>,
    sessions: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager without a transport adapter.
    ///
    /// Until an adapter is installed, `connect` fails with
    /// "Transport adapter not loaded".
    pub fn new(config: ConnectionConfig) -> Self {
        let (inbound_tx, inbound_rx) = inbound_channel();
        Self {
            config,
            adapter: OnceCell::new(),
            shared: Arc::new(SharedLink::default()),
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            worker: tokio::sync::Mutex::new(None),
            sessions: AtomicU64::new(0),
        }
    }

    /// Creates a manager and installs `adapter` in one step.
    pub fn with_adapter(
        config: ConnectionConfig,
        adapter: Arc<dyn TransportAdapter>,
    ) -> Result<Self, LinkError> {
        let manager = Self::new(config);
        manager.install_adapter(adapter)?;
        Ok(manager)
    }

    /// Installs the transport adapter and registers the inbound sink with it.
    ///
    /// An adapter can be installed once; later calls fail with
    /// [`LinkError::AdapterAlreadyLoaded`].
    pub fn install_adapter(&self, adapter: Arc<dyn TransportAdapter>) -> Result<(), LinkError> {
        if self.adapter.get().is_some() {
            return Err(LinkError::AdapterAlreadyLoaded);
        }
        adapter.register_inbound(self.inbound_tx.clone())?;
        self.adapter
            .set(adapter)
            .map_err(|_| LinkError::AdapterAlreadyLoaded)?;
        debug!("Transport adapter installed");
        Ok(())
    }

    fn adapter(&self) -> Result<&Arc<dyn TransportAdapter>, LinkError> {
        self.adapter.get().ok_or(LinkError::AdapterUnavailable)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Cached connection state, as last written by the manager or a worker.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Host and port of the last successful `connect`, used for reconnection.
    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.shared.lock().endpoint.clone()
    }

    /// Whether a poll loop is currently running.
    pub async fn is_polling(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(PollWorker::is_running)
    }

    /// Number of poll loops started over the manager's lifetime.
    pub fn poll_sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Connects to the game server.
    ///
    /// # Arguments
    ///
    /// * `host` - Server host, or the configured default when `None`
    /// * `port` - Server port, or the configured default when `None`
    ///
    /// # Returns
    ///
    /// Success only if the adapter returned status `0` and reports the
    /// connection as up right after. On success the endpoint is remembered
    /// for reconnection and the poll loop is started unless already running.
    pub async fn connect(&self, host: Option<&str>, port: Option<u16>) -> OperationResult {
        match self.try_connect(host, port).await {
            Ok(endpoint) => {
                info!("🔗 Connected to {}", endpoint);
                OperationResult::ok("Connected")
            }
            Err(e) => {
                warn!("Connect failed: {}", e);
                e.into()
            }
        }
    }

    async fn try_connect(&self, host: Option<&str>, port: Option<u16>) -> Result<Endpoint, LinkError> {
        let adapter = self.adapter()?;
        let endpoint = Endpoint::new(
            host.filter(|h| !h.trim().is_empty())
                .unwrap_or(self.config.host.as_str()),
            port.filter(|p| *p != 0).unwrap_or(self.config.port),
        );

        if self.shared.state() == ConnectionState::Reconnecting {
            return Err(LinkError::ReconnectInProgress);
        }

        let code = adapter.connect(&endpoint.host, endpoint.port).await?;
        if code != status::OK || !adapter.is_connected()? {
            return Err(LinkError::ConnectFailure { code });
        }

        {
            let mut link = self.shared.lock();
            // The poll loop may have seen the link drop while connecting.
            if link.state == ConnectionState::Reconnecting {
                return Err(LinkError::ReconnectInProgress);
            }
            link.state = ConnectionState::Connected;
            link.endpoint = Some(endpoint.clone());
        }
        self.ensure_polling(adapter).await;
        Ok(endpoint)
    }

    async fn ensure_polling(&self, adapter: &Arc<dyn TransportAdapter>) {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(PollWorker::is_running) {
            return;
        }

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let stop = StopSignal::new();
        let reconnect = ReconnectSlot::default();
        let handle = PollLoop::new(
            Arc::clone(adapter),
            Arc::clone(&self.shared),
            Arc::clone(&self.inbound_rx),
            stop.clone(),
            Arc::clone(&reconnect),
            self.config.clone(),
            session,
        )
        .spawn();
        *worker = Some(PollWorker {
            stop,
            handle,
            reconnect,
        });
    }

    /// Stops the current session's workers, waiting at most the configured
    /// join timeout before aborting them.
    async fn stop_workers(&self) {
        let Some(mut worker) = self.worker.lock().await.take() else {
            return;
        };

        worker.stop.raise();
        let join_timeout = self.config.join_timeout();
        match tokio::time::timeout(join_timeout, &mut worker.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Poll loop ended abnormally: {}", e),
            Err(_) => {
                warn!("Poll loop did not stop within {:?}, aborting", join_timeout);
                worker.handle.abort();
            }
        }
        // A reconnect attempt stuck in the adapter must not outlive its session.
        abort_reconnect(&worker.reconnect);
    }

    /// Disconnects from the server and stops the poll and reconnect loops.
    ///
    /// Fails with "Not connected" when no session is active. Errors from the
    /// adapter's disconnect are logged and otherwise ignored.
    pub async fn disconnect(&self) -> OperationResult {
        let Ok(adapter) = self.adapter() else {
            return LinkError::NotConnected.into();
        };
        if !self.shared.state().has_session() {
            return LinkError::NotConnected.into();
        }

        self.stop_workers().await;
        match adapter.disconnect().await {
            Ok(code) if code != status::OK => warn!("Adapter disconnect returned {}", code),
            Ok(_) => {}
            Err(e) => warn!("Adapter disconnect failed: {}", e),
        }
        self.shared.lock().state = ConnectionState::Disconnected;

        info!("👋 Disconnected");
        OperationResult::ok("Disconnected")
    }

    /// Sends one payload to the server.
    pub async fn send(&self, payload: &str) -> OperationResult {
        match self.try_send(payload).await {
            Ok(()) => OperationResult::ok_silent(),
            Err(e) => {
                debug!("Send rejected: {}", e);
                e.into()
            }
        }
    }

    async fn try_send(&self, payload: &str) -> Result<(), LinkError> {
        let adapter = self.adapter()?;
        if self.shared.state() != ConnectionState::Connected {
            return Err(LinkError::NotConnected);
        }
        match adapter.send(payload).await? {
            status::OK => Ok(()),
            code => Err(LinkError::SendFailure { code }),
        }
    }

    /// Ground-truth connection status straight from the adapter.
    ///
    /// A missing adapter or a faulting query counts as disconnected.
    pub fn is_connected(&self) -> bool {
        let Ok(adapter) = self.adapter() else {
            return false;
        };
        adapter.is_connected().unwrap_or_else(|e| {
            debug!("Connection query failed: {}", e);
            false
        })
    }

    /// Takes every pending message, oldest first.
    pub fn get_messages(&self) -> Vec<Message> {
        self.shared.queue.drain()
    }

    /// Stops all workers and closes the connection if it is still up.
    ///
    /// Idempotent and safe to call at shutdown; once everything is stopped
    /// further calls do nothing.
    pub async fn cleanup(&self) {
        debug!("Cleaning up connection manager");
        self.stop_workers().await;

        if let Ok(adapter) = self.adapter() {
            if adapter.is_connected().unwrap_or(false) {
                if let Err(e) = adapter.disconnect().await {
                    warn!("Adapter disconnect during cleanup failed: {}", e);
                }
                info!("🧹 Connection closed during cleanup");
            }
        }

        let mut link = self.shared.lock();
        if link.state != ConnectionState::Disconnected {
            debug!("State {:?} -> Disconnected", link.state);
            link.state = ConnectionState::Disconnected;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Workers exit at their next tick; nothing here can block.
        if let Some(worker) = self.worker.get_mut().take() {
            worker.stop.raise();
            abort_reconnect(&worker.reconnect);
        }
    }
}
