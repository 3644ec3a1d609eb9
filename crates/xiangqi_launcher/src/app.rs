//! Launcher lifecycle.
//!
//! The `Application` owns the one `ConnectionManager` of the process. It
//! connects, forwards each input line to the server, prints everything the
//! server (or the reconnect logic) queued, and cleans up on the way out.

use crate::config::{AdapterKind, AdapterSettings, AppConfig};
use crate::signals::wait_for_shutdown_signal;
use session_link::{
    ConnectionManager, ConnectionStatus, LinkError, NativeAdapter, StatusEnvelope, TcpAdapter,
    TransportAdapter,
};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// How often queued messages are printed.
pub const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Builds the transport adapter selected in the configuration.
pub fn build_adapter(settings: &AdapterSettings) -> Result<Arc<dyn TransportAdapter>, LinkError> {
    match settings.kind {
        AdapterKind::Tcp => Ok(Arc::new(TcpAdapter::new())),
        AdapterKind::Native => {
            let adapter = NativeAdapter::load(&settings.library_path)?;
            info!("🔌 Native transport bound to {}", adapter.path().display());
            Ok(Arc::new(adapter))
        }
    }
}

pub struct Application {
    config: AppConfig,
    manager: Arc<ConnectionManager>,
}

impl Application {
    /// Validates the configuration and wires the adapter into a fresh
    /// connection manager.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let adapter = build_adapter(&config.adapter)?;
        Self::with_adapter(config, adapter)
    }

    /// Like [`new`](Self::new) with a caller-supplied adapter.
    pub fn with_adapter(
        config: AppConfig,
        adapter: Arc<dyn TransportAdapter>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let manager = ConnectionManager::with_adapter(config.connection.clone(), adapter)?;
        Ok(Self {
            config,
            manager: Arc::new(manager),
        })
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Runs against stdin/stdout until a shutdown signal or end of input.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let input = BufReader::new(tokio::io::stdin());
        let mut output = std::io::stdout();
        self.run_with(input, &mut output, wait_for_shutdown_signal())
            .await
    }

    /// Runs one session over the given input and output.
    ///
    /// Returns an error if the initial connection fails. Cleanup runs on
    /// every exit path after a successful connect.
    pub async fn run_with<R, W, S>(
        self,
        input: R,
        output: &mut W,
        shutdown: S,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    {
        let connection = &self.config.connection;
        info!(
            "🌟 Connecting to {}:{} via {} adapter",
            connection.host, connection.port, self.config.adapter.kind
        );

        let result = self.manager.connect(None, None).await;
        if !result.success {
            self.manager.cleanup().await;
            let reason = result.message.unwrap_or_else(|| "Connection failed".to_string());
            return Err(format!(
                "Could not connect to {}:{}: {reason}",
                connection.host, connection.port
            )
            .into());
        }

        let session = self.session_loop(input, output, shutdown).await;
        self.manager.cleanup().await;
        info!("👋 Launcher stopped");
        session
    }

    async fn session_loop<R, W, S>(
        &self,
        input: R,
        output: &mut W,
        shutdown: S,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    {
        let mut lines = input.lines();
        let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    signal?;
                    break;
                }
                line = lines.next_line() => match line? {
                    Some(line) => self.forward(&line).await,
                    None => {
                        info!("📭 Input closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if self.drain(output)? {
                        break;
                    }
                }
            }
        }

        // Print whatever arrived since the last tick.
        self.drain(output)?;
        Ok(())
    }

    async fn forward(&self, line: &str) {
        let payload = line.trim();
        if payload.is_empty() {
            return;
        }
        let result = self.manager.send(payload).await;
        if !result.success {
            warn!(
                "⚠️ Send failed: {}",
                result.message.as_deref().unwrap_or("unknown error")
            );
        }
    }

    /// Prints every queued message. Returns `true` once the reconnect window
    /// has expired and the session cannot recover.
    fn drain<W: Write>(&self, output: &mut W) -> std::io::Result<bool> {
        let mut gave_up = false;
        for message in self.manager.get_messages() {
            if let Some(status) = StatusEnvelope::parse(&message) {
                gave_up |= report_status(&status);
            }
            writeln!(output, "{message}")?;
        }
        output.flush()?;
        Ok(gave_up)
    }
}

fn report_status(status: &ConnectionStatus) -> bool {
    match status {
        ConnectionStatus::Reconnecting {
            attempt: Some(attempt),
            remaining,
            ..
        } => {
            info!(
                "🔄 Reconnect attempt {} ({}s left)",
                attempt,
                remaining.unwrap_or_default()
            );
            false
        }
        ConnectionStatus::Reconnecting { timeout, .. } => {
            warn!(
                "📴 Connection lost, retrying for up to {}s",
                timeout.unwrap_or_default()
            );
            false
        }
        ConnectionStatus::Reconnected { attempts } => {
            info!("✅ Reconnected after {} attempts", attempts);
            false
        }
        ConnectionStatus::ReconnectFailed { reason } => {
            error!("❌ Reconnect failed: {}", reason);
            true
        }
    }
}
