//! Per-server connection manager
//!
//! A [`ConnectionManager`] is bound to exactly one [`ServerConfiguration`].
//! It owns at most one live connection, dials it lazily, and runs every
//! command through a single async mutex so callers queue behind the
//! in-flight operation instead of opening parallel connections.
//!
//! # Retry policy
//!
//! A failed attempt (dial, authentication or command) closes and discards
//! the connection, sleeps for the next backoff delay and tries again with a
//! fresh dial. With the default settings that is 4 attempts separated by
//! 1s, 2s and 4s. Authentication failures take the same path as network
//! failures.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ocw_core::config::Settings;
use ocw_core::sanitize::MarkedCommand;
use ocw_core::traits::{RemoteConnection, Transport};
use ocw_core::{ServerConfiguration, WorkspaceError};

use crate::backoff::ExponentialBackoff;
use crate::cancel::cancellable;

/// Serialized, retrying access to one server
pub struct ConnectionManager {
    /// Server this manager is bound to
    config: ServerConfiguration,
    /// Dials new connections
    transport: Arc<dyn Transport>,
    /// Timeouts and retry policy
    settings: Settings,
    /// The single connection slot; holding the lock is holding the server
    slot: Mutex<Option<Box<dyn RemoteConnection>>>,
    /// Caller-level cancellation
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Create a manager for `config`
    pub fn new(
        config: ServerConfiguration,
        transport: Arc<dyn Transport>,
        settings: Settings,
    ) -> Self {
        Self {
            config,
            transport,
            settings,
            slot: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` for caller-level cancellation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Server this manager is bound to
    pub fn config(&self) -> &ServerConfiguration {
        &self.config
    }

    /// Settings in effect
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token that cancels in-flight and queued operations
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether a live connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.is_active())
    }

    /// Run `command`, retrying with backoff, and return its raw stdout
    pub async fn exec(&self, command: &str) -> Result<String, WorkspaceError> {
        let mut slot = cancellable(&self.cancel, "connection wait", self.slot.lock()).await?;

        let total_attempts = self.settings.max_retries + 1;
        let mut backoff = ExponentialBackoff::from_config(&self.settings.backoff);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(&mut slot, command).await {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };

            if let Some(conn) = slot.take() {
                conn.close().await;
            }

            if self.cancel.is_cancelled() || attempt >= total_attempts {
                tracing::error!(
                    "Operation on {} failed after {} attempt(s): {}",
                    self.config.host,
                    attempt,
                    err
                );
                return Err(err);
            }

            let delay = backoff.next_delay();
            tracing::warn!(
                "Operation on {} failed (attempt {}/{}), retrying in {:?}: {}",
                self.config.host,
                attempt,
                total_attempts,
                delay,
                err
            );
            cancellable(&self.cancel, "retry", tokio::time::sleep(delay)).await?;
        }
    }

    /// Run `command` through the marker protocol and return only its payload
    pub async fn exec_clean(&self, command: &str) -> Result<String, WorkspaceError> {
        let marked = MarkedCommand::new(command);
        let raw = self.exec(&marked.command).await?;
        Ok(marked.extract(&raw))
    }

    /// Dial, authenticate and close a throwaway connection, without retries
    pub async fn test_connection(&self) -> Result<(), WorkspaceError> {
        tracing::info!(
            "Testing SSH connection to {}:{}",
            self.config.host,
            self.config.port
        );
        let conn = cancellable(
            &self.cancel,
            "connection test",
            self.transport.connect(&self.config),
        )
        .await??;
        conn.close().await;
        tracing::info!("SSH connection test successful to {}", self.config.host);
        Ok(())
    }

    /// Close the held connection, if any
    pub async fn disconnect(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(conn) = slot.take() {
            tracing::debug!("Disconnecting from {}", self.config.host);
            conn.close().await;
        }
    }

    async fn attempt(
        &self,
        slot: &mut Option<Box<dyn RemoteConnection>>,
        command: &str,
    ) -> Result<String, WorkspaceError> {
        let conn = match slot.take() {
            Some(conn) if conn.is_active() => conn,
            stale => {
                if let Some(conn) = stale {
                    conn.close().await;
                }
                tracing::debug!("Creating new SSH connection to {}", self.config.host);
                cancellable(&self.cancel, "connect", self.transport.connect(&self.config))
                    .await??
            }
        };

        let result = cancellable(
            &self.cancel,
            "command",
            conn.exec(command, self.settings.command_timeout),
        )
        .await;
        *slot = Some(conn);
        result?
    }
}
