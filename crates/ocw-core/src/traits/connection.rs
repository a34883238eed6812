//! Transport traits

use async_trait::async_trait;
use std::time::Duration;

use crate::error::WorkspaceError;
use crate::types::ServerConfiguration;

/// An authenticated connection to a remote host that can run commands
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    /// Run `command` in a fresh session channel and return its stdout.
    ///
    /// Non-zero exit yields `CommandFailed` with captured stderr. Expiry of
    /// `timeout` yields `CommandFailed("timeout")`.
    async fn exec(&self, command: &str, timeout: Duration) -> Result<String, WorkspaceError>;

    /// Whether the underlying connection is still usable
    fn is_active(&self) -> bool;

    /// Close the connection. Best effort, never fails.
    async fn close(&self);
}

/// Dials authenticated connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open and authenticate a new connection
    async fn connect(
        &self,
        config: &ServerConfiguration,
    ) -> Result<Box<dyn RemoteConnection>, WorkspaceError>;

    /// One-shot execution: dial, run `command`, close
    async fn execute(
        &self,
        command: &str,
        config: &ServerConfiguration,
        timeout: Duration,
    ) -> Result<String, WorkspaceError> {
        let connection = self.connect(config).await?;
        let result = connection.exec(command, timeout).await;
        connection.close().await;
        result
    }
}
