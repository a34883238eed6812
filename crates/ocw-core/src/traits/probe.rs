//! Health probe trait

use async_trait::async_trait;

use crate::types::Workspace;

/// Answers "is the server on this port responding"
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the server for `workspace` listening on `port`
    async fn probe(&self, port: u16, workspace: &Workspace) -> bool;
}
