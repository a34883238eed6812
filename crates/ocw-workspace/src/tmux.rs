//! tmux session service
//!
//! Every operation runs through the owning [`ConnectionManager`] and the
//! marker protocol, so login-shell noise never reaches the parsers here.

use std::sync::Arc;

use ocw_core::sanitize::shell_quote;
use ocw_core::WorkspaceError;
use ocw_ssh::ConnectionManager;

/// Output the existence probe prints for a live session
const EXISTS: &str = "exists";

/// tmux operations against one server
#[derive(Clone)]
pub struct TmuxService {
    manager: Arc<ConnectionManager>,
}

impl TmuxService {
    /// Create a service over `manager`
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Connection manager this service runs on
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Whether a session called `name` exists
    pub async fn has_session(&self, name: &str) -> Result<bool, WorkspaceError> {
        let output = self.manager.exec_clean(&has_session_command(name)).await?;
        Ok(output == EXISTS)
    }

    /// Create a detached session rooted at `path` unless one already exists
    pub async fn new_session(&self, name: &str, path: &str) -> Result<(), WorkspaceError> {
        tracing::info!("Ensuring tmux session {} in {}", name, path);
        self.manager
            .exec_clean(&new_session_command(name, Some(path)))
            .await?;
        Ok(())
    }

    /// Kill `name`; a missing session is not an error
    pub async fn kill_session(&self, name: &str) -> Result<(), WorkspaceError> {
        tracing::info!("Killing tmux session {}", name);
        self.manager.exec_clean(&kill_session_command(name)).await?;
        Ok(())
    }

    /// Kill `name` if present, then create it fresh in the login directory
    pub async fn new_or_replace(&self, name: &str) -> Result<(), WorkspaceError> {
        self.kill_session(name).await?;
        tracing::info!("Creating fresh tmux session {}", name);
        self.manager
            .exec_clean(&new_session_command(name, None))
            .await?;
        Ok(())
    }

    /// Names of all sessions on the server, empty when no tmux server runs
    pub async fn list_sessions(&self) -> Result<Vec<String>, WorkspaceError> {
        let output = self
            .manager
            .exec_clean("tmux list-sessions -F '#{session_name}' 2>/dev/null || true")
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Type `command` into window 0 of `name` and press enter
    pub async fn send_keys(&self, name: &str, command: &str) -> Result<(), WorkspaceError> {
        tracing::debug!("Sending keys to {}:0", name);
        self.manager
            .exec_clean(&send_keys_command(name, command))
            .await?;
        Ok(())
    }
}

pub(crate) fn has_session_command(name: &str) -> String {
    format!(
        "tmux has-session -t {} 2>/dev/null && echo {} || echo missing",
        shell_quote(name),
        EXISTS
    )
}

pub(crate) fn new_session_command(name: &str, path: Option<&str>) -> String {
    let name = shell_quote(name);
    let create = match path {
        Some(path) => format!("tmux new-session -d -s {} -c {}", name, shell_quote(path)),
        None => format!("tmux new-session -d -s {}", name),
    };
    format!("tmux has-session -t {} 2>/dev/null || {}", name, create)
}

pub(crate) fn kill_session_command(name: &str) -> String {
    format!("tmux kill-session -t {} 2>/dev/null || true", shell_quote(name))
}

pub(crate) fn send_keys_command(name: &str, command: &str) -> String {
    format!(
        "tmux send-keys -t {} {} C-m",
        shell_quote(&format!("{}:0", name)),
        shell_quote(command)
    )
}
