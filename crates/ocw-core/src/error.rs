//! Core error types for opencode workspaces

use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy shared by the transport, connection manager and orchestrator.
///
/// Every failure at the transport boundary is normalized into one of these
/// kinds before it reaches the orchestrator, so no russh or I/O error type
/// leaks upward.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    /// Dial, handshake or channel failure
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),

    /// Credential rejected or unusable
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Remote command exited non-zero, timed out or was cancelled
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Host key rejected by the host key policy
    #[error("Host fingerprint mismatch: {0}")]
    FingerprintMismatch(String),

    /// Server port already claimed by another process
    #[error("Port collision: {0}")]
    PortCollision(String),

    /// Server did not come up within the polling budget
    #[error("Spawn timeout: {0}")]
    SpawnTimeout(String),

    /// Lock file left behind by a dead server
    #[error("Stale lock detected: {0}")]
    StaleLock(String),
}

impl WorkspaceError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            WorkspaceError::ConnectionFailed(_) => "connection_failed",
            WorkspaceError::AuthenticationFailed(_) => "authentication_failed",
            WorkspaceError::CommandFailed(_) => "command_failed",
            WorkspaceError::FingerprintMismatch(_) => "fingerprint_mismatch",
            WorkspaceError::PortCollision(_) => "port_collision",
            WorkspaceError::SpawnTimeout(_) => "spawn_timeout",
            WorkspaceError::StaleLock(_) => "stale_lock",
        }
    }

    /// Error used when a caller cancels `operation` at a suspension point
    pub fn cancelled(operation: &str) -> Self {
        WorkspaceError::CommandFailed(format!("{} was cancelled", operation))
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}
