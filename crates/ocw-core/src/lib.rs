//! ocw-core: Core abstractions and configuration for opencode workspaces
//!
//! This crate provides the shared domain types, the error taxonomy, the
//! command sanitizer and the seam traits used by the SSH transport, the
//! workspace orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod naming;
pub mod sanitize;
pub mod traits;
pub mod types;

pub use error::{ConfigError, WorkspaceError};
pub use naming::session_name;
pub use types::{
    AuthMode, DaemonRecord, ServerConfiguration, ServerId, SpawnPhase, SpawnResult, Workspace,
    WorkspaceOnlineState,
};
