//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ConfigError, WorkspaceError};
use crate::naming::session_name;

/// Directory under a workspace's remote path that holds server state
pub const STATE_DIR: &str = ".opencode";

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default idle TTL for a workspace, in minutes
pub const DEFAULT_IDLE_TTL_MINUTES: u32 = 30;

/// Unique identifier for a configured server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub String);

impl ServerId {
    /// Create a new server ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random server ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a server expects the client to authenticate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Password authentication
    #[default]
    Password,
    /// Public key authentication with a private key file
    Key,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Password => write!(f, "password"),
            AuthMode::Key => write!(f, "key"),
        }
    }
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Connection settings for one SSH server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    /// Stable identity
    pub id: ServerId,

    /// Display name
    pub name: String,

    /// Hostname or address
    pub host: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Login user
    pub username: String,

    /// Authentication mode
    #[serde(default)]
    pub auth: AuthMode,

    /// Opaque credential reference, resolved by the credential store.
    ///
    /// For key authentication this is the private key path.
    #[serde(default)]
    pub credential: String,

    /// Expected host key fingerprint, if pinned
    #[serde(default)]
    pub host_key: Option<String>,

    /// Keep the connection warm between operations
    #[serde(default)]
    pub should_maintain_connection: bool,
}

impl ServerConfiguration {
    /// Create a password-authenticated configuration
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: ServerId::generate(),
            name: name.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            auth: AuthMode::Password,
            credential: String::new(),
            host_key: None,
            should_maintain_connection: false,
        }
    }

    /// `host:port` pair used for dialing
    pub fn address(&self) -> (String, u16) {
        let port = if self.port == 0 {
            DEFAULT_SSH_PORT
        } else {
            self.port
        };
        (self.host.clone(), port)
    }

    /// Check that the configuration is complete enough to dial
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("host".into()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("username".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid(format!(
                "port must be between 1 and 65535, got {}",
                self.port
            )));
        }
        if self.credential.trim().is_empty() {
            let field = match self.auth {
                AuthMode::Password => "password",
                AuthMode::Key => "private key path",
            };
            return Err(ConfigError::MissingField(field.into()));
        }
        Ok(())
    }

    /// Whether `validate` succeeds
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// A named remote development target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Stable identity
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Remote host
    pub host: String,
    /// Remote user
    pub user: String,
    /// Project directory on the remote host
    pub remote_path: String,
    /// Explicit tmux session name; derived from user/host/path when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux_session: Option<String>,
    /// Minutes of inactivity before the server may be reaped
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_minutes: u32,
}

fn default_idle_ttl() -> u32 {
    DEFAULT_IDLE_TTL_MINUTES
}

impl Workspace {
    /// Create a workspace with a derived tmux session name
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        user: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            host: host.into(),
            user: user.into(),
            remote_path: remote_path.into(),
            tmux_session: None,
            idle_ttl_minutes: DEFAULT_IDLE_TTL_MINUTES,
        }
    }

    /// The tmux session this workspace's server lives in
    pub fn tmux_session(&self) -> String {
        match &self.tmux_session {
            Some(name) if !name.is_empty() => name.clone(),
            _ => session_name(&self.user, &self.host, &self.remote_path),
        }
    }

    /// Remote directory holding the daemon record, log and lock
    pub fn state_dir(&self) -> String {
        format!("{}/{}", self.remote_path.trim_end_matches('/'), STATE_DIR)
    }

    /// Remote path of `daemon.json`
    pub fn daemon_record_path(&self) -> String {
        format!("{}/daemon.json", self.state_dir())
    }

    /// Remote path of `live.log`
    pub fn live_log_path(&self) -> String {
        format!("{}/live.log", self.state_dir())
    }

    /// Remote path of the lock marker
    pub fn lock_path(&self) -> String {
        format!("{}/lock", self.state_dir())
    }
}

/// Last known port of a spawned server, cached on the remote host.
///
/// Advisory only: a port read from here is never acted on without a fresh
/// health probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRecord {
    /// Port the server announced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl DaemonRecord {
    /// Record for a known port
    pub fn with_port(port: u16) -> Self {
        Self { port: Some(port) }
    }

    /// Parse the remote file contents.
    ///
    /// Anything unparseable is treated as an empty record.
    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content.trim()).unwrap_or_default()
    }

    /// Compact JSON form, e.g. `{"port":8080}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Progress phase reported while attaching or spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnPhase {
    /// Establishing the SSH connection and tmux session
    Ssh,
    /// Launching the server process
    Launch,
    /// Waiting for the server to answer
    Health,
    /// Attaching to an already running server
    Attach,
}

impl SpawnPhase {
    /// All phases in display order
    pub const ALL: [SpawnPhase; 4] = [
        SpawnPhase::Ssh,
        SpawnPhase::Launch,
        SpawnPhase::Health,
        SpawnPhase::Attach,
    ];

    /// Human readable progress text
    pub fn description(&self) -> &'static str {
        match self {
            SpawnPhase::Ssh => "Establishing SSH connection...",
            SpawnPhase::Launch => "Launching opencode server...",
            SpawnPhase::Health => "Waiting for health check...",
            SpawnPhase::Attach => "Attaching to session...",
        }
    }

    /// Fraction of the attach flow completed when this phase starts
    pub fn progress(&self) -> f64 {
        match self {
            SpawnPhase::Ssh => 0.25,
            SpawnPhase::Launch => 0.5,
            SpawnPhase::Health => 0.75,
            SpawnPhase::Attach => 1.0,
        }
    }
}

impl fmt::Display for SpawnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnPhase::Ssh => write!(f, "SSH"),
            SpawnPhase::Launch => write!(f, "Launch"),
            SpawnPhase::Health => write!(f, "Health"),
            SpawnPhase::Attach => write!(f, "Attach"),
        }
    }
}

/// Lifecycle of a workspace's server as seen by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkspaceOnlineState {
    /// Nothing attempted yet
    #[default]
    Idle,
    /// Attach or spawn in progress
    Spawning(SpawnPhase),
    /// Server answering on the given port
    Online(u16),
    /// Last attempt failed
    Error(String),
}

impl WorkspaceOnlineState {
    /// Whether this is `Online` or `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkspaceOnlineState::Online(_) | WorkspaceOnlineState::Error(_)
        )
    }
}

impl fmt::Display for WorkspaceOnlineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceOnlineState::Idle => write!(f, "idle"),
            WorkspaceOnlineState::Spawning(phase) => write!(f, "spawning ({})", phase),
            WorkspaceOnlineState::Online(port) => write!(f, "online on port {}", port),
            WorkspaceOnlineState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Outcome of one orchestration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnResult {
    /// Port the server answers on, 0 when offline
    pub port: u16,
    /// Whether the server passed its health probe
    pub online: bool,
    /// Why the attempt failed
    pub error: Option<WorkspaceError>,
}

impl SpawnResult {
    /// Successful attempt
    pub fn online(port: u16) -> Self {
        Self {
            port,
            online: true,
            error: None,
        }
    }

    /// Failed attempt
    pub fn failed(error: WorkspaceError) -> Self {
        Self {
            port: 0,
            online: false,
            error: Some(error),
        }
    }

    /// State value the attempt leaves the workspace in
    pub fn state(&self) -> WorkspaceOnlineState {
        match (&self.error, self.online) {
            (None, true) => WorkspaceOnlineState::Online(self.port),
            (Some(err), _) => WorkspaceOnlineState::Error(err.to_string()),
            (None, false) => WorkspaceOnlineState::Error("server offline".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_server() -> ServerConfiguration {
        let mut config = ServerConfiguration::new("dev", "dev.example.com", "bob");
        config.credential = "hunter2".into();
        config
    }

    #[test]
    fn test_server_validation() {
        assert!(valid_server().is_valid());

        let mut missing_host = valid_server();
        missing_host.host = "   ".into();
        assert!(matches!(
            missing_host.validate(),
            Err(ConfigError::MissingField(f)) if f == "host"
        ));

        let mut zero_port = valid_server();
        zero_port.port = 0;
        assert!(matches!(zero_port.validate(), Err(ConfigError::Invalid(_))));

        let mut no_key = valid_server();
        no_key.auth = AuthMode::Key;
        no_key.credential = String::new();
        assert!(matches!(
            no_key.validate(),
            Err(ConfigError::MissingField(f)) if f == "private key path"
        ));
    }

    #[test]
    fn test_server_port_defaults_when_omitted() {
        let config: ServerConfiguration = toml::from_str(
            r#"
            id = "dev"
            name = "dev"
            host = "dev.example.com"
            username = "bob"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 22);
        assert_eq!(config.auth, AuthMode::Password);
        assert!(!config.should_maintain_connection);
    }

    #[test]
    fn test_workspace_paths() {
        let ws = Workspace::new("app", "dev.example.com", "bob", "/home/bob/app/");
        assert_eq!(ws.state_dir(), "/home/bob/app/.opencode");
        assert_eq!(ws.daemon_record_path(), "/home/bob/app/.opencode/daemon.json");
        assert_eq!(ws.live_log_path(), "/home/bob/app/.opencode/live.log");
        assert_eq!(ws.lock_path(), "/home/bob/app/.opencode/lock");
        assert_eq!(ws.idle_ttl_minutes, 30);
    }

    #[test]
    fn test_workspace_session_derived_unless_set() {
        let mut ws = Workspace::new("app", "dev.example.com", "bob", "/home/bob/app");
        assert_eq!(
            ws.tmux_session(),
            session_name("bob", "dev.example.com", "/home/bob/app")
        );

        ws.tmux_session = Some("custom".into());
        assert_eq!(ws.tmux_session(), "custom");
    }

    #[test]
    fn test_daemon_record_parse() {
        assert_eq!(DaemonRecord::parse(r#"{"port": 8080}"#).port, Some(8080));
        assert_eq!(DaemonRecord::parse("{}").port, None);
        assert_eq!(DaemonRecord::parse("not json").port, None);
        assert_eq!(DaemonRecord::with_port(51535).to_json(), r#"{"port":51535}"#);
    }

    #[test]
    fn test_spawn_phase_progress_is_ordered() {
        let progress: Vec<f64> = SpawnPhase::ALL.iter().map(|p| p.progress()).collect();
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(SpawnPhase::Launch.to_string(), "Launch");
    }

    #[test]
    fn test_spawn_result_state() {
        assert_eq!(SpawnResult::online(8080).state(), WorkspaceOnlineState::Online(8080));

        let failed = SpawnResult::failed(WorkspaceError::SpawnTimeout("timeout".into()));
        assert_eq!(failed.port, 0);
        assert!(matches!(failed.state(), WorkspaceOnlineState::Error(_)));
        assert!(failed.state().is_terminal());
        assert!(!WorkspaceOnlineState::Spawning(SpawnPhase::Ssh).is_terminal());
    }
}
