//! Scripted remote host shared by the integration tests
#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ocw_core::config::Settings;
use ocw_core::sanitize::END_MARKER;
use ocw_core::traits::{RemoteConnection, Transport};
use ocw_core::{ServerConfiguration, Workspace, WorkspaceError};
use ocw_ssh::ConnectionManager;

/// Mutable state of the fake host
#[derive(Debug, Default)]
pub struct HostState {
    /// Live tmux sessions
    pub sessions: BTreeSet<String>,
    /// Contents of daemon.json, if present
    pub daemon: Option<String>,
    /// Whether the lock file exists
    pub lock: bool,
    /// `(n, port)`: the listening line shows up from the n-th log poll on
    pub announce: Option<(u32, u16)>,
    /// Ports that answer HTTP
    pub healthy: HashSet<u16>,
    /// Lines already in live.log, oldest first
    pub log: Vec<String>,
    /// Times live.log was truncated
    pub log_truncations: u32,
    /// Number of 50-line log polls
    pub polls: u32,
    /// Commands typed into tmux windows
    pub keys_sent: Vec<String>,
    /// Every unwrapped command, in order
    pub commands: Vec<String>,
    pub fail_rm: bool,
    pub fail_kill: bool,
    pub fail_daemon_write: bool,
}

/// A remote host that answers marker-wrapped commands from its state
#[derive(Default)]
pub struct FakeHost {
    pub state: Mutex<HostState>,
    pub refuse_connections: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state(f: impl FnOnce(&mut HostState)) -> Arc<Self> {
        let host = Self::new();
        f(&mut host.state.lock().unwrap());
        host
    }

    pub fn polls(&self) -> u32 {
        self.state.lock().unwrap().polls
    }

    pub fn keys_sent(&self) -> Vec<String> {
        self.state.lock().unwrap().keys_sent.clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn run(&self, command: &str) -> Result<String, WorkspaceError> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.to_string());

        if command.starts_with("tmux has-session") && command.contains("echo exists") {
            let name = first_quoted(command);
            let found = state.sessions.contains(&name);
            return Ok(if found { "exists" } else { "missing" }.to_string());
        }
        if command.contains("tmux new-session -d -s") {
            let name = first_quoted(command);
            state.sessions.insert(name);
            return Ok(String::new());
        }
        if command.starts_with("tmux kill-session") {
            if state.fail_kill {
                return Err(WorkspaceError::CommandFailed("tmux: server exited".into()));
            }
            let name = first_quoted(command);
            state.sessions.remove(&name);
            return Ok(String::new());
        }
        if command.starts_with("tmux list-sessions") {
            let names: Vec<&str> = state.sessions.iter().map(String::as_str).collect();
            return Ok(names.join("\n"));
        }
        if command.starts_with("tmux send-keys") {
            state.keys_sent.push(command.to_string());
            return Ok(String::new());
        }
        if command.starts_with("test -f") {
            return Ok(state.daemon.clone().unwrap_or_else(|| "{}".to_string()));
        }
        if command.starts_with("mkdir -p") && command.contains("daemon.json") {
            if state.fail_daemon_write {
                return Err(WorkspaceError::CommandFailed("read-only file system".into()));
            }
            state.daemon = quoted_values(command).get(1).cloned();
            return Ok(String::new());
        }
        if command.starts_with("mkdir -p") {
            if command.contains(": >") && command.contains("live.log") {
                state.log.clear();
                state.log_truncations += 1;
            }
            return Ok(String::new());
        }
        if command.starts_with("tail -n 50 ") {
            state.polls += 1;
            let mut lines = state.log.clone();
            lines.push("opencode booting".to_string());
            if let Some((from_poll, port)) = state.announce {
                if state.polls >= from_poll {
                    lines.push(format!(
                        "INFO opencode server listening on http://127.0.0.1:{}",
                        port
                    ));
                }
            }
            let skip = lines.len().saturating_sub(50);
            return Ok(lines[skip..].join("\n"));
        }
        if command.starts_with("tail -n ") {
            return Ok(state.log.join("\n"));
        }
        if command.starts_with("rm -f") {
            if state.fail_rm {
                return Err(WorkspaceError::CommandFailed("permission denied".into()));
            }
            state.daemon = None;
            state.lock = false;
            return Ok(String::new());
        }
        if command.starts_with("curl") {
            let port: u16 = command
                .split("127.0.0.1:")
                .nth(1)
                .and_then(|rest| rest.split('/').next())
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            let code = if state.healthy.contains(&port) { "200" } else { "000" };
            return Ok(code.to_string());
        }
        if command == "echo \"$HOME\"" {
            return Ok("/home/bob".to_string());
        }
        if command.starts_with("ls -la") {
            return Ok(String::new());
        }
        Ok(String::new())
    }
}

/// Contents of every single-quoted word in `command`
fn quoted_values(command: &str) -> Vec<String> {
    command
        .split('\'')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, v)| v.to_string())
        .collect()
}

fn first_quoted(command: &str) -> String {
    quoted_values(command).into_iter().next().unwrap_or_default()
}

/// Undo the marker wrapping: returns `(start_marker, command)`
fn unwrap_marked(command: &str) -> Option<(String, String)> {
    let quoted = command.strip_prefix("sh -c '")?.strip_suffix('\'')?;
    let inner = quoted.replace(r"'\''", "'");
    let (start_echo, rest) = inner.split_once("; ")?;
    let body = rest.strip_suffix(&format!("; echo \"{}\"", END_MARKER))?;
    let start = start_echo.strip_prefix("echo ")?.trim_matches('"').to_string();
    Some((start, body.to_string()))
}

pub struct FakeConnection {
    host: Arc<FakeHost>,
}

#[async_trait]
impl RemoteConnection for FakeConnection {
    async fn exec(&self, command: &str, _timeout: Duration) -> Result<String, WorkspaceError> {
        let (start, body) = unwrap_marked(command)
            .ok_or_else(|| WorkspaceError::CommandFailed(format!("unmarked: {}", command)))?;
        let payload = self.host.run(&body)?;
        Ok(format!(
            "Last login: Mon Jan 15 10:00:00\nmotd: welcome\n{}\n{}\n{}\n",
            start, payload, END_MARKER
        ))
    }

    fn is_active(&self) -> bool {
        true
    }

    async fn close(&self) {}
}

pub struct FakeTransport(pub Arc<FakeHost>);

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(
        &self,
        config: &ServerConfiguration,
    ) -> Result<Box<dyn RemoteConnection>, WorkspaceError> {
        if self.0.refuse_connections.load(Ordering::SeqCst) {
            return Err(WorkspaceError::ConnectionFailed(format!(
                "failed to connect to {}:{}: connection refused",
                config.host, config.port
            )));
        }
        Ok(Box::new(FakeConnection {
            host: Arc::clone(&self.0),
        }))
    }
}

pub fn server() -> ServerConfiguration {
    let mut config = ServerConfiguration::new("dev", "dev.example.com", "bob");
    config.credential = "hunter2".into();
    config
}

pub fn workspace() -> Workspace {
    Workspace::new("api", "dev.example.com", "bob", "/srv/api")
}

pub fn manager(host: &Arc<FakeHost>) -> ConnectionManager {
    ConnectionManager::new(
        server(),
        Arc::new(FakeTransport(Arc::clone(host))),
        Settings::default(),
    )
}
