//! Attach-or-spawn orchestration
//!
//! A [`WorkspaceOrchestrator`] drives one workspace server through
//!
//! ```text
//! Idle -> Spawning(Ssh) -> Spawning(Launch) -> Spawning(Health) -> Online(port)
//!                                                               \-> Error(..)
//! Idle -> Spawning(Ssh) -> Spawning(Attach) -> Online(port)        (fast path)
//! ```
//!
//! The port a spawned server listens on is only ever learned from its own
//! log announcement. `live.log` is truncated before each launch so an
//! earlier run's announcement cannot be mistaken for it. `daemon.json`
//! caches the port for the next attach but is health-probed before it is
//! trusted.

use std::sync::Arc;

use futures::stream::{self, Iter};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use ocw_core::sanitize::shell_quote;
use ocw_core::traits::HealthProbe;
use ocw_core::{
    DaemonRecord, SpawnPhase, SpawnResult, Workspace, WorkspaceError, WorkspaceOnlineState,
};
use ocw_ssh::{cancellable, ConnectionManager};

use crate::port::{ListeningLineExtractor, PortExtractor};
use crate::probe::RemoteHttpProbe;
use crate::tmux::TmuxService;

/// Lines of `live.log` returned by [`WorkspaceOrchestrator::live_output`]
pub const LIVE_OUTPUT_LINES: usize = 200;

/// Drives attach, spawn and recovery for workspaces on one server
pub struct WorkspaceOrchestrator {
    manager: Arc<ConnectionManager>,
    tmux: TmuxService,
    probe: Arc<dyn HealthProbe>,
    extractor: Arc<dyn PortExtractor>,
    state: watch::Sender<WorkspaceOnlineState>,
}

impl WorkspaceOrchestrator {
    /// Orchestrate over `manager`, probing health with remote `curl`
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        let (state, _) = watch::channel(WorkspaceOnlineState::Idle);
        Self {
            tmux: TmuxService::new(Arc::clone(&manager)),
            probe: Arc::new(RemoteHttpProbe::new(Arc::clone(&manager))),
            extractor: Arc::new(ListeningLineExtractor),
            manager,
            state,
        }
    }

    /// Replace the health probe
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the port extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn PortExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Session service sharing this orchestrator's connection
    pub fn tmux(&self) -> &TmuxService {
        &self.tmux
    }

    /// Current state
    pub fn state(&self) -> WorkspaceOnlineState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<WorkspaceOnlineState> {
        self.state.subscribe()
    }

    /// Attach to the workspace's running server or spawn a new one
    pub async fn attach_or_spawn(&self, workspace: &Workspace) -> SpawnResult {
        tracing::info!("Attaching or spawning workspace: {}", workspace.name);
        let result = match self.run_attach(workspace).await {
            Ok(port) => SpawnResult::online(port),
            Err(err) => SpawnResult::failed(self.classify(workspace, err)),
        };
        self.state.send_replace(result.state());
        result
    }

    /// Remove cached state, kill the session, then attach or spawn again.
    ///
    /// Both removals are attempted even when the other fails.
    pub async fn clean_and_retry(&self, workspace: &Workspace) -> SpawnResult {
        tracing::info!("Cleaning and retrying workspace: {}", workspace.name);
        self.set_phase(workspace, SpawnPhase::Ssh);

        let remove = format!(
            "rm -f {} {}",
            shell_quote(&workspace.daemon_record_path()),
            shell_quote(&workspace.lock_path())
        );
        if let Err(e) = self.manager.exec_clean(&remove).await {
            tracing::warn!("Failed to remove state files for {}: {}", workspace.name, e);
        }
        if let Err(e) = self.tmux.kill_session(&workspace.tmux_session()).await {
            tracing::warn!("Failed to kill session for {}: {}", workspace.name, e);
        }

        self.attach_or_spawn(workspace).await
    }

    /// Last lines of the server log, oldest first
    pub async fn live_output(&self, workspace: &Workspace) -> Iter<std::vec::IntoIter<String>> {
        let command = format!(
            "tail -n {} {} 2>/dev/null || true",
            LIVE_OUTPUT_LINES,
            shell_quote(&workspace.live_log_path())
        );
        let lines: Vec<String> = match self.manager.exec_clean(&command).await {
            Ok(output) => output.lines().map(str::to_string).collect(),
            Err(e) => {
                tracing::warn!("Failed to read live output for {}: {}", workspace.name, e);
                Vec::new()
            }
        };
        stream::iter(lines)
    }

    async fn run_attach(&self, workspace: &Workspace) -> Result<u16, WorkspaceError> {
        self.set_phase(workspace, SpawnPhase::Ssh);

        let session = workspace.tmux_session();
        if self.tmux.has_session(&session).await? {
            tracing::info!("Using existing tmux session: {}", session);
        } else {
            tracing::info!("Creating new tmux session: {}", session);
            self.tmux.new_session(&session, &workspace.remote_path).await?;
        }

        if let Some(port) = self.read_daemon_record(workspace).await?.port {
            tracing::info!("Found existing daemon on port {}, checking health", port);
            if self.probe.probe(port, workspace).await {
                tracing::info!("Existing daemon is healthy on port {}", port);
                self.set_phase(workspace, SpawnPhase::Attach);
                return Ok(port);
            }
            tracing::warn!(
                "Existing daemon is unhealthy on port {}, spawning a new instance",
                port
            );
        }

        self.set_phase(workspace, SpawnPhase::Launch);
        self.launch(workspace, &session).await?;

        self.set_phase(workspace, SpawnPhase::Health);
        self.wait_for_port(workspace).await
    }

    async fn read_daemon_record(
        &self,
        workspace: &Workspace,
    ) -> Result<DaemonRecord, WorkspaceError> {
        let path = shell_quote(&workspace.daemon_record_path());
        let content = self
            .manager
            .exec_clean(&format!("test -f {0} && cat {0} || echo '{{}}'", path))
            .await?;
        Ok(DaemonRecord::parse(&content))
    }

    async fn write_daemon_record(&self, workspace: &Workspace, port: u16) {
        let command = format!(
            "mkdir -p {} && echo {} > {}",
            shell_quote(&workspace.state_dir()),
            shell_quote(&DaemonRecord::with_port(port).to_json()),
            shell_quote(&workspace.daemon_record_path())
        );
        if let Err(e) = self.manager.exec_clean(&command).await {
            tracing::warn!("Failed to persist daemon record for {}: {}", workspace.name, e);
        }
    }

    async fn launch(&self, workspace: &Workspace, session: &str) -> Result<(), WorkspaceError> {
        tracing::info!("Spawning opencode server for workspace: {}", workspace.name);
        self.manager
            .exec_clean(&format!(
                "mkdir -p {} && : > {}",
                shell_quote(&workspace.state_dir()),
                shell_quote(&workspace.live_log_path())
            ))
            .await?;
        self.tmux.send_keys(session, &spawn_command(workspace)).await
    }

    /// Poll the log tail until a healthy port is announced or the budget
    /// runs out.
    async fn wait_for_port(&self, workspace: &Workspace) -> Result<u16, WorkspaceError> {
        let settings = self.manager.settings();
        let tail = format!(
            "tail -n {} {} 2>/dev/null || true",
            settings.log_tail_lines,
            shell_quote(&workspace.live_log_path())
        );

        for poll in 1..=settings.poll_attempts {
            match self.manager.exec_clean(&tail).await {
                Ok(log) => {
                    if let Some(port) = self.extractor.extract_port(&log) {
                        tracing::info!(
                            "Server for {} announced port {} (poll {})",
                            workspace.name,
                            port,
                            poll
                        );
                        self.write_daemon_record(workspace, port).await;
                        if self.probe.probe(port, workspace).await {
                            tracing::info!(
                                "OpenCode server started successfully on port {}",
                                port
                            );
                            return Ok(port);
                        }
                        tracing::debug!("Port {} not healthy yet", port);
                    } else {
                        tracing::debug!(
                            "No listening line for {} yet (poll {})",
                            workspace.name,
                            poll
                        );
                    }
                }
                Err(e) if self.cancel().is_cancelled() => return Err(e),
                Err(e) => tracing::warn!(
                    "Failed to read log for {} (poll {}): {}",
                    workspace.name,
                    poll,
                    e
                ),
            }

            if poll < settings.poll_attempts {
                let interval = tokio::time::sleep(settings.poll_interval);
                cancellable(self.cancel(), "spawn", interval).await?;
            }
        }

        tracing::error!(
            "Failed to start opencode server within timeout for workspace: {}",
            workspace.name
        );
        Err(WorkspaceError::SpawnTimeout(
            "Failed to start opencode server within timeout".to_string(),
        ))
    }

    fn cancel(&self) -> &CancellationToken {
        self.manager.cancellation_token()
    }

    fn classify(&self, workspace: &Workspace, err: WorkspaceError) -> WorkspaceError {
        if self.cancel().is_cancelled() {
            tracing::error!("Workspace spawn cancelled for: {}", workspace.name);
            return WorkspaceError::SpawnTimeout("spawn was cancelled".to_string());
        }
        tracing::error!("Attach or spawn failed for {}: {}", workspace.name, err);
        err
    }

    fn set_phase(&self, workspace: &Workspace, phase: SpawnPhase) {
        tracing::info!("{}: {}", workspace.name, phase.description());
        self.state.send_replace(WorkspaceOnlineState::Spawning(phase));
    }
}

/// Command typed into the workspace's tmux window to start the server
pub fn spawn_command(workspace: &Workspace) -> String {
    format!(
        "opencode serve --hostname 127.0.0.1 --port 0 --print-logs | tee -a {}",
        shell_quote(&workspace.live_log_path())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_command_appends_to_live_log() {
        let ws = Workspace::new("api", "dev", "bob", "/srv/api");
        assert_eq!(
            spawn_command(&ws),
            "opencode serve --hostname 127.0.0.1 --port 0 --print-logs | tee -a '/srv/api/.opencode/live.log'"
        );
    }
}
