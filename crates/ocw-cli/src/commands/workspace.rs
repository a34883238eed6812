//! Workspace commands: attach, clean, logs

use anyhow::{bail, Result};
use futures::StreamExt;

use ocw_core::{SpawnResult, Workspace, WorkspaceOnlineState};
use ocw_workspace::WorkspaceOrchestrator;

use crate::context::AppContext;
use crate::output::{format_phase, format_spawn_result, print_error, print_info, print_success};

/// Attach to a workspace's server, spawning it if needed
pub async fn attach_command(ctx: &AppContext, key: &str) -> Result<()> {
    let (workspace, server) = ctx.workspace(key)?;
    let orchestrator = WorkspaceOrchestrator::new(ctx.manager(server));

    print_info(&format!(
        "Attaching to {} on {}@{}",
        workspace.name, server.username, server.host
    ));
    let result = with_progress(&orchestrator, orchestrator.attach_or_spawn(workspace)).await;
    report(workspace, &result)
}

/// Remove cached server state and the tmux session, then attach again
pub async fn clean_command(ctx: &AppContext, key: &str) -> Result<()> {
    let (workspace, server) = ctx.workspace(key)?;
    let orchestrator = WorkspaceOrchestrator::new(ctx.manager(server));

    print_info(&format!("Cleaning {} and retrying", workspace.name));
    let result = with_progress(&orchestrator, orchestrator.clean_and_retry(workspace)).await;
    report(workspace, &result)
}

/// Print the tail of a workspace's server log
pub async fn logs_command(ctx: &AppContext, key: &str) -> Result<()> {
    let (workspace, server) = ctx.workspace(key)?;
    let orchestrator = WorkspaceOrchestrator::new(ctx.manager(server));

    let mut lines = orchestrator.live_output(workspace).await;
    while let Some(line) = lines.next().await {
        println!("{}", line);
    }
    Ok(())
}

/// Print the tmux session name derived for a workspace
pub fn session_name_command(user: &str, host: &str, path: &str) -> Result<()> {
    println!("{}", ocw_core::session_name(user, host, path));
    Ok(())
}

/// Print each phase change while `attempt` runs
async fn with_progress(
    orchestrator: &WorkspaceOrchestrator,
    attempt: impl std::future::Future<Output = SpawnResult>,
) -> SpawnResult {
    let mut states = orchestrator.subscribe();
    tokio::pin!(attempt);

    loop {
        tokio::select! {
            result = &mut attempt => return result,
            Ok(()) = states.changed() => {
                let state = states.borrow_and_update().clone();
                if let WorkspaceOnlineState::Spawning(phase) = state {
                    print_info(&format_phase(phase));
                }
            }
        }
    }
}

fn report(workspace: &Workspace, result: &SpawnResult) -> Result<()> {
    let summary = format_spawn_result(workspace, result);
    if result.online {
        print_success(&summary);
        Ok(())
    } else {
        print_error(&summary);
        bail!("workspace '{}' did not come online", workspace.name)
    }
}
