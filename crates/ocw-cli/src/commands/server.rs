//! Server commands: sessions, ls, home, test

use anyhow::{Context, Result};

use ocw_workspace::{RemoteFs, TmuxService};

use crate::context::AppContext;
use crate::output::{format_files, format_sessions, print_error, print_success};

/// List tmux sessions on a server
pub async fn sessions_command(ctx: &AppContext, key: &str) -> Result<()> {
    let server = ctx.server(key)?;
    let tmux = TmuxService::new(ctx.manager(server));

    let names = tmux
        .list_sessions()
        .await
        .with_context(|| format!("Failed to list tmux sessions on {}", server.name))?;
    println!("{}", format_sessions(&names));
    Ok(())
}

/// List a remote directory, the login directory by default
pub async fn ls_command(ctx: &AppContext, key: &str, path: Option<&str>) -> Result<()> {
    let server = ctx.server(key)?;
    let fs = RemoteFs::new(ctx.manager(server));

    let path = match path {
        Some(path) => path.to_string(),
        None => fs.home_directory().await?,
    };
    let files = fs.list_directory(&path).await?;

    println!("{}:", path);
    println!("{}", format_files(&files));
    Ok(())
}

/// Print the remote home directory
pub async fn home_command(ctx: &AppContext, key: &str) -> Result<()> {
    let server = ctx.server(key)?;
    let fs = RemoteFs::new(ctx.manager(server));

    println!("{}", fs.home_directory().await?);
    Ok(())
}

/// Dial and authenticate once, without retries
pub async fn test_command(ctx: &AppContext, key: &str) -> Result<()> {
    let server = ctx.server(key)?;
    let manager = ctx.manager(server);

    match manager.test_connection().await {
        Ok(()) => {
            print_success(&format!(
                "Connected to {}@{}:{}",
                server.username, server.host, server.port
            ));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Connection to {} failed: {}", server.name, e));
            Err(e.into())
        }
    }
}
