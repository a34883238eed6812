//! opencode workspaces CLI
//!
//! Attach to (or spawn) opencode servers inside tmux sessions on remote
//! development machines over SSH.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocw_cli::commands;
use ocw_cli::context::AppContext;

#[derive(Parser)]
#[command(name = "ocw")]
#[command(author, version, about = "Remote opencode workspaces over SSH and tmux", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "OCW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach to a workspace's opencode server, spawning it if needed
    Attach {
        /// Workspace name or id
        workspace: String,
    },

    /// Remove cached server state and the tmux session, then attach again
    Clean {
        /// Workspace name or id
        workspace: String,
    },

    /// Show the last lines of a workspace's server log
    Logs {
        /// Workspace name or id
        workspace: String,
    },

    /// List tmux sessions on a server
    Sessions {
        /// Server name or id
        server: String,
    },

    /// List a directory on a server
    Ls {
        /// Server name or id
        server: String,
        /// Remote directory (defaults to the home directory)
        path: Option<String>,
    },

    /// Print the home directory on a server
    Home {
        /// Server name or id
        server: String,
    },

    /// Test SSH connectivity and authentication
    Test {
        /// Server name or id
        server: String,
    },

    /// Print the tmux session name derived for a workspace
    SessionName {
        /// Remote user
        user: String,
        /// Remote host
        host: String,
        /// Remote project path
        path: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show config file path
    Path,
    /// Show configured servers, workspaces and settings
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let ctx = AppContext::load(cli.config.as_deref())?;

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Attach { workspace } => commands::attach_command(&ctx, &workspace).await,
        Commands::Clean { workspace } => commands::clean_command(&ctx, &workspace).await,
        Commands::Logs { workspace } => commands::logs_command(&ctx, &workspace).await,
        Commands::Sessions { server } => commands::sessions_command(&ctx, &server).await,
        Commands::Ls { server, path } => {
            commands::ls_command(&ctx, &server, path.as_deref()).await
        }
        Commands::Home { server } => commands::home_command(&ctx, &server).await,
        Commands::Test { server } => commands::test_command(&ctx, &server).await,
        Commands::SessionName { user, host, path } => {
            commands::session_name_command(&user, &host, &path)
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => commands::config_path(&ctx),
            ConfigAction::Show => commands::config_show(&ctx),
        },
    }
}
