//! Configuration loading and per-server wiring shared by the commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio_util::sync::CancellationToken;

use ocw_core::config::{self, ConfigFile};
use ocw_core::{ConfigError, ServerConfiguration, Workspace};
use ocw_ssh::{ConnectionManager, PinnedHostKeys, SshTransport, StoredCredentials};

/// Everything a command needs: the loaded config and a shutdown token
pub struct AppContext {
    /// Path the configuration was read from
    pub path: PathBuf,
    /// Loaded configuration, defaults when the file does not exist
    pub config: ConfigFile,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl AppContext {
    /// Load the config at `path`, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config::default_config_path);

        let config = match config::load_config::<ConfigFile>(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!("No config at {:?}, using defaults", path);
                ConfigFile::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load config from {:?}", path))
            }
        };

        Ok(Self {
            path,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Look up a configured server by id or name
    pub fn server(&self, key: &str) -> Result<&ServerConfiguration> {
        let server = self
            .config
            .server(key)
            .ok_or_else(|| anyhow!("Unknown server '{}' (see `ocw config show`)", key))?;
        server
            .validate()
            .with_context(|| format!("Server '{}' is misconfigured", server.name))?;
        Ok(server)
    }

    /// Look up a configured workspace and the server it runs on
    pub fn workspace(&self, key: &str) -> Result<(&Workspace, &ServerConfiguration)> {
        let workspace = self
            .config
            .workspace(key)
            .ok_or_else(|| anyhow!("Unknown workspace '{}' (see `ocw config show`)", key))?;
        let server = self.config.server_for(workspace).ok_or_else(|| {
            anyhow!(
                "No server configured for {}@{} (workspace '{}')",
                workspace.user,
                workspace.host,
                workspace.name
            )
        })?;
        server
            .validate()
            .with_context(|| format!("Server '{}' is misconfigured", server.name))?;
        Ok((workspace, server))
    }

    /// Connection manager for `server`, using configured host key pins
    pub fn manager(&self, server: &ServerConfiguration) -> Arc<ConnectionManager> {
        let settings = self.config.settings.clone();
        let transport = SshTransport::new(
            Arc::new(StoredCredentials::default()),
            Arc::new(PinnedHostKeys::from_servers(&self.config.servers)),
        )
        .with_connect_timeout(settings.connect_timeout);

        Arc::new(
            ConnectionManager::new(server.clone(), Arc::new(transport), settings)
                .with_cancellation(self.cancel.clone()),
        )
    }
}
