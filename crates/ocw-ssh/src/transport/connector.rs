//! SSH connector and command execution
//!
//! Dials a server with russh, authenticates with whatever the configured
//! [`AuthStrategy`] offers, and runs commands in session channels.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;

use ocw_core::traits::{AuthStrategy, Credential, HostKeyPolicy, RemoteConnection, Transport};
use ocw_core::{ServerConfiguration, WorkspaceError};

use crate::auth::{AcceptAllHostKeys, StoredCredentials, SUPPORTED_METHODS};

/// Default dial + authentication timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extended data stream number carrying stderr
const STDERR_STREAM: u32 = 1;

/// Dials authenticated SSH connections
pub struct SshTransport {
    /// Chooses the credential offered to each server
    auth: Arc<dyn AuthStrategy>,
    /// Accepts or rejects server host keys
    host_keys: Arc<dyn HostKeyPolicy>,
    /// Dial + handshake + authentication timeout
    connect_timeout: Duration,
}

impl SshTransport {
    /// Create a transport with explicit strategies
    pub fn new(auth: Arc<dyn AuthStrategy>, host_keys: Arc<dyn HostKeyPolicy>) -> Self {
        Self {
            auth,
            host_keys,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn authenticate(
        &self,
        session: &mut Handle<ClientHandler>,
        config: &ServerConfiguration,
    ) -> Result<(), WorkspaceError> {
        let credential = self.auth.offer_credential(config, &SUPPORTED_METHODS).await?;
        let method = credential.method();
        tracing::debug!("Authenticating as '{}' with {:?}", config.username, method);

        let accepted = match credential {
            Credential::Password(password) => {
                session
                    .authenticate_password(config.username.as_str(), password)
                    .await
            }
            Credential::PrivateKey { path, passphrase } => {
                let key = russh_keys::load_secret_key(&path, passphrase.as_deref()).map_err(
                    |e| {
                        WorkspaceError::AuthenticationFailed(format!(
                            "failed to load key {}: {}",
                            path.display(),
                            e
                        ))
                    },
                )?;
                session
                    .authenticate_publickey(config.username.as_str(), Arc::new(key))
                    .await
            }
        }
        .map_err(|e| WorkspaceError::AuthenticationFailed(e.to_string()))?;

        if !accepted {
            return Err(WorkspaceError::AuthenticationFailed(format!(
                "{} rejected {:?} authentication for user '{}'",
                config.host, method, config.username
            )));
        }
        Ok(())
    }

    async fn dial(
        &self,
        config: &ServerConfiguration,
    ) -> Result<Handle<ClientHandler>, WorkspaceError> {
        let (host, port) = config.address();
        let handler = ClientHandler::new(host.clone(), port, Arc::clone(&self.host_keys));

        tracing::debug!("Connecting to {}:{}", host, port);
        let mut session = client::connect(Arc::new(Config::default()), (host.as_str(), port), handler)
            .await
            .map_err(|e| classify_connect_error(&host, port, e))?;

        self.authenticate(&mut session, config).await?;
        Ok(session)
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new(
            Arc::new(StoredCredentials::default()),
            Arc::new(AcceptAllHostKeys),
        )
    }
}

/// Map a russh connect failure to the error taxonomy
fn classify_connect_error(host: &str, port: u16, err: anyhow::Error) -> WorkspaceError {
    let host_key_rejected = matches!(
        err.downcast_ref::<russh::Error>(),
        Some(russh::Error::UnknownKey)
    ) || err.to_string().contains("Unknown server key");

    if host_key_rejected {
        WorkspaceError::FingerprintMismatch(format!("host key for {} was rejected", host))
    } else {
        WorkspaceError::ConnectionFailed(format!("failed to connect to {}:{}: {}", host, port, err))
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(
        &self,
        config: &ServerConfiguration,
    ) -> Result<Box<dyn RemoteConnection>, WorkspaceError> {
        let (host, port) = config.address();
        let session = tokio::time::timeout(self.connect_timeout, self.dial(config))
            .await
            .map_err(|_| {
                WorkspaceError::ConnectionFailed(format!(
                    "connection to {}:{} timed out",
                    host, port
                ))
            })??;

        tracing::info!("Connected to {}@{}:{}", config.username, host, port);
        Ok(Box::new(SshConnection { session, host }))
    }
}

/// A live, authenticated SSH connection
pub struct SshConnection {
    /// russh client handle
    session: Handle<ClientHandler>,
    /// Host this connection is bound to (for logs)
    host: String,
}

impl SshConnection {
    async fn run(&self, command: &str) -> Result<String, WorkspaceError> {
        let mut channel = self.session.channel_open_session().await.map_err(|e| {
            WorkspaceError::ConnectionFailed(format!(
                "failed to open session channel on {}: {}",
                self.host, e
            ))
        })?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| WorkspaceError::CommandFailed(format!("exec request failed: {}", e)))?;

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut exit_status: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_STREAM => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        command_output(exit_status, &stdout, &stderr)
    }
}

/// Decide the outcome of a finished command from its exit status and
/// captured streams.
fn command_output(
    exit_status: Option<u32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, WorkspaceError> {
    if exit_status == Some(0) {
        return Ok(String::from_utf8_lossy(stdout).into_owned());
    }

    let message = String::from_utf8_lossy(stderr).trim().to_string();
    let message = if message.is_empty() {
        "no output".to_string()
    } else {
        message
    };
    match exit_status {
        Some(code) => tracing::debug!("Command exited with status {}: {}", code, message),
        None => tracing::debug!("Channel closed without exit status: {}", message),
    }
    Err(WorkspaceError::CommandFailed(message))
}

#[async_trait]
impl RemoteConnection for SshConnection {
    async fn exec(&self, command: &str, timeout: Duration) -> Result<String, WorkspaceError> {
        tracing::debug!("Executing on {}: {}", self.host, command);
        match tokio::time::timeout(timeout, self.run(command)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Command on {} timed out after {:?}", self.host, timeout);
                Err(WorkspaceError::CommandFailed("timeout".to_string()))
            }
        }
    }

    fn is_active(&self) -> bool {
        !self.session.is_closed()
    }

    async fn close(&self) {
        if let Err(e) = self
            .session
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
        {
            tracing::debug!("Ignoring error while closing connection to {}: {}", self.host, e);
        }
    }
}

/// russh client handler delegating host key decisions to a policy
struct ClientHandler {
    /// Host being dialed
    host: String,
    /// Port being dialed
    port: u16,
    /// Host key policy
    policy: Arc<dyn HostKeyPolicy>,
}

impl ClientHandler {
    fn new(host: String, port: u16, policy: Arc<dyn HostKeyPolicy>) -> Self {
        Self { host, port, policy }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("Server host key for {}:{}: {}", self.host, self.port, fingerprint);

        let accepted = self.policy.accept_host_key(&self.host, self.port, &fingerprint);
        if !accepted {
            tracing::error!("Host key verification failed for {}:{}", self.host, self.port);
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_exit_returns_stdout() {
        let out = command_output(Some(0), b"hello\n", b"warning").unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let err = command_output(Some(1), b"", b"tmux: no server running\n").unwrap_err();
        assert_eq!(
            err,
            WorkspaceError::CommandFailed("tmux: no server running".into())
        );
    }

    #[test]
    fn test_missing_exit_status_without_stderr() {
        let err = command_output(None, b"partial", b"").unwrap_err();
        assert_eq!(err, WorkspaceError::CommandFailed("no output".into()));
    }

    #[test]
    fn test_host_key_rejection_is_classified() {
        let err = classify_connect_error("dev", 22, anyhow::Error::new(russh::Error::UnknownKey));
        assert!(matches!(err, WorkspaceError::FingerprintMismatch(_)));

        let err = classify_connect_error("dev", 22, anyhow::anyhow!("connection refused"));
        assert!(matches!(err, WorkspaceError::ConnectionFailed(_)));
    }
}
