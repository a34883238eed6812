//! Authentication and host key strategies for the SSH transport

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use ocw_core::traits::{AuthMethod, AuthStrategy, Credential, CredentialStore, HostKeyPolicy};
use ocw_core::{AuthMode, ServerConfiguration, ServerId, WorkspaceError};

/// Methods the russh transport can perform
pub const SUPPORTED_METHODS: [AuthMethod; 2] = [AuthMethod::Password, AuthMethod::PublicKey];

/// Prefix marking a credential reference as an environment variable name
const ENV_PREFIX: &str = "env:";

/// Resolves credential references of the form `env:NAME` from the process
/// environment; any other reference is returned as-is.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialStore;

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn resolve_credential(
        &self,
        id: &ServerId,
        reference: &str,
    ) -> Result<String, WorkspaceError> {
        match reference.strip_prefix(ENV_PREFIX) {
            Some(var) => std::env::var(var).map_err(|_| {
                WorkspaceError::AuthenticationFailed(format!(
                    "credential for server {} expects ${} to be set",
                    id, var
                ))
            }),
            None => Ok(reference.to_string()),
        }
    }
}

/// Offers the credential a server's configuration names, resolved through
/// a [`CredentialStore`].
pub struct StoredCredentials<S> {
    store: S,
}

impl<S: CredentialStore> StoredCredentials<S> {
    /// Wrap a credential store
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl Default for StoredCredentials<EnvCredentialStore> {
    fn default() -> Self {
        Self::new(EnvCredentialStore)
    }
}

#[async_trait]
impl<S: CredentialStore> AuthStrategy for StoredCredentials<S> {
    async fn offer_credential(
        &self,
        config: &ServerConfiguration,
        available: &[AuthMethod],
    ) -> Result<Credential, WorkspaceError> {
        let wanted = match config.auth {
            AuthMode::Password => AuthMethod::Password,
            AuthMode::Key => AuthMethod::PublicKey,
        };
        if !available.contains(&wanted) {
            return Err(WorkspaceError::AuthenticationFailed(format!(
                "{} authentication is not available for {}",
                config.auth, config.host
            )));
        }

        let secret = self
            .store
            .resolve_credential(&config.id, &config.credential)
            .await?;
        if secret.is_empty() {
            return Err(WorkspaceError::AuthenticationFailed(format!(
                "no {} configured for {}",
                config.auth, config.name
            )));
        }

        Ok(match config.auth {
            AuthMode::Password => Credential::Password(secret),
            AuthMode::Key => Credential::PrivateKey {
                path: expand_home(&secret),
                passphrase: None,
            },
        })
    }
}

/// Expand a leading `~/` to the user's home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Accepts every host key
#[derive(Debug, Clone, Default)]
pub struct AcceptAllHostKeys;

impl HostKeyPolicy for AcceptAllHostKeys {
    fn accept_host_key(&self, host: &str, port: u16, fingerprint: &str) -> bool {
        tracing::debug!("Accepting host key {} for {}:{}", fingerprint, host, port);
        true
    }
}

/// Enforces pinned fingerprints for endpoints that have one and accepts the
/// rest. Pins are per `(host, port)`.
#[derive(Debug, Clone, Default)]
pub struct PinnedHostKeys {
    pins: HashMap<(String, u16), String>,
}

impl PinnedHostKeys {
    /// Pin nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `fingerprint` for `host:port`
    pub fn pin(
        mut self,
        host: impl Into<String>,
        port: u16,
        fingerprint: impl Into<String>,
    ) -> Self {
        self.pins.insert((host.into(), port), fingerprint.into());
        self
    }

    /// Collect pins from every server that configures a host key
    pub fn from_servers<'a>(servers: impl IntoIterator<Item = &'a ServerConfiguration>) -> Self {
        servers
            .into_iter()
            .filter_map(|s| {
                s.host_key.as_ref().map(|key| {
                    let (host, port) = s.address();
                    (host, port, key.clone())
                })
            })
            .fold(Self::new(), |pins, (host, port, key)| pins.pin(host, port, key))
    }
}

fn normalize_fingerprint(fingerprint: &str) -> &str {
    let trimmed = fingerprint.trim();
    trimmed.strip_prefix("SHA256:").unwrap_or(trimmed)
}

impl HostKeyPolicy for PinnedHostKeys {
    fn accept_host_key(&self, host: &str, port: u16, fingerprint: &str) -> bool {
        match self.pins.get(&(host.to_string(), port)) {
            Some(expected) => {
                let matches =
                    normalize_fingerprint(expected) == normalize_fingerprint(fingerprint);
                if !matches {
                    tracing::warn!(
                        "Host key differs from pinned key for {}:{}: expected {}, got {}",
                        host,
                        port,
                        expected,
                        fingerprint
                    );
                }
                matches
            }
            None => {
                tracing::debug!(
                    "No pinned host key for {}:{}, accepting {}",
                    host,
                    port,
                    fingerprint
                );
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(auth: AuthMode, credential: &str) -> ServerConfiguration {
        let mut config = ServerConfiguration::new("dev", "dev.example.com", "bob");
        config.auth = auth;
        config.credential = credential.to_string();
        config
    }

    #[tokio::test]
    async fn test_literal_password_is_offered() {
        let strategy = StoredCredentials::default();
        let cred = strategy
            .offer_credential(&server(AuthMode::Password, "hunter2"), &SUPPORTED_METHODS)
            .await
            .unwrap();
        assert_eq!(cred, Credential::Password("hunter2".into()));
    }

    #[tokio::test]
    async fn test_key_path_is_offered() {
        let strategy = StoredCredentials::default();
        let cred = strategy
            .offer_credential(&server(AuthMode::Key, "/keys/id_ed25519"), &SUPPORTED_METHODS)
            .await
            .unwrap();
        assert_eq!(
            cred,
            Credential::PrivateKey {
                path: PathBuf::from("/keys/id_ed25519"),
                passphrase: None
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_method_is_rejected() {
        let strategy = StoredCredentials::default();
        let result = strategy
            .offer_credential(
                &server(AuthMode::Password, "hunter2"),
                &[AuthMethod::PublicKey],
            )
            .await;
        assert!(matches!(result, Err(WorkspaceError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_env_credential() {
        let strategy = StoredCredentials::default();
        let result = strategy
            .offer_credential(
                &server(AuthMode::Password, "env:OCW_TEST_SURELY_UNSET_VARIABLE"),
                &SUPPORTED_METHODS,
            )
            .await;
        assert!(matches!(result, Err(WorkspaceError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_pinned_host_keys() {
        let mut pinned = server(AuthMode::Password, "x");
        pinned.host_key = Some("SHA256:abc123".into());
        let policy = PinnedHostKeys::from_servers([&pinned]);

        assert!(policy.accept_host_key("dev.example.com", 22, "abc123"));
        assert!(!policy.accept_host_key("dev.example.com", 22, "zzz999"));
        assert!(policy.accept_host_key("other.example.com", 22, "zzz999"));
    }

    #[test]
    fn test_pins_are_per_port() {
        let mut main = server(AuthMode::Password, "x");
        main.host_key = Some("SHA256:main111".into());
        let mut container = server(AuthMode::Password, "x");
        container.port = 2222;
        container.host_key = Some("SHA256:cont222".into());
        let policy = PinnedHostKeys::from_servers([&main, &container]);

        assert!(policy.accept_host_key("dev.example.com", 22, "main111"));
        assert!(!policy.accept_host_key("dev.example.com", 22, "cont222"));
        assert!(policy.accept_host_key("dev.example.com", 2222, "cont222"));
        assert!(!policy.accept_host_key("dev.example.com", 2222, "main111"));
    }
}
