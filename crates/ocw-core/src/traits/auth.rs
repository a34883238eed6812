//! Authentication and host key strategies
//!
//! Both strategies are passed explicitly into the transport when it is
//! built; nothing about authentication lives in ambient callback state.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::error::WorkspaceError;
use crate::types::{ServerConfiguration, ServerId};

/// Authentication methods the transport knows how to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// `password`
    Password,
    /// `publickey`
    PublicKey,
}

/// Secret material offered to the server
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Plain password
    Password(String),
    /// Private key on the local filesystem
    PrivateKey {
        /// Key file path
        path: PathBuf,
        /// Passphrase protecting the key
        passphrase: Option<String>,
    },
}

impl Credential {
    /// Method this credential authenticates with
    pub fn method(&self) -> AuthMethod {
        match self {
            Credential::Password(_) => AuthMethod::Password,
            Credential::PrivateKey { .. } => AuthMethod::PublicKey,
        }
    }
}

// Keeps secrets out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => write!(f, "Password(***)"),
            Credential::PrivateKey { path, .. } => {
                write!(f, "PrivateKey({})", path.display())
            }
        }
    }
}

/// Chooses the credential to offer for a server
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Pick a credential for `config` among `available` methods
    async fn offer_credential(
        &self,
        config: &ServerConfiguration,
        available: &[AuthMethod],
    ) -> Result<Credential, WorkspaceError>;
}

/// Decides whether a server's host key is acceptable
pub trait HostKeyPolicy: Send + Sync {
    /// Return true to accept `fingerprint` presented by `host:port`
    fn accept_host_key(&self, host: &str, port: u16, fingerprint: &str) -> bool;
}

/// Resolves a server's opaque credential reference to its secret
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Secret for the server identified by `id`
    async fn resolve_credential(
        &self,
        id: &ServerId,
        reference: &str,
    ) -> Result<String, WorkspaceError>;
}
