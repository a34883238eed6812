//! ocw-ssh: SSH plumbing for opencode workspaces
//!
//! Dials authenticated SSH connections with russh, runs one command per
//! session channel, and wraps a connection per server in a
//! [`ConnectionManager`] that serializes access and retries with
//! exponential backoff.

pub mod auth;
pub mod backoff;
pub mod cancel;
pub mod manager;
pub mod transport;

pub use auth::{AcceptAllHostKeys, EnvCredentialStore, PinnedHostKeys, StoredCredentials};
pub use backoff::ExponentialBackoff;
pub use cancel::cancellable;
pub use manager::ConnectionManager;
pub use transport::{SshConnection, SshTransport};
