//! Core trait definitions

mod auth;
mod connection;
mod probe;

pub use auth::{AuthMethod, AuthStrategy, Credential, CredentialStore, HostKeyPolicy};
pub use connection::{RemoteConnection, Transport};
pub use probe::HealthProbe;
