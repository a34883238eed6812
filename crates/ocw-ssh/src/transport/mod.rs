//! russh-backed transport

mod connector;

pub use connector::{SshConnection, SshTransport};
