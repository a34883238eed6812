//! Deterministic tmux session naming
//!
//! Session names are derived from the workspace identity so that a client
//! restarting from scratch finds the same session again without keeping a
//! table of names anywhere.

use sha2::{Digest, Sha256};

/// Prefix shared by every session this tool creates
pub const SESSION_PREFIX: &str = "ocw";

/// Stable 8-character digest of a remote path
pub fn hash8(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    hex::encode(&digest[..4])
}

/// Session name for a workspace: `ocw-<user>-<host>-<hash8(path)>`
pub fn session_name(user: &str, host: &str, path: &str) -> String {
    format!("{}-{}-{}-{}", SESSION_PREFIX, user, host, hash8(path))
}
