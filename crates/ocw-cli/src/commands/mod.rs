//! CLI command implementations

mod config;
mod server;
mod workspace;

pub use config::{config_path, config_show};
pub use server::{home_command, ls_command, sessions_command, test_command};
pub use workspace::{attach_command, clean_command, logs_command, session_name_command};
