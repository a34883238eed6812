//! ocw-cli: Command-line interface for opencode workspaces
//!
//! Provides the `ocw` binary for attaching to, spawning and inspecting
//! opencode servers running in tmux on remote machines.

pub mod commands;
pub mod context;
pub mod output;
