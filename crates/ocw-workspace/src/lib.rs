//! ocw-workspace: tmux sessions and server orchestration for opencode workspaces
//!
//! Everything here talks to the remote host through an
//! [`ocw_ssh::ConnectionManager`], so calls against one server are
//! serialized and retried there.

pub mod orchestrator;
pub mod port;
pub mod probe;
pub mod remote_fs;
pub mod tmux;

pub use orchestrator::{spawn_command, WorkspaceOrchestrator};
pub use port::{ListeningLineExtractor, PortExtractor};
pub use probe::{HttpProbe, PortProbe, RemoteHttpProbe};
pub use remote_fs::{RemoteFileInfo, RemoteFs};
pub use tmux::TmuxService;
