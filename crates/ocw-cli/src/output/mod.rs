//! Output formatting for the terminal
//!
//! Tables for remote listings and colored one-line status messages.

use tabled::{settings::Style, Table, Tabled};

use ocw_core::{ServerConfiguration, SpawnPhase, SpawnResult, Workspace};
use ocw_workspace::RemoteFileInfo;

/// Format a directory listing as a table
pub fn format_files(files: &[RemoteFileInfo]) -> String {
    if files.is_empty() {
        return "Directory is empty".to_string();
    }

    #[derive(Tabled)]
    struct FileRow {
        #[tabled(rename = "PERMISSIONS")]
        permissions: String,
        #[tabled(rename = "SIZE")]
        size: String,
        #[tabled(rename = "NAME")]
        name: String,
    }

    let rows: Vec<FileRow> = files
        .iter()
        .map(|f| FileRow {
            permissions: f.permissions.clone(),
            size: if f.is_directory {
                "-".to_string()
            } else {
                format_size(f.size)
            },
            name: if f.is_directory {
                format!("{}/", f.name)
            } else {
                f.name.clone()
            },
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format tmux session names, marking the ones this tool manages
pub fn format_sessions(names: &[String]) -> String {
    if names.is_empty() {
        return "No tmux sessions".to_string();
    }

    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "SESSION")]
        name: String,
        #[tabled(rename = "MANAGED")]
        managed: String,
    }

    let prefix = format!("{}-", ocw_core::naming::SESSION_PREFIX);
    let rows: Vec<SessionRow> = names
        .iter()
        .map(|name| SessionRow {
            name: name.clone(),
            managed: if name.starts_with(&prefix) { "yes" } else { "-" }.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format configured servers and workspaces
pub fn format_config(servers: &[ServerConfiguration], workspaces: &[Workspace]) -> String {
    #[derive(Tabled)]
    struct ServerRow {
        #[tabled(rename = "SERVER")]
        name: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "AUTH")]
        auth: String,
    }

    #[derive(Tabled)]
    struct WorkspaceRow {
        #[tabled(rename = "WORKSPACE")]
        name: String,
        #[tabled(rename = "TARGET")]
        target: String,
        #[tabled(rename = "TMUX SESSION")]
        session: String,
    }

    let mut out = String::new();
    if servers.is_empty() {
        out.push_str("No servers configured\n");
    } else {
        let rows: Vec<ServerRow> = servers
            .iter()
            .map(|s| ServerRow {
                name: s.name.clone(),
                address: format!("{}@{}:{}", s.username, s.host, s.port),
                auth: s.auth.to_string(),
            })
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    if workspaces.is_empty() {
        out.push_str("No workspaces configured");
    } else {
        let rows: Vec<WorkspaceRow> = workspaces
            .iter()
            .map(|w| WorkspaceRow {
                name: w.name.clone(),
                target: format!("{}@{}:{}", w.user, w.host, w.remote_path),
                session: w.tmux_session(),
            })
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    }
    out
}

/// One progress line for a spawn phase, e.g. `[ 50%] Launching opencode server...`
pub fn format_phase(phase: SpawnPhase) -> String {
    format!(
        "[{:>3}%] {}",
        (phase.progress() * 100.0).round() as u32,
        phase.description()
    )
}

/// Summary of an attach attempt
pub fn format_spawn_result(workspace: &Workspace, result: &SpawnResult) -> String {
    match (&result.error, result.online) {
        (None, true) => format!(
            "{} is online on port {} (tmux session {})",
            workspace.name,
            result.port,
            workspace.tmux_session()
        ),
        (Some(err), _) => format!("{} is offline: {}", workspace.name, err),
        (None, false) => format!("{} is offline", workspace.name),
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{}{}", bytes, UNITS[0])
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message to stderr in red
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocw_core::WorkspaceError;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0K");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0M");
    }

    #[test]
    fn test_format_phase() {
        assert_eq!(
            format_phase(SpawnPhase::Launch),
            "[ 50%] Launching opencode server..."
        );
        assert_eq!(format_phase(SpawnPhase::Attach), "[100%] Attaching to session...");
    }

    #[test]
    fn test_empty_listings() {
        assert_eq!(format_files(&[]), "Directory is empty");
        assert_eq!(format_sessions(&[]), "No tmux sessions");
    }

    #[test]
    fn test_sessions_table_marks_managed() {
        let table = format_sessions(&["ocw-bob-dev-1a2b3c4d".to_string(), "scratch".to_string()]);
        assert!(table.contains("ocw-bob-dev-1a2b3c4d"));
        assert!(table.contains("yes"));
        assert!(table.contains("scratch"));
    }

    #[test]
    fn test_spawn_result_summary() {
        let ws = Workspace::new("api", "dev", "bob", "/srv/api");
        let online = format_spawn_result(&ws, &SpawnResult::online(51535));
        assert!(online.starts_with("api is online on port 51535"));

        let failed = format_spawn_result(
            &ws,
            &SpawnResult::failed(WorkspaceError::SpawnTimeout("gave up".into())),
        );
        assert_eq!(failed, "api is offline: Spawn timeout: gave up");
    }
}
