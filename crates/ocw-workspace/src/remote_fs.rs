//! Remote file browsing used when picking a workspace directory

use std::cmp::Ordering;
use std::sync::Arc;

use ocw_core::sanitize::shell_quote;
use ocw_core::WorkspaceError;
use ocw_ssh::ConnectionManager;

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileInfo {
    /// File name, may contain spaces
    pub name: String,
    /// Full remote path
    pub path: String,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Size in bytes as reported by `ls`
    pub size: u64,
    /// Permission string, e.g. `drwxr-xr-x`
    pub permissions: String,
}

/// Directory browsing on one server
#[derive(Clone)]
pub struct RemoteFs {
    manager: Arc<ConnectionManager>,
}

impl RemoteFs {
    /// Browse through `manager`
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// The login user's `$HOME`, `/` when the shell reports nothing
    pub async fn home_directory(&self) -> Result<String, WorkspaceError> {
        let home = self.manager.exec_clean("echo \"$HOME\"").await?;
        Ok(if home.is_empty() { "/".to_string() } else { home })
    }

    /// Entries of `path`, directories first, then by name ignoring case
    pub async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFileInfo>, WorkspaceError> {
        tracing::info!("Listing directory: {}", path);
        let output = self
            .manager
            .exec_clean(&format!("ls -la {} 2>/dev/null", shell_quote(path)))
            .await?;

        if output.is_empty() {
            tracing::error!("Cannot access directory: {}", path);
            return Err(WorkspaceError::CommandFailed(format!(
                "Cannot access directory: {}",
                path
            )));
        }

        let files = parse_listing(&output, path);
        tracing::info!("Found {} items in directory: {}", files.len(), path);
        Ok(files)
    }
}

/// Parse `ls -la` output for the directory `base`
pub fn parse_listing(output: &str, base: &str) -> Vec<RemoteFileInfo> {
    let mut files: Vec<RemoteFileInfo> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("total "))
        .filter_map(|line| parse_line(line, base))
        .collect();

    files.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
    files
}

fn parse_line(line: &str, base: &str) -> Option<RemoteFileInfo> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return None;
    }

    let name = fields[8..].join(" ");
    if name == "." || name == ".." {
        return None;
    }

    let permissions = fields[0].to_string();
    let path = if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    };

    Some(RemoteFileInfo {
        is_directory: permissions.starts_with('d'),
        size: fields[4].parse().unwrap_or(0),
        permissions,
        path,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
total 24
drwxr-xr-x  5 bob staff  160 Jan 15 10:30 .
drwxr-xr-x 12 bob staff  384 Jan 15 10:00 ..
-rw-r--r--  1 bob staff 1024 Jan 15 10:30 README.md
drwxr-xr-x  3 bob staff   96 Jan 15 10:30 src
-rw-r--r--  1 bob staff   12 Jan 15 10:30 my notes.txt
drwxr-xr-x  3 bob staff   96 Jan 15 10:30 Docs
";

    #[test]
    fn test_directories_first_then_name() {
        let files = parse_listing(LISTING, "/home/bob/app");
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Docs", "src", "my notes.txt", "README.md"]);
    }

    #[test]
    fn test_entry_fields() {
        let files = parse_listing(LISTING, "/home/bob/app/");
        let readme = files.iter().find(|f| f.name == "README.md").unwrap();

        assert_eq!(readme.path, "/home/bob/app/README.md");
        assert_eq!(readme.size, 1024);
        assert_eq!(readme.permissions, "-rw-r--r--");
        assert!(!readme.is_directory);

        let notes = files.iter().find(|f| f.name == "my notes.txt").unwrap();
        assert_eq!(notes.path, "/home/bob/app/my notes.txt");
    }

    #[test]
    fn test_dot_entries_and_short_lines_dropped() {
        let files = parse_listing("total 0\n.\nls: weird line\n", "/");
        assert!(files.is_empty());
    }
}
