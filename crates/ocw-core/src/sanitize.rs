//! Marker protocol for clean remote command output
//!
//! Login shells print banners, module loads and rc-file traces ahead of the
//! real output. Wrapping the command between two echoed markers lets us cut
//! the payload back out of whatever the shell produced around it.

use rand::Rng;

/// Prefix of the start marker; a random token is appended per invocation
pub const START_MARKER_PREFIX: &str = "OPENCODER_START_";

/// End marker
pub const END_MARKER: &str = "OPENCODER_END";

/// A command wrapped in start/end markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedCommand {
    /// Full command line to send to the remote shell
    pub command: String,
    /// Marker echoed before the payload
    pub start_marker: String,
    /// Marker echoed after the payload
    pub end_marker: String,
}

impl MarkedCommand {
    /// Wrap `command` with a freshly generated start marker
    pub fn new(command: &str) -> Self {
        Self::with_token(command, &random_token())
    }

    /// Wrap `command` using a caller supplied token
    pub fn with_token(command: &str, token: &str) -> Self {
        let start_marker = format!("{}{}", START_MARKER_PREFIX, token);
        let end_marker = END_MARKER.to_string();
        let inner = format!("echo \"{}\"; {}; echo \"{}\"", start_marker, command, end_marker);
        Self {
            command: format!("sh -c {}", shell_quote(&inner)),
            start_marker,
            end_marker,
        }
    }

    /// Extract the payload from the raw output of `self.command`
    pub fn extract(&self, output: &str) -> String {
        sanitize(output, &self.start_marker, &self.end_marker)
    }
}

/// Eight random hex characters
pub fn random_token() -> String {
    let value: u32 = rand::thread_rng().gen();
    format!("{:08X}", value)
}

/// Quote `value` for a POSIX shell using single quotes
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Cut the payload between `start` and `end` markers out of `output`.
///
/// Lines are matched by containment, not equality: any line containing the
/// start marker is dropped, and the first line containing the end marker
/// after capture began ends the scan, discarding that line and the rest of
/// the input. A line containing both markers before capture began starts
/// the capture and is dropped.
pub fn sanitize(output: &str, start: &str, end: &str) -> String {
    let mut capturing = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in output.lines() {
        if !capturing {
            if line.contains(start) {
                capturing = true;
            }
            continue;
        }
        if line.contains(end) {
            break;
        }
        if line.contains(start) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
