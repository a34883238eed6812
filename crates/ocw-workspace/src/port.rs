//! Port discovery from server logs

use std::sync::OnceLock;

use regex::Regex;

/// Finds the port a server announced in the tail of its log
pub trait PortExtractor: Send + Sync {
    /// Port from the most recent announcement in `log_tail`, if any
    fn extract_port(&self, log_tail: &str) -> Option<u16>;
}

/// Matches `listening on http://<host>:<port>` announcements
#[derive(Debug, Clone, Copy, Default)]
pub struct ListeningLineExtractor;

fn listening_regex() -> &'static Regex {
    static LISTENING: OnceLock<Regex> = OnceLock::new();
    LISTENING.get_or_init(|| {
        Regex::new(r"(?i)listening on https?://[^:\s/]+:(\d+)")
            .expect("listening line regex should compile")
    })
}

impl PortExtractor for ListeningLineExtractor {
    fn extract_port(&self, log_tail: &str) -> Option<u16> {
        listening_regex()
            .captures_iter(log_tail)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u16>().ok())
            .filter(|port| *port != 0)
            .last()
    }
}
