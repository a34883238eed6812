//! Shared serialization/deserialization utilities for configuration

/// Helper module for Duration serialization as seconds
///
/// Timeouts and poll intervals are written as whole seconds, which keeps
/// `config.toml` readable.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     #[serde(with = "ocw_core::config::serde_utils::duration_secs")]
///     command_timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as seconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize a Duration from seconds (u64)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        command_timeout: Duration,
    }

    #[test]
    fn test_duration_secs_serialize() {
        let timeouts = Timeouts {
            command_timeout: Duration::from_secs(30),
        };
        let json = serde_json::to_string(&timeouts).unwrap();
        assert_eq!(json, r#"{"command_timeout":30}"#);
    }

    #[test]
    fn test_duration_secs_truncates_subsecond() {
        let timeouts = Timeouts {
            command_timeout: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&timeouts).unwrap();
        let parsed: Timeouts = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.command_timeout, Duration::from_secs(1));
    }
}
