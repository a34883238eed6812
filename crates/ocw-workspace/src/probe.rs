//! Health probes for spawned servers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ocw_core::traits::HealthProbe;
use ocw_core::Workspace;
use ocw_ssh::ConnectionManager;

/// Per-request timeout for HTTP probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Treats any non-zero port as healthy
#[derive(Debug, Clone, Copy, Default)]
pub struct PortProbe;

#[async_trait]
impl HealthProbe for PortProbe {
    async fn probe(&self, port: u16, _workspace: &Workspace) -> bool {
        port != 0
    }
}

/// Runs `curl` on the remote host against the loopback port
pub struct RemoteHttpProbe {
    manager: Arc<ConnectionManager>,
}

impl RemoteHttpProbe {
    /// Probe through `manager`
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

/// Command printing the HTTP status of `127.0.0.1:<port>`, `000` when
/// nothing answers
pub(crate) fn curl_command(port: u16) -> String {
    format!(
        "curl -s -o /dev/null -w '%{{http_code}}' --max-time {} http://127.0.0.1:{}/ 2>/dev/null || true",
        PROBE_TIMEOUT.as_secs(),
        port
    )
}

/// Whether curl's `%{http_code}` output names a real HTTP response
pub(crate) fn is_http_response(output: &str) -> bool {
    matches!(output.trim().parse::<u16>(), Ok(code) if (100..600).contains(&code))
}

#[async_trait]
impl HealthProbe for RemoteHttpProbe {
    async fn probe(&self, port: u16, workspace: &Workspace) -> bool {
        if port == 0 {
            return false;
        }
        match self.manager.exec_clean(&curl_command(port)).await {
            Ok(output) => {
                let healthy = is_http_response(&output);
                tracing::debug!(
                    "Remote probe of {} port {}: {} ({})",
                    workspace.name,
                    port,
                    if healthy { "healthy" } else { "unhealthy" },
                    output
                );
                healthy
            }
            Err(e) => {
                tracing::warn!("Remote probe of {} port {} failed: {}", workspace.name, port, e);
                false
            }
        }
    }
}

/// GETs `http://<base_host>:<port>/` from this machine, for ports that are
/// reachable or forwarded locally
pub struct HttpProbe {
    client: reqwest::Client,
    base_host: String,
}

impl HttpProbe {
    /// Probe servers reachable at `base_host`
    pub fn new(base_host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_host: base_host.into(),
        }
    }

    fn url(&self, port: u16) -> String {
        format!("http://{}:{}/", self.base_host, port)
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, port: u16, workspace: &Workspace) -> bool {
        if port == 0 {
            return false;
        }
        match self
            .client
            .get(self.url(port))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => {
                let healthy = !resp.status().is_server_error();
                tracing::debug!(
                    "HTTP probe of {} port {} returned {}",
                    workspace.name,
                    port,
                    resp.status()
                );
                healthy
            }
            Err(e) => {
                tracing::debug!("HTTP probe of {} port {} failed: {}", workspace.name, port, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::new("api", "dev.example.com", "bob", "/srv/api")
    }

    #[tokio::test]
    async fn test_port_probe() {
        assert!(PortProbe.probe(51535, &workspace()).await);
        assert!(!PortProbe.probe(0, &workspace()).await);
    }

    #[test]
    fn test_curl_command() {
        assert_eq!(
            curl_command(4096),
            "curl -s -o /dev/null -w '%{http_code}' --max-time 2 http://127.0.0.1:4096/ 2>/dev/null || true"
        );
    }

    #[test]
    fn test_http_status_parsing() {
        assert!(is_http_response("200"));
        assert!(is_http_response("404\n"));
        assert!(!is_http_response("000"));
        assert!(!is_http_response(""));
        assert!(!is_http_response("curl: not found"));
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_port() {
        // Nothing listens on port 1 of the loopback interface
        let probe = HttpProbe::default();
        assert!(!probe.probe(1, &workspace()).await);
        assert!(!probe.probe(0, &workspace()).await);
    }
}
