//! Probing the remote debugging endpoint.
//!
//! A browser started with `--remote-debugging-port` answers
//! `GET /json/version` with its WebSocket debugger URL.

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::types::{SessionError, SessionResult};

/// Per-request timeout for a single probe
const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// The version-info document served by the debugger
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// A debugging endpoint on host:port
#[derive(Debug, Clone)]
pub struct DevToolsEndpoint {
    host: String,
    port: u16,
    client: reqwest::Client,
}

impl DevToolsEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .no_proxy()
            .build()
            .unwrap_or_default();
        Self {
            host: host.into(),
            port,
            client,
        }
    }

    /// Endpoint on the loopback interface
    pub fn local(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn version_url(&self) -> String {
        format!("http://{}:{}/json/version", self.host, self.port)
    }

    /// One probe; `None` if nothing answers or the answer has no debugger URL
    pub async fn probe(&self) -> Option<VersionInfo> {
        let url = self.version_url();
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(%url, status = %r.status(), "debugging endpoint answered with an error");
                return None;
            }
            Err(e) => {
                debug!(%url, error = %e, "debugging endpoint not reachable");
                return None;
            }
        };
        match response.json::<VersionInfo>().await {
            Ok(info) if !info.web_socket_debugger_url.is_empty() => Some(info),
            Ok(_) => None,
            Err(e) => {
                debug!(%url, error = %e, "unexpected version document");
                None
            }
        }
    }

    /// Poll until the endpoint answers, at most `attempts` times.
    ///
    /// The whole wait is capped at `attempts * interval` even when individual
    /// probes hang.
    pub async fn wait_until_ready(
        &self,
        attempts: u32,
        interval: Duration,
    ) -> SessionResult<VersionInfo> {
        let ceiling = interval * attempts;
        let deadline = Instant::now() + ceiling;

        for attempt in 1..=attempts {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Ok(Some(info)) = tokio::time::timeout(remaining, self.probe()).await {
                info!(attempt, browser = %info.browser, "debugging endpoint ready");
                return Ok(info);
            }
            debug!(attempt, attempts, "debugging endpoint not ready yet");
            if attempt < attempts {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(interval.min(remaining)).await;
            }
        }
        Err(SessionError::Timeout {
            port: self.port,
            waited: ceiling,
        })
    }
}
