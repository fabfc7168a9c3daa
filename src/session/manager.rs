//! Acquiring a connected browser.
//!
//! Order of operations:
//! 1. Attach to a live debugging endpoint if one answers.
//! 2. Refuse to continue if the browser runs without debugging enabled.
//! 3. Prepare (and on first run seed) the profile directory.
//! 4. Launch the browser detached and poll until the endpoint answers.

use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::probe::{DevToolsEndpoint, VersionInfo};
use super::process::{find_browser_executable, launch_detached, running_browser};
use super::profile::{prepare_profile, resolve_profile_dir};
use super::types::{SessionConfig, SessionError, SessionResult};

/// Returns the name of a running browser process, if any
pub type ProcessLookup = fn() -> Option<String>;

/// A connected browser plus the task pumping its protocol messages
pub struct BrowserSession {
    pub browser: Browser,
    /// True when this invocation started the browser
    pub launched: bool,
    pub version: VersionInfo,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("launched", &self.launched)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // The browser process itself is left running for the next invocation.
        self.handler.abort();
    }
}

/// Acquires browser sessions according to a `SessionConfig`
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: SessionConfig,
    host: String,
    process_lookup: ProcessLookup,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            host: "127.0.0.1".to_string(),
            process_lookup: running_browser,
        }
    }

    /// Replace the running-browser check
    pub fn with_process_lookup(mut self, lookup: ProcessLookup) -> Self {
        self.process_lookup = lookup;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn endpoint(&self) -> DevToolsEndpoint {
        DevToolsEndpoint::new(self.host.clone(), self.config.debug_port)
    }

    /// Return a connected browser, launching one if needed
    pub async fn acquire(&self) -> SessionResult<BrowserSession> {
        let endpoint = self.endpoint();
        let port = self.config.debug_port;

        if let Some(version) = endpoint.probe().await {
            info!(port, browser = %version.browser, "attaching to running browser");
            return connect(version, false).await;
        }

        if let Some(name) = (self.process_lookup)() {
            return Err(SessionError::BrowserRunningWithoutDebugging { name, port });
        }

        let profile_dir = resolve_profile_dir(self.config.profile_dir.as_deref());
        prepare_profile(&profile_dir, self.config.source_profile.as_deref())?;

        let executable = find_browser_executable(self.config.browser_path.as_deref())?;
        launch_detached(&executable, port, &profile_dir)?;

        let version = endpoint
            .wait_until_ready(self.config.connect_attempts, self.config.connect_interval)
            .await?;
        connect(version, true).await
    }
}

async fn connect(version: VersionInfo, launched: bool) -> SessionResult<BrowserSession> {
    let url = version.web_socket_debugger_url.clone();
    let (browser, mut handler) =
        Browser::connect(url.clone())
            .await
            .map_err(|e| SessionError::Connect {
                url: url.clone(),
                message: e.to_string(),
            })?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "devtools handler error");
            }
        }
    });

    info!(%url, launched, "connected to browser");
    Ok(BrowserSession {
        browser,
        launched,
        version,
        handler,
    })
}
