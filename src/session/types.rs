use std::path::PathBuf;
use std::time::Duration;

/// Configuration for acquiring a browser session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote debugging port to probe or launch with
    pub debug_port: u16,

    /// Explicit profile directory (None = dedicated tool profile)
    pub profile_dir: Option<PathBuf>,

    /// Browser executable (None = search well-known locations)
    pub browser_path: Option<PathBuf>,

    /// Real profile to seed session files from on first run
    pub source_profile: Option<PathBuf>,

    /// Readiness polls after launch
    pub connect_attempts: u32,

    /// Delay between readiness polls
    pub connect_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let cfg = crate::config::get();
        Self {
            debug_port: cfg.browser.debug_port,
            profile_dir: cfg.browser.profile_dir.clone(),
            browser_path: cfg.browser.browser_path.clone(),
            source_profile: cfg.browser.source_profile.clone(),
            connect_attempts: cfg.browser.connect_attempts,
            connect_interval: cfg.browser.connect_interval,
        }
    }
}

impl SessionConfig {
    pub fn new(debug_port: u16) -> Self {
        Self {
            debug_port,
            ..Default::default()
        }
    }

    pub fn profile_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.profile_dir = dir;
        }
        self
    }

    pub fn browser_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.browser_path = path;
        }
        self
    }

    pub fn connect_schedule(mut self, attempts: u32, interval: Duration) -> Self {
        self.connect_attempts = attempts;
        self.connect_interval = interval;
        self
    }

    /// Worst-case time spent waiting for a freshly launched browser
    pub fn connect_ceiling(&self) -> Duration {
        self.connect_interval * self.connect_attempts
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error types for session acquisition
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Browser is up but was started without a debugging port
    #[error(
        "{name} is already running without remote debugging on port {port}; quit the browser first, then re-run"
    )]
    BrowserRunningWithoutDebugging { name: String, port: u16 },

    /// No executable found or it could not be started
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Debugging port never answered
    #[error("debugging port {port} did not become available within {waited:?}")]
    Timeout { port: u16, waited: Duration },

    /// WebSocket connection to the debugger failed
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// Profile directory could not be prepared
    #[error("profile error: {0}")]
    Profile(#[from] std::io::Error),
}
