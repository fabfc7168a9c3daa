//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for web-validate, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults matching the documented CLI behaviour
//! - A process-wide cache so every module sees the same values
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WEB_VALIDATE_DEBUG_PORT` | Remote debugging port | `9222` |
//! | `WEB_VALIDATE_PROFILE_DIR` | Browser profile directory override | dedicated tool profile |
//! | `WEB_VALIDATE_BROWSER_PATH` | Browser executable | platform search |
//! | `WEB_VALIDATE_SOURCE_PROFILE` | Real profile used to seed sessions | platform Chrome `Default` |
//! | `WEB_VALIDATE_RUNS_DIR` | Root directory for run output | `./runs` |
//! | `WEB_VALIDATE_NAV_TIMEOUT_MS` | Navigation timeout (ms) | `30000` |
//! | `WEB_VALIDATE_IDLE_WINDOW_MS` | Network-idle quiet window (ms) | `500` |
//! | `WEB_VALIDATE_CONNECT_ATTEMPTS` | Readiness polls after launch | `30` |
//! | `WEB_VALIDATE_CONNECT_INTERVAL_MS` | Delay between readiness polls (ms) | `500` |
//! | `WEB_VALIDATE_LOG_FORMAT` | `text` or `json` | `text` |
//!
//! # Example
//!
//! ```bash
//! # Keep run history somewhere other than the working directory
//! export WEB_VALIDATE_RUNS_DIR="$HOME/.local/share/web-validate/runs"
//!
//! # Drive Chromium instead of Chrome
//! export WEB_VALIDATE_BROWSER_PATH=/usr/bin/chromium
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default remote debugging port
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

/// Default root directory for run output
pub const DEFAULT_RUNS_DIR: &str = "runs";

/// Default navigation timeout (milliseconds)
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;

/// Default quiet window before the network counts as idle (milliseconds)
pub const DEFAULT_IDLE_WINDOW_MS: u64 = 500;

/// Default number of readiness polls after launching the browser
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 30;

/// Default delay between readiness polls (milliseconds)
pub const DEFAULT_CONNECT_INTERVAL_MS: u64 = 500;

/// Name of the tool-owned directory under the platform data dir
pub const APP_DIR_NAME: &str = "web-validate";

/// Name of the dedicated browser profile directory
pub const PROFILE_DIR_NAME: &str = "chrome-profile";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_DEBUG_PORT: &str = "WEB_VALIDATE_DEBUG_PORT";
pub const ENV_PROFILE_DIR: &str = "WEB_VALIDATE_PROFILE_DIR";
pub const ENV_BROWSER_PATH: &str = "WEB_VALIDATE_BROWSER_PATH";
pub const ENV_SOURCE_PROFILE: &str = "WEB_VALIDATE_SOURCE_PROFILE";
pub const ENV_RUNS_DIR: &str = "WEB_VALIDATE_RUNS_DIR";
pub const ENV_NAV_TIMEOUT_MS: &str = "WEB_VALIDATE_NAV_TIMEOUT_MS";
pub const ENV_IDLE_WINDOW_MS: &str = "WEB_VALIDATE_IDLE_WINDOW_MS";
pub const ENV_CONNECT_ATTEMPTS: &str = "WEB_VALIDATE_CONNECT_ATTEMPTS";
pub const ENV_CONNECT_INTERVAL_MS: &str = "WEB_VALIDATE_CONNECT_INTERVAL_MS";
pub const ENV_LOG_FORMAT: &str = "WEB_VALIDATE_LOG_FORMAT";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for web-validate
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser and session settings
    pub browser: BrowserSettings,
    /// Navigation and capture settings
    pub capture: CaptureSettings,
    /// Output settings
    pub output: OutputSettings,
}

/// Browser-related settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Remote debugging port
    pub debug_port: u16,
    /// Explicit profile directory (None = dedicated tool profile)
    pub profile_dir: Option<PathBuf>,
    /// Explicit browser executable (None = search well-known locations)
    pub browser_path: Option<PathBuf>,
    /// The user's real profile, used only as a seed source
    pub source_profile: Option<PathBuf>,
    /// Readiness polls after launch
    pub connect_attempts: u32,
    /// Delay between readiness polls
    pub connect_interval: Duration,
}

/// Navigation-related settings
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Upper bound for navigation plus network idle
    pub nav_timeout: Duration,
    /// Quiet window with no in-flight requests
    pub idle_window: Duration,
}

/// Output-related settings
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Root directory for run output
    pub runs_dir: PathBuf,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            browser: BrowserSettings::from_env(),
            capture: CaptureSettings::from_env(),
            output: OutputSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            browser: BrowserSettings::defaults(),
            capture: CaptureSettings::defaults(),
            output: OutputSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        Self {
            debug_port: env_parse(ENV_DEBUG_PORT).unwrap_or(DEFAULT_DEBUG_PORT),
            profile_dir: env_path(ENV_PROFILE_DIR),
            browser_path: env_path(ENV_BROWSER_PATH),
            source_profile: env_path(ENV_SOURCE_PROFILE).or_else(default_source_profile),
            connect_attempts: env_parse(ENV_CONNECT_ATTEMPTS).unwrap_or(DEFAULT_CONNECT_ATTEMPTS),
            connect_interval: Duration::from_millis(
                env_parse(ENV_CONNECT_INTERVAL_MS).unwrap_or(DEFAULT_CONNECT_INTERVAL_MS),
            ),
        }
    }

    pub fn defaults() -> Self {
        Self {
            debug_port: DEFAULT_DEBUG_PORT,
            profile_dir: None,
            browser_path: None,
            source_profile: default_source_profile(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_interval: Duration::from_millis(DEFAULT_CONNECT_INTERVAL_MS),
        }
    }
}

impl CaptureSettings {
    pub fn from_env() -> Self {
        Self {
            nav_timeout: Duration::from_millis(
                env_parse(ENV_NAV_TIMEOUT_MS).unwrap_or(DEFAULT_NAV_TIMEOUT_MS),
            ),
            idle_window: Duration::from_millis(
                env_parse(ENV_IDLE_WINDOW_MS).unwrap_or(DEFAULT_IDLE_WINDOW_MS),
            ),
        }
    }

    pub fn defaults() -> Self {
        Self {
            nav_timeout: Duration::from_millis(DEFAULT_NAV_TIMEOUT_MS),
            idle_window: Duration::from_millis(DEFAULT_IDLE_WINDOW_MS),
        }
    }
}

impl OutputSettings {
    pub fn from_env() -> Self {
        Self {
            runs_dir: env_path(ENV_RUNS_DIR).unwrap_or_else(|| PathBuf::from(DEFAULT_RUNS_DIR)),
            json_logs: env::var(ENV_LOG_FORMAT)
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn defaults() -> Self {
        Self {
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            json_logs: false,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Dedicated, tool-owned profile directory (never the user's real profile)
pub fn dedicated_profile_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR_NAME)
        .join(PROFILE_DIR_NAME)
}

/// The user's primary Chrome profile on this platform, if a home dir is known
pub fn default_source_profile() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| {
            h.join("Library/Application Support/Google/Chrome").join("Default")
        })
    }
    #[cfg(target_os = "windows")]
    {
        dirs::data_local_dir().map(|d| d.join("Google/Chrome/User Data").join("Default"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        dirs::config_dir().map(|c| c.join("google-chrome").join("Default"))
    }
}
