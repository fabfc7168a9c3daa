//! Command-line surface and argument validation.
//!
//! Parsing goes through `ArgMatches` so assertions keep the order they were
//! given on the command line, even when kinds are interleaved.

use clap::error::ErrorKind;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::assertions::{AssertionKind, AssertionRequest};
use crate::config;

/// web-validate - load a page through Chrome, check it, and archive the run
#[derive(Parser, Debug)]
#[command(
    name = "web-validate",
    version,
    about = "Validate a web page through the Chrome DevTools protocol",
    after_help = "ENVIRONMENT VARIABLES:\n\
        WEB_VALIDATE_DEBUG_PORT          Remote debugging port\n\
        WEB_VALIDATE_PROFILE_DIR         Browser profile directory\n\
        WEB_VALIDATE_BROWSER_PATH        Chrome/Chromium executable\n\
        WEB_VALIDATE_SOURCE_PROFILE      Profile to seed sessions from\n\
        WEB_VALIDATE_RUNS_DIR            Root directory for run output\n\
        WEB_VALIDATE_NAV_TIMEOUT_MS      Navigation timeout (ms)\n\
        WEB_VALIDATE_LOG_FORMAT          text or json\n\
        RUST_LOG                         Log filter (overrides --verbose)"
)]
pub struct Args {
    /// Page to validate
    #[arg(long)]
    pub url: String,

    /// Browser profile directory (default: dedicated web-validate profile)
    #[arg(long, env = config::ENV_PROFILE_DIR)]
    pub profile_dir: Option<PathBuf>,

    /// Remote debugging port
    #[arg(long, env = config::ENV_DEBUG_PORT, default_value_t = config::DEFAULT_DEBUG_PORT as i64, allow_negative_numbers = true)]
    pub debug_port: i64,

    /// Require this text to appear in the page HTML
    #[arg(long = "assert-text", value_name = "TEXT")]
    pub assert_text: Vec<String>,

    /// Require an element matching this CSS selector
    #[arg(long = "assert-selector", value_name = "CSS")]
    pub assert_selector: Vec<String>,

    /// Require this regular expression to match the page HTML
    #[arg(long = "assert-regex", value_name = "PATTERN")]
    pub assert_regex: Vec<String>,

    /// Print a JSON summary to stdout
    #[arg(long)]
    pub dump_json: bool,

    /// Root directory for run output
    #[arg(long, env = config::ENV_RUNS_DIR)]
    pub runs_dir: Option<PathBuf>,

    /// Chrome/Chromium executable to launch
    #[arg(long, env = config::ENV_BROWSER_PATH)]
    pub browser_path: Option<PathBuf>,

    /// Navigation timeout in milliseconds
    #[arg(long, env = config::ENV_NAV_TIMEOUT_MS)]
    pub timeout_ms: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated invocation settings
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// URL exactly as requested
    pub url: String,
    pub debug_port: u16,
    pub profile_dir: Option<PathBuf>,
    pub browser_path: Option<PathBuf>,
    pub runs_dir: PathBuf,
    pub nav_timeout: Duration,
    pub assertions: Vec<AssertionRequest>,
    pub dump_json: bool,
    pub verbose: bool,
}

/// Result type for argument handling
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Clap(#[from] clap::Error),

    #[error("invalid --url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid --debug-port {0}: must be between 1 and 65535")]
    InvalidPort(i64),
}

impl CliError {
    /// `--help` / `--version` requests surface as errors from clap
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            CliError::Clap(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
        )
    }
}

/// Parse and validate arguments
pub fn parse_from<I, T>(args: I) -> CliResult<ValidateOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Args::command().try_get_matches_from(args)?;
    let parsed = Args::from_arg_matches(&matches)?;
    let assertions = ordered_assertions(&matches);
    validate(parsed, assertions)
}

/// Assertions in command-line order across all three flags
fn ordered_assertions(matches: &ArgMatches) -> Vec<AssertionRequest> {
    let mut indexed: Vec<(usize, AssertionRequest)> = Vec::new();
    for (id, kind) in [
        ("assert_text", AssertionKind::Text),
        ("assert_selector", AssertionKind::Selector),
        ("assert_regex", AssertionKind::Regex),
    ] {
        let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<String>(id))
        else {
            continue;
        };
        for (index, value) in indices.zip(values) {
            indexed.push((
                index,
                AssertionRequest {
                    kind,
                    expected: value.clone(),
                },
            ));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, request)| request).collect()
}

fn validate(args: Args, assertions: Vec<AssertionRequest>) -> CliResult<ValidateOptions> {
    let url = args.url.trim().to_string();
    validate_url(&url)?;

    let debug_port = u16::try_from(args.debug_port)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or(CliError::InvalidPort(args.debug_port))?;

    let cfg = config::get();
    Ok(ValidateOptions {
        url,
        debug_port,
        profile_dir: args.profile_dir,
        browser_path: args.browser_path,
        runs_dir: args.runs_dir.unwrap_or_else(|| cfg.output.runs_dir.clone()),
        nav_timeout: args
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(cfg.capture.nav_timeout),
        assertions,
        dump_json: args.dump_json,
        verbose: args.verbose,
    })
}

/// Accept absolute http(s) URLs with a host, and file URLs
pub fn validate_url(url: &str) -> CliResult<Url> {
    let invalid = |reason: String| CliError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(parsed),
        "http" | "https" => Err(invalid("missing host".to_string())),
        "file" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
