//! Persisting runs to disk.
//!
//! Each run gets `runs/<timestamp>/` with four artifacts. `report.json` is the
//! small summary; the network log, HTML and screenshot live in their own
//! files. Failing to write one artifact is logged and the others are still
//! attempted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assertions::AssertionResult;
use crate::capture::{NetworkEntry, ValidationResult};

pub const REPORT_FILE: &str = "report.json";
pub const SCREENSHOT_FILE: &str = "screenshot.png";
pub const HTML_FILE: &str = "page.html";
pub const NETWORK_FILE: &str = "network.json";

/// Dimensions of the stored screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotInfo {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Contents of `report.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub requested_url: String,
    pub final_url: String,
    pub title: String,
    pub http_status: Option<u16>,
    pub load_time_ms: u64,
    pub timestamp: String,
    pub success: bool,
    pub host: Option<String>,
    pub screenshot: Option<ScreenshotInfo>,
    pub network_request_count: usize,
    pub main_document: Option<NetworkEntry>,
    pub assertions: Vec<AssertionResult>,
}

impl Report {
    pub fn from_result(result: &ValidationResult) -> Self {
        Self {
            requested_url: result.requested_url.clone(),
            final_url: result.final_url.clone(),
            title: result.title.clone(),
            http_status: result.http_status,
            load_time_ms: result.load_time_ms,
            timestamp: result.timestamp.clone(),
            success: result.all_passed(),
            host: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
            screenshot: screenshot_info(&result.screenshot),
            network_request_count: result.network_requests.len(),
            main_document: result.main_document().cloned(),
            assertions: result.assertions.clone(),
        }
    }

    /// Pass/fail vector of the assertions, in request order
    pub fn assertion_outcomes(&self) -> Vec<bool> {
        self.assertions.iter().map(|a| a.passed).collect()
    }
}

/// The `--dump-json` document written to stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<u64>,
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Summary {
    pub fn from_result(result: &ValidationResult, run_dir: Option<PathBuf>) -> Self {
        Self {
            success: result.all_passed(),
            url: Some(result.requested_url.clone()),
            final_url: Some(result.final_url.clone()),
            title: Some(result.title.clone()),
            status: result.http_status,
            load_time_ms: Some(result.load_time_ms),
            assertions: result.assertions.clone(),
            run_dir,
            error: None,
        }
    }

    /// Summary for a run that aborted before producing a result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            final_url: None,
            title: None,
            status: None,
            load_time_ms: None,
            assertions: Vec::new(),
            run_dir: None,
            error: Some(message.into()),
        }
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid report {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Filesystem-safe directory name for a capture timestamp
pub fn run_dir_name(timestamp: &str) -> String {
    timestamp.replace([':', '.'], "-")
}

fn screenshot_info(png: &[u8]) -> Option<ScreenshotInfo> {
    if png.is_empty() {
        return None;
    }
    let (width, height) = image::io::Reader::new(Cursor::new(png))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(ScreenshotInfo {
        width,
        height,
        bytes: png.len(),
    })
}

/// Create a fresh run directory under `runs_root`
fn create_run_dir(runs_root: &Path, timestamp: &str) -> ReportResult<PathBuf> {
    let base = run_dir_name(timestamp);
    let mut dir = runs_root.join(&base);
    let mut n = 1;
    while dir.exists() {
        dir = runs_root.join(format!("{base}-{n}"));
        n += 1;
    }
    fs::create_dir_all(&dir).map_err(|source| ReportError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

fn write_artifact(path: &Path, contents: &[u8]) -> bool {
    match fs::write(path, contents) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to write run artifact");
            false
        }
    }
}

fn to_json<T: Serialize>(value: &T, path: &Path) -> Option<Vec<u8>> {
    match serde_json::to_vec_pretty(value) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to serialize run artifact");
            None
        }
    }
}

/// Persist `result` under `runs_root` and return the run directory.
///
/// Only failing to create the directory is an error.
pub fn write_run(result: &ValidationResult, runs_root: &Path) -> ReportResult<PathBuf> {
    let dir = create_run_dir(runs_root, &result.timestamp)?;

    let report_path = dir.join(REPORT_FILE);
    let network_path = dir.join(NETWORK_FILE);
    let mut written = 0;

    if let Some(bytes) = to_json(&Report::from_result(result), &report_path) {
        written += usize::from(write_artifact(&report_path, &bytes));
    }
    written += usize::from(write_artifact(&dir.join(SCREENSHOT_FILE), &result.screenshot));
    written += usize::from(write_artifact(&dir.join(HTML_FILE), result.html.as_bytes()));
    if let Some(bytes) = to_json(&result.network_requests, &network_path) {
        written += usize::from(write_artifact(&network_path, &bytes));
    }

    info!(dir = %dir.display(), artifacts = written, "run saved");
    Ok(dir)
}

/// Read `report.json` back from a run directory
pub fn read_report(run_dir: &Path) -> ReportResult<Report> {
    let path = run_dir.join(REPORT_FILE);
    let contents = fs::read(&path).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| ReportError::Parse { path, source })
}

/// Read `network.json` back from a run directory
pub fn read_network_log(run_dir: &Path) -> ReportResult<Vec<NetworkEntry>> {
    let path = run_dir.join(NETWORK_FILE);
    let contents = fs::read(&path).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| ReportError::Parse { path, source })
}
