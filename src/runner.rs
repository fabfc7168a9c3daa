//! End-to-end run: preflight, session, capture, assertions, persistence.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assertions::{self, AssertionRequest};
use crate::capture::{CaptureConfig, CaptureEngine, CaptureError, ValidationResult};
use crate::cli::{CliError, ValidateOptions};
use crate::preflight;
use crate::report;
use crate::session::{SessionConfig, SessionError, SessionManager};

/// Exit status for a fully successful run
pub const EXIT_OK: u8 = 0;
/// Exit status for any failure: arguments, environment, browser or assertions
pub const EXIT_FAILURE: u8 = 1;

/// A captured, asserted and (if possible) persisted run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: ValidationResult,
    /// None when the run directory could not be created
    pub run_dir: Option<PathBuf>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.result.all_passed()
    }
}

/// Fatal errors; any of these aborts the run without persisting anything
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] CliError),

    #[error("preflight failed: {0}")]
    Preflight(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Run one validation as described by `opts`
pub async fn run(opts: &ValidateOptions) -> Result<RunOutcome, RunError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    preflight_gate(&cwd)?;

    let session_config = SessionConfig::new(opts.debug_port)
        .profile_dir(opts.profile_dir.clone())
        .browser_path(opts.browser_path.clone());
    let session = SessionManager::new(session_config).acquire().await?;

    let engine = CaptureEngine::new(CaptureConfig {
        nav_timeout: opts.nav_timeout,
        ..Default::default()
    });
    let result = engine.capture(&session.browser, &opts.url).await?;

    Ok(finish(result, &opts.assertions, &opts.runs_dir))
}

/// Refuse to go further when `cwd` has a conflicting automation install
pub fn preflight_gate(cwd: &Path) -> Result<(), RunError> {
    let report = preflight::run_preflight(cwd);
    if report.ok {
        Ok(())
    } else {
        Err(RunError::Preflight(report.conflicts.join("; ")))
    }
}

/// Evaluate assertions on a capture and persist it. Never fails: write
/// problems are logged and only drop `run_dir`.
pub fn finish(
    mut result: ValidationResult,
    requests: &[AssertionRequest],
    runs_root: &Path,
) -> RunOutcome {
    result.assertions = assertions::evaluate(&result.html, requests);
    for assertion in &result.assertions {
        if assertion.passed {
            info!(kind = %assertion.kind, "assertion passed: {}", assertion.message);
        } else {
            warn!(kind = %assertion.kind, "assertion failed: {}", assertion.message);
        }
    }

    let run_dir = match report::write_run(&result, runs_root) {
        Ok(dir) => Some(dir),
        Err(e) => {
            warn!(error = %e, "run output not saved");
            None
        }
    };

    RunOutcome { result, run_dir }
}

/// Process exit status for a run
pub fn exit_code(outcome: &Result<RunOutcome, RunError>) -> u8 {
    match outcome {
        Ok(run) if run.success() => EXIT_OK,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_preflight_gate_blocks_installed_playwright() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/playwright")).unwrap();

        let err = preflight_gate(dir.path()).unwrap_err();
        assert!(matches!(err, RunError::Preflight(_)), "got {err:?}");
        assert_eq!(exit_code(&Err(err)), EXIT_FAILURE);
    }

    #[test]
    fn test_preflight_gate_passes_clean_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(preflight_gate(dir.path()).is_ok());
    }
}
