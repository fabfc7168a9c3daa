//! web-validate - check live web pages through the Chrome DevTools protocol.
//!
//! This crate provides:
//! - A preflight check for conflicting automation tooling
//! - Browser session acquisition (attach, or launch on a seeded profile)
//! - Navigation with network-idle waiting and full-page capture
//! - Text, selector and regex assertions against the captured HTML
//! - Timestamped run directories with report, screenshot, HTML and network log
//!
//! # Example
//!
//! ```rust,no_run
//! use web_validate::assertions::AssertionRequest;
//! use web_validate::capture::CaptureEngine;
//! use web_validate::session::{SessionConfig, SessionManager};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionManager::new(SessionConfig::new(9222)).acquire().await?;
//! let result = CaptureEngine::default()
//!     .capture(&session.browser, "https://example.com")
//!     .await?;
//! let outcome = web_validate::runner::finish(
//!     result,
//!     &[AssertionRequest::text("Example Domain")],
//!     std::path::Path::new("runs"),
//! );
//! assert!(outcome.success());
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod capture;
pub mod cli;
pub mod config;
pub mod logging;
pub mod preflight;
pub mod report;
pub mod runner;
pub mod session;

// Re-export the data model
pub use capture::{CaptureEngine, CaptureError, NetworkEntry, ValidationResult};
pub use assertions::{AssertionKind, AssertionRequest, AssertionResult, evaluate};

// Re-export the pipeline stages
pub use preflight::{ConflictRule, PreflightReport, run_preflight};
pub use session::{BrowserSession, SessionConfig, SessionError, SessionManager};
pub use report::{Report, Summary, read_report, write_run};
pub use runner::{RunError, RunOutcome, run};
