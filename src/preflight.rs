//! Preflight check for conflicting browser-automation tooling.
//!
//! The check only reads: the dependency directory, the manifest's declared
//! dependencies, and environment variable names. Installed packages and
//! manifest declarations fail the check; matching environment variables only
//! warn. An unreadable or malformed manifest counts as "no conflict".

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Manifest sections that declare dependencies
const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Describes one conflicting package and where it shows up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRule {
    /// Package name (also the directory name under `dependency_dir`)
    pub package: String,
    /// Directory holding installed packages, relative to the working dir
    pub dependency_dir: PathBuf,
    /// Manifest file, relative to the working dir
    pub manifest: PathBuf,
    /// Environment variable prefix used by the package
    pub env_prefix: String,
}

impl ConflictRule {
    /// Playwright installed through npm
    pub fn playwright() -> Self {
        Self {
            package: "playwright".to_string(),
            dependency_dir: PathBuf::from("node_modules"),
            manifest: PathBuf::from("package.json"),
            env_prefix: "PLAYWRIGHT_".to_string(),
        }
    }
}

impl Default for ConflictRule {
    fn default() -> Self {
        Self::playwright()
    }
}

/// Outcome of a preflight check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    /// False when at least one hard conflict was found
    pub ok: bool,
    /// Hard failures
    pub conflicts: Vec<String>,
    /// Soft findings that do not block the run
    pub warnings: Vec<String>,
}

impl PreflightReport {
    /// Write every finding to the log (stderr)
    pub fn log(&self) {
        for conflict in &self.conflicts {
            error!("preflight: {}", conflict);
        }
        for warning in &self.warnings {
            warn!("preflight: {}", warning);
        }
    }
}

/// Check `cwd` and the given environment against `rule`
pub fn check<I, K, V>(cwd: &Path, env: I, rule: &ConflictRule) -> PreflightReport
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut report = PreflightReport {
        ok: true,
        ..Default::default()
    };

    let installed = cwd.join(&rule.dependency_dir).join(&rule.package);
    if installed.exists() {
        report.conflicts.push(format!(
            "{} is installed at {}; remove it before running web-validate",
            rule.package,
            installed.display()
        ));
    }

    let manifest = cwd.join(&rule.manifest);
    if manifest_declares(&manifest, &rule.package) {
        report.conflicts.push(format!(
            "{} declares a dependency on {}",
            manifest.display(),
            rule.package
        ));
    }

    let mut vars: Vec<String> = env
        .into_iter()
        .map(|(k, _)| k.as_ref().to_string())
        .filter(|k| k.starts_with(&rule.env_prefix))
        .collect();
    vars.sort();
    if !vars.is_empty() {
        report.warnings.push(format!(
            "environment variables for {} are set: {}",
            rule.package,
            vars.join(", ")
        ));
    }

    report.ok = report.conflicts.is_empty();
    report
}

/// Check the current process environment with the default rule, logging findings
pub fn run_preflight(cwd: &Path) -> PreflightReport {
    let report = check(cwd, std::env::vars(), &ConflictRule::default());
    report.log();
    report
}

fn manifest_declares(manifest: &Path, package: &str) -> bool {
    let Ok(contents) = fs::read_to_string(manifest) else {
        return false;
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&contents) else {
        warn!(manifest = %manifest.display(), "unparsable manifest ignored");
        return false;
    };
    DEPENDENCY_SECTIONS.iter().any(|section| {
        json.get(section)
            .and_then(|deps| deps.as_object())
            .is_some_and(|deps| deps.contains_key(package))
    })
}
