//! Dedicated browser profile handling.
//!
//! The tool never runs on the user's live profile. On first use the dedicated
//! profile is seeded with copies of the session-bearing entries of the real
//! one, so logins carry over without two writers sharing a profile.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Chrome keeps per-profile data under this subdirectory of the user data dir
pub const PROFILE_SUBDIR: &str = "Default";

/// Entries copied from the real profile on first run
pub const SEED_ENTRIES: &[&str] = &["Cookies", "Local Storage", "Session Storage", "Login Data"];

/// Marker whose absence means the profile has never been seeded
const SEED_MARKER: &str = "Cookies";

/// What happened while seeding
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub copied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Profile directory to launch with: explicit override or the dedicated one
pub fn resolve_profile_dir(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::config::dedicated_profile_dir)
}

/// True when the session-cookie store is absent
pub fn needs_seed(profile_dir: &Path) -> bool {
    !profile_dir.join(PROFILE_SUBDIR).join(SEED_MARKER).exists()
}

/// Copy session entries from `source_profile` into `profile_dir/Default`.
///
/// Each entry is copied independently; a missing or unreadable entry is
/// logged and skipped. Only failing to create the target is an error.
pub fn seed_profile(profile_dir: &Path, source_profile: &Path) -> io::Result<SeedReport> {
    let target = profile_dir.join(PROFILE_SUBDIR);
    fs::create_dir_all(&target)?;

    let mut report = SeedReport::default();
    for entry in SEED_ENTRIES {
        let from = source_profile.join(entry);
        let to = target.join(entry);
        match copy_entry(&from, &to) {
            Ok(()) => report.copied.push(entry.to_string()),
            Err(e) => {
                warn!(entry, source = %from.display(), error = %e, "skipping profile entry");
                report.skipped.push(entry.to_string());
            }
        }
    }

    info!(
        profile = %profile_dir.display(),
        copied = report.copied.len(),
        skipped = report.skipped.len(),
        "seeded browser profile"
    );
    Ok(report)
}

/// Ensure the profile exists, seeding it on first run
pub fn prepare_profile(profile_dir: &Path, source_profile: Option<&Path>) -> io::Result<()> {
    fs::create_dir_all(profile_dir)?;
    if !needs_seed(profile_dir) {
        return Ok(());
    }
    match source_profile {
        Some(source) if source.exists() => {
            seed_profile(profile_dir, source)?;
        }
        Some(source) => {
            warn!(source = %source.display(), "source profile not found; starting with an empty profile");
        }
        None => {
            warn!("no source profile configured; starting with an empty profile");
        }
    }
    Ok(())
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::metadata(from)?;
    if meta.is_dir() {
        copy_dir(from, to)
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let path = entry.path();
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&path, &dest)?;
        } else {
            fs::copy(&path, &dest)?;
        }
    }
    Ok(())
}
