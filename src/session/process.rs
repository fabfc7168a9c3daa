//! Browser process discovery and detached launch.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, info};

use super::types::{SessionError, SessionResult};

/// Process names that identify the target browser
pub const BROWSER_PROCESS_NAMES: &[&str] = &[
    "chrome",
    "chrome.exe",
    "google chrome",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Executable names searched on PATH
const PATH_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// First name in `running` that belongs to the target browser
pub fn find_browser_process<I, S>(running: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    running.into_iter().find_map(|name| {
        let name = name.as_ref();
        let lower = name.to_ascii_lowercase();
        BROWSER_PROCESS_NAMES
            .iter()
            .any(|candidate| lower == *candidate)
            .then(|| name.to_string())
    })
}

/// Name of a running browser process under any profile, if there is one
pub fn running_browser() -> Option<String> {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    let names = sys
        .processes()
        .values()
        .map(|p| p.name().to_string_lossy().to_string());
    find_browser_process(names)
}

/// Locate the browser executable: explicit path first, then well-known spots
pub fn find_browser_executable(explicit: Option<&Path>) -> SessionResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(SessionError::Launch(format!(
            "browser executable {} does not exist",
            path.display()
        )));
    }

    for candidate in platform_candidates() {
        if candidate.exists() {
            debug!(path = %candidate.display(), "found browser executable");
            return Ok(candidate);
        }
    }

    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            for name in PATH_CANDIDATES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }

    Err(SessionError::Launch(
        "no Chrome or Chromium executable found; set WEB_VALIDATE_BROWSER_PATH or pass --browser-path"
            .to_string(),
    ))
}

fn platform_candidates() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }
    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}

/// Startup flags for a debuggable browser on `profile_dir`
pub fn launch_args(debug_port: u16, profile_dir: &Path) -> Vec<OsString> {
    let mut user_data_dir = OsString::from("--user-data-dir=");
    user_data_dir.push(profile_dir.as_os_str());
    vec![
        OsString::from(format!("--remote-debugging-port={debug_port}")),
        user_data_dir,
        OsString::from("--no-first-run"),
        OsString::from("--no-default-browser-check"),
    ]
}

/// Start the browser detached so it outlives this process; returns its pid
pub fn launch_detached(executable: &Path, debug_port: u16, profile_dir: &Path) -> SessionResult<u32> {
    let mut cmd = Command::new(executable);
    cmd.args(launch_args(debug_port, profile_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New session: no controlling terminal, no shared process group.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    let child = cmd
        .spawn()
        .map_err(|e| SessionError::Launch(format!("{}: {}", executable.display(), e)))?;
    let pid = child.id();
    info!(pid, port = debug_port, profile = %profile_dir.display(), "browser launched");
    Ok(pid)
}
