pub mod manager;
pub mod probe;
pub mod process;
pub mod profile;
pub mod types;

pub use manager::{BrowserSession, ProcessLookup, SessionManager};
pub use probe::{DevToolsEndpoint, VersionInfo};
pub use process::{find_browser_executable, find_browser_process, launch_args, launch_detached, running_browser};
pub use profile::{SeedReport, needs_seed, prepare_profile, resolve_profile_dir, seed_profile};
pub use types::{SessionConfig, SessionError, SessionResult};
