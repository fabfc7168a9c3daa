pub mod engine;
pub mod network;
pub mod types;

pub use engine::CaptureEngine;
pub use network::{NetworkEvent, NetworkTracker, find_main_document, normalize_url, resolve_http_status};
pub use types::{CaptureConfig, CaptureError, CaptureResult, NetworkEntry, ValidationResult};
