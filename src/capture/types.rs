// Core types for a single validation run

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::assertions::AssertionResult;

/// Settings for one navigation
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound for navigation plus network idle
    pub nav_timeout: Duration,
    /// Quiet window with no in-flight requests
    pub idle_window: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let cfg = crate::config::get();
        Self {
            nav_timeout: cfg.capture.nav_timeout,
            idle_window: cfg.capture.idle_window,
        }
    }
}

/// One HTTP response observed during navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub url: String,
    pub status: u16,
    /// MIME type as reported by the browser, possibly empty
    pub content_type: String,
}

/// Everything captured for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub requested_url: String,
    pub final_url: String,
    pub title: String,
    /// Status of the main document, if one could be identified
    pub http_status: Option<u16>,
    /// Navigation start to network idle
    pub load_time_ms: u64,
    pub html: String,
    /// PNG bytes, base64 when serialized
    #[serde(with = "base64_bytes")]
    pub screenshot: Vec<u8>,
    /// Responses in arrival order
    pub network_requests: Vec<NetworkEntry>,
    pub assertions: Vec<AssertionResult>,
    /// RFC 3339 capture completion time
    pub timestamp: String,
}

impl ValidationResult {
    /// True when every requested assertion passed (vacuously true for none)
    pub fn all_passed(&self) -> bool {
        self.assertions.iter().all(|a| a.passed)
    }

    /// The response identified as the main document, if any
    pub fn main_document(&self) -> Option<&NetworkEntry> {
        crate::capture::network::find_main_document(&self.network_requests, &self.requested_url)
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for navigation and capture
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The page could not be opened
    #[error("failed to open page: {0}")]
    Page(String),

    /// Navigation failed (DNS, TLS, crash, net::ERR_*)
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Navigation or network idle exceeded the deadline
    #[error("navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// A post-load capture step failed
    #[error("capture step '{step}' failed: {message}")]
    Capture { step: &'static str, message: String },
}

pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{AssertionKind, AssertionResult};

    fn sample() -> ValidationResult {
        ValidationResult {
            requested_url: "https://example.com".to_string(),
            final_url: "https://example.com/".to_string(),
            title: "Example Domain".to_string(),
            http_status: Some(200),
            load_time_ms: 412,
            html: "<html></html>".to_string(),
            screenshot: vec![0x89, b'P', b'N', b'G'],
            network_requests: vec![NetworkEntry {
                url: "https://example.com/".to_string(),
                status: 200,
                content_type: "text/html".to_string(),
            }],
            assertions: vec![],
            timestamp: "2026-10-19T09:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_no_assertions_is_success() {
        assert!(sample().all_passed());
    }

    #[test]
    fn test_single_failure_fails_run() {
        let mut result = sample();
        result.assertions.push(AssertionResult::new(AssertionKind::Text, "a", true, "ok"));
        result.assertions.push(AssertionResult::new(AssertionKind::Regex, "b", false, "no"));
        assert!(!result.all_passed());
    }

    #[test]
    fn test_screenshot_is_base64_at_rest() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["screenshot"], "iVBORw==");
        assert_eq!(json["httpStatus"], 200);
        assert_eq!(json["networkRequests"][0]["contentType"], "text/html");

        let back: ValidationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.screenshot, vec![0x89, b'P', b'N', b'G']);
    }
}
