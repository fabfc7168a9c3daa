//! Network activity tracking for a single navigation.
//!
//! The tracker is fed DevTools network events as they arrive. Events of one
//! kind keep their order, but a request's finish can show up before its
//! start, so a finished id is terminal and a late start for it is ignored.
//! It keeps the append-only response log and the set of in-flight request
//! ids, which is what the network-idle wait polls.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::types::NetworkEntry;

/// A network event reduced to what the tracker needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Request about to be sent
    RequestStarted { request_id: String },
    /// Response headers arrived
    ResponseReceived {
        request_id: String,
        entry: NetworkEntry,
    },
    /// Body fully loaded
    Finished { request_id: String },
    /// Request failed or was cancelled
    Failed { request_id: String },
}

/// Accumulates responses and in-flight state for one page
#[derive(Debug)]
pub struct NetworkTracker {
    responses: Vec<NetworkEntry>,
    in_flight: HashSet<String>,
    /// Finished or failed ids; redirects reuse an id but finish only once
    settled: HashSet<String>,
    last_activity: Instant,
}

impl NetworkTracker {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            in_flight: HashSet::new(),
            settled: HashSet::new(),
            last_activity: Instant::now(),
        }
    }

    /// Apply one event
    pub fn record(&mut self, event: NetworkEvent) {
        self.last_activity = Instant::now();
        match event {
            NetworkEvent::RequestStarted { request_id } => {
                if !self.settled.contains(&request_id) {
                    self.in_flight.insert(request_id);
                }
            }
            NetworkEvent::ResponseReceived { entry, .. } => {
                self.responses.push(entry);
            }
            NetworkEvent::Finished { request_id } | NetworkEvent::Failed { request_id } => {
                self.in_flight.remove(&request_id);
                self.settled.insert(request_id);
            }
        }
    }

    /// Number of requests started but not finished or failed
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// True when nothing is in flight and nothing has happened for `window`
    pub fn is_idle(&self, window: Duration) -> bool {
        self.in_flight.is_empty() && self.last_activity.elapsed() >= window
    }

    /// Responses observed so far, in arrival order
    pub fn responses(&self) -> &[NetworkEntry] {
        &self.responses
    }

    /// Consume the tracker, yielding the response log
    pub fn into_responses(self) -> Vec<NetworkEntry> {
        self.responses
    }
}

impl Default for NetworkTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip one trailing slash so `https://a.b` and `https://a.b/` compare equal
pub fn normalize_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// The response whose URL matches the requested one and whose type is HTML
pub fn find_main_document<'a>(
    entries: &'a [NetworkEntry],
    requested_url: &str,
) -> Option<&'a NetworkEntry> {
    let wanted = normalize_url(requested_url);
    entries.iter().find(|entry| {
        normalize_url(&entry.url) == wanted
            && entry.content_type.to_ascii_lowercase().contains("text/html")
    })
}

/// Resolve the main document status; the navigation's own status wins
pub fn resolve_http_status(
    navigation_status: Option<u16>,
    entries: &[NetworkEntry],
    requested_url: &str,
) -> Option<u16> {
    navigation_status.or_else(|| find_main_document(entries, requested_url).map(|e| e.status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, status: u16, content_type: &str) -> NetworkEntry {
        NetworkEntry {
            url: url.to_string(),
            status,
            content_type: content_type.to_string(),
        }
    }

    fn started(id: &str) -> NetworkEvent {
        NetworkEvent::RequestStarted {
            request_id: id.to_string(),
        }
    }

    #[test]
    fn test_responses_keep_arrival_order() {
        let mut tracker = NetworkTracker::new();
        for (i, url) in ["https://a/", "https://a/app.js", "https://a/style.css"].iter().enumerate() {
            tracker.record(NetworkEvent::ResponseReceived {
                request_id: i.to_string(),
                entry: entry(url, 200, "x"),
            });
        }
        let urls: Vec<_> = tracker.responses().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/", "https://a/app.js", "https://a/style.css"]);
    }

    #[test]
    fn test_in_flight_accounting() {
        let mut tracker = NetworkTracker::new();
        tracker.record(started("1"));
        tracker.record(started("2"));
        assert_eq!(tracker.in_flight(), 2);

        tracker.record(NetworkEvent::Finished {
            request_id: "1".to_string(),
        });
        tracker.record(NetworkEvent::Failed {
            request_id: "2".to_string(),
        });
        assert_eq!(tracker.in_flight(), 0);
        assert!(tracker.is_idle(Duration::ZERO));
    }

    #[test]
    fn test_finish_before_start_is_not_in_flight() {
        let mut tracker = NetworkTracker::new();
        tracker.record(started("x"));
        tracker.record(NetworkEvent::Finished {
            request_id: "y".to_string(),
        });
        tracker.record(started("y"));
        tracker.record(NetworkEvent::Failed {
            request_id: "x".to_string(),
        });
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_redirect_reuses_request_id() {
        let mut tracker = NetworkTracker::new();
        tracker.record(started("doc"));
        tracker.record(started("doc"));
        assert_eq!(tracker.in_flight(), 1);
        tracker.record(NetworkEvent::Finished {
            request_id: "doc".to_string(),
        });
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_not_idle_while_requests_pending() {
        let mut tracker = NetworkTracker::new();
        tracker.record(started("1"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!tracker.is_idle(Duration::from_millis(10)));
    }

    #[test]
    fn test_not_idle_inside_quiet_window() {
        let tracker = NetworkTracker::new();
        assert!(!tracker.is_idle(Duration::from_secs(60)));
    }

    #[test]
    fn test_main_document_trailing_slash() {
        let entries = vec![
            entry("https://example.com/favicon.ico", 404, "text/html"),
            entry("https://example.com/", 200, "text/html; charset=UTF-8"),
        ];
        let main = find_main_document(&entries, "https://example.com").unwrap();
        assert_eq!(main.status, 200);
    }

    #[test]
    fn test_main_document_requires_html() {
        let entries = vec![entry("https://example.com/data", 200, "application/json")];
        assert!(find_main_document(&entries, "https://example.com/data").is_none());
    }

    #[test]
    fn test_navigation_status_takes_precedence() {
        let entries = vec![entry("https://example.com/", 200, "text/html")];
        assert_eq!(resolve_http_status(Some(304), &entries, "https://example.com/"), Some(304));
        assert_eq!(resolve_http_status(None, &entries, "https://example.com/"), Some(200));
        assert_eq!(resolve_http_status(None, &[], "https://example.com/"), None);
    }
}
