//! Navigation and capture over the DevTools protocol.
//!
//! One page per navigation. Network listeners are attached before `goto` so
//! the response log cannot miss early responses, and the page is closed on
//! every path once the listeners are up.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::network::{NetworkEvent, NetworkTracker, resolve_http_status};
use super::types::{CaptureConfig, CaptureError, CaptureResult, NetworkEntry, ValidationResult};

/// How often the idle wait re-checks the tracker
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Network events paired with the status of a `Document` response, if any
type EventStream = BoxStream<'static, (NetworkEvent, Option<u16>)>;

/// Drives one navigation and produces a `ValidationResult` without assertions
#[derive(Debug, Clone, Default)]
pub struct CaptureEngine {
    config: CaptureConfig,
}

/// Shared between the event pump task and the idle wait
#[derive(Debug, Default)]
struct PageActivity {
    tracker: NetworkTracker,
    /// Status of the first document response, i.e. the navigation's own response
    document_status: Option<u16>,
}

impl CaptureEngine {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Navigate to `url` in a fresh page and capture its settled state
    pub async fn capture(&self, browser: &Browser, url: &str) -> CaptureResult<ValidationResult> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Page(e.to_string()))?;

        let outcome = self.capture_on_page(&page, url).await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }
        outcome
    }

    async fn capture_on_page(&self, page: &Page, url: &str) -> CaptureResult<ValidationResult> {
        let activity = Arc::new(Mutex::new(PageActivity::default()));
        let events = network_events(page).await?;
        let pump = spawn_pump(events, Arc::clone(&activity));

        let outcome = self.navigate_and_read(page, url, &activity).await;
        pump.abort();
        outcome
    }

    async fn navigate_and_read(
        &self,
        page: &Page,
        url: &str,
        activity: &Arc<Mutex<PageActivity>>,
    ) -> CaptureResult<ValidationResult> {
        let timeout = self.config.nav_timeout;
        let started = Instant::now();
        let deadline = started + timeout;

        info!(url, "navigating");
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Err(_) => {
                return Err(CaptureError::Timeout {
                    url: url.to_string(),
                    timeout,
                });
            }
            Ok(Err(e)) => {
                return Err(CaptureError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
            Ok(Ok(_)) => {}
        }
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "load event reached");

        self.wait_for_network_idle(activity, url, deadline).await?;
        let load_time_ms = started.elapsed().as_millis() as u64;

        // No navigation may happen between these four reads.
        let final_url = page
            .url()
            .await
            .map_err(|e| capture_step("url", e))?
            .unwrap_or_else(|| url.to_string());
        let title = page
            .get_title()
            .await
            .map_err(|e| capture_step("title", e))?
            .unwrap_or_default();
        let html = page.content().await.map_err(|e| capture_step("html", e))?;
        let screenshot = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| capture_step("screenshot", e))?;

        let (network_requests, document_status) = {
            let guard = activity.lock().map_err(|_| CaptureError::Capture {
                step: "network",
                message: "network log lock poisoned".to_string(),
            })?;
            (guard.tracker.responses().to_vec(), guard.document_status)
        };
        let http_status = resolve_http_status(document_status, &network_requests, url);

        info!(
            %final_url,
            status = ?http_status,
            load_time_ms,
            responses = network_requests.len(),
            "page captured"
        );

        Ok(ValidationResult {
            requested_url: url.to_string(),
            final_url,
            title,
            http_status,
            load_time_ms,
            html,
            screenshot,
            network_requests,
            assertions: Vec::new(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    async fn wait_for_network_idle(
        &self,
        activity: &Arc<Mutex<PageActivity>>,
        url: &str,
        deadline: Instant,
    ) -> CaptureResult<()> {
        loop {
            let idle = activity
                .lock()
                .map(|a| a.tracker.is_idle(self.config.idle_window))
                .unwrap_or(false);
            if idle {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::Timeout {
                    url: url.to_string(),
                    timeout: self.config.nav_timeout,
                });
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    }
}

fn capture_step(step: &'static str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Capture {
        step,
        message: err.to_string(),
    }
}

/// Subscribe to the page's network events, merged into one stream
async fn network_events(page: &Page) -> CaptureResult<EventStream> {
    let listen_err = |e: chromiumoxide::error::CdpError| CaptureError::Page(e.to_string());

    let requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(listen_err)?
        .map(|ev| {
            let event = NetworkEvent::RequestStarted {
                request_id: ev.request_id.inner().clone(),
            };
            (event, None)
        })
        .boxed();

    let responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(listen_err)?
        .map(|ev| {
            let status = u16::try_from(ev.response.status).unwrap_or(0);
            let document = (ev.r#type == ResourceType::Document).then_some(status);
            let event = NetworkEvent::ResponseReceived {
                request_id: ev.request_id.inner().clone(),
                entry: NetworkEntry {
                    url: ev.response.url.clone(),
                    status,
                    content_type: ev.response.mime_type.clone(),
                },
            };
            (event, document)
        })
        .boxed();

    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(listen_err)?
        .map(|ev| {
            let event = NetworkEvent::Finished {
                request_id: ev.request_id.inner().clone(),
            };
            (event, None)
        })
        .boxed();

    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(listen_err)?
        .map(|ev| {
            let event = NetworkEvent::Failed {
                request_id: ev.request_id.inner().clone(),
            };
            (event, None)
        })
        .boxed();

    Ok(merge_network_events(vec![requests, responses, finished, failed]))
}

/// Interleave the per-event listeners. Order holds within one listener only;
/// the tracker copes with a finish overtaking its start.
fn merge_network_events(listeners: Vec<EventStream>) -> EventStream {
    stream::select_all(listeners).boxed()
}

fn spawn_pump(mut events: EventStream, activity: Arc<Mutex<PageActivity>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some((event, document_status)) = events.next().await {
            let Ok(mut guard) = activity.lock() else {
                break;
            };
            if guard.document_status.is_none() {
                guard.document_status = document_status;
            }
            guard.tracker.record(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::{self, UnboundedSender};
    use pretty_assertions::assert_eq;

    type Tagged = (NetworkEvent, Option<u16>);

    const URL: &str = "https://example.com";

    fn listener() -> (UnboundedSender<Tagged>, EventStream) {
        let (tx, rx) = mpsc::unbounded();
        (tx, rx.boxed())
    }

    fn request(id: &str) -> Tagged {
        let event = NetworkEvent::RequestStarted {
            request_id: id.to_string(),
        };
        (event, None)
    }

    fn finish(id: &str) -> Tagged {
        let event = NetworkEvent::Finished {
            request_id: id.to_string(),
        };
        (event, None)
    }

    fn response(id: &str, url: &str, status: u16, document: bool) -> Tagged {
        let event = NetworkEvent::ResponseReceived {
            request_id: id.to_string(),
            entry: NetworkEntry {
                url: url.to_string(),
                status,
                content_type: "text/html".to_string(),
            },
        };
        (event, document.then_some(status))
    }

    fn engine(idle_ms: u64, timeout_ms: u64) -> CaptureEngine {
        CaptureEngine::new(CaptureConfig {
            nav_timeout: Duration::from_millis(timeout_ms),
            idle_window: Duration::from_millis(idle_ms),
        })
    }

    fn shared_activity() -> Arc<Mutex<PageActivity>> {
        Arc::new(Mutex::new(PageActivity::default()))
    }

    #[tokio::test]
    async fn test_finishes_overtaking_starts_still_settle() {
        let (request_tx, requests) = listener();
        let (response_tx, responses) = listener();
        let (finish_tx, finishes) = listener();
        let activity = shared_activity();

        finish_tx.unbounded_send(finish("y")).unwrap();
        finish_tx.unbounded_send(finish("x")).unwrap();
        let pump = spawn_pump(
            merge_network_events(vec![requests, responses, finishes]),
            Arc::clone(&activity),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        request_tx.unbounded_send(request("x")).unwrap();
        request_tx.unbounded_send(request("y")).unwrap();
        drop((request_tx, response_tx, finish_tx));
        pump.await.unwrap();

        assert_eq!(activity.lock().unwrap().tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_idle_after_quiet_window() {
        let (tx, events) = listener();
        let activity = shared_activity();
        let _pump = spawn_pump(events, Arc::clone(&activity));
        tx.unbounded_send(request("doc")).unwrap();
        tx.unbounded_send(finish("doc")).unwrap();

        let begin = Instant::now();
        engine(100, 5_000)
            .wait_for_network_idle(&activity, URL, begin + Duration::from_secs(5))
            .await
            .unwrap();
        assert!(begin.elapsed() >= Duration::from_millis(100));
        assert!(begin.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pending_request_hits_deadline() {
        let (tx, events) = listener();
        let activity = shared_activity();
        let _pump = spawn_pump(events, Arc::clone(&activity));
        tx.unbounded_send(request("stalled")).unwrap();

        let begin = Instant::now();
        let err = engine(50, 300)
            .wait_for_network_idle(&activity, URL, begin + Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Timeout { .. }), "got {err:?}");
        assert!(begin.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_first_document_status_wins() {
        let (tx, events) = listener();
        let activity = shared_activity();
        tx.unbounded_send(response("1", "https://example.com/", 203, true)).unwrap();
        tx.unbounded_send(response("2", "https://example.com/app.js", 200, false)).unwrap();
        tx.unbounded_send(response("3", "https://ads.example/frame", 404, true)).unwrap();
        drop(tx);
        spawn_pump(events, Arc::clone(&activity)).await.unwrap();

        let guard = activity.lock().unwrap();
        assert_eq!(guard.document_status, Some(203));
        let urls: Vec<_> = guard.tracker.responses().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/", "https://example.com/app.js", "https://ads.example/frame"]
        );
        assert_eq!(
            resolve_http_status(guard.document_status, guard.tracker.responses(), URL),
            Some(203)
        );
    }
}
