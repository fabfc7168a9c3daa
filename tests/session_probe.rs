//! Integration tests for debugging-endpoint probing and session acquisition.
//! A mock HTTP server stands in for the browser; nothing is launched.

use std::net::TcpListener;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use serde_json::json;

use web_validate::session::{DevToolsEndpoint, SessionConfig, SessionError, SessionManager};

/// A loopback port with nothing listening on it
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn version_body(ws: &str) -> serde_json::Value {
    json!({
        "Browser": "Chrome/129.0.6668.58",
        "Protocol-Version": "1.3",
        "webSocketDebuggerUrl": ws,
    })
}

#[tokio::test]
async fn test_probe_reads_debugger_url() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(200)
                .json_body(version_body("ws://127.0.0.1:9222/devtools/browser/abc"));
        })
        .await;

    let endpoint = DevToolsEndpoint::local(server.port());
    let info = endpoint.probe().await.expect("endpoint should answer");
    assert_eq!(info.web_socket_debugger_url, "ws://127.0.0.1:9222/devtools/browser/abc");
    assert!(info.browser.starts_with("Chrome/"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_probe_rejects_error_status_and_missing_url() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(200).json_body(json!({ "Browser": "Chrome/129" }));
        })
        .await;
    assert!(DevToolsEndpoint::local(server.port()).probe().await.is_none());

    let failing = MockServer::start_async().await;
    failing
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(500);
        })
        .await;
    assert!(DevToolsEndpoint::local(failing.port()).probe().await.is_none());
}

#[tokio::test]
async fn test_probe_closed_port() {
    assert!(DevToolsEndpoint::local(closed_port()).probe().await.is_none());
}

#[tokio::test]
async fn test_wait_is_bounded_when_port_never_opens() {
    let endpoint = DevToolsEndpoint::local(closed_port());
    let started = Instant::now();
    let err = endpoint
        .wait_until_ready(4, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    match err {
        SessionError::Timeout { waited, .. } => assert_eq!(waited, Duration::from_millis(200)),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_is_bounded_when_endpoint_hangs() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(version_body("ws://127.0.0.1:1/devtools/browser/x"));
        })
        .await;

    let started = Instant::now();
    let result = DevToolsEndpoint::local(server.port())
        .wait_until_ready(2, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(SessionError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_wait_returns_once_endpoint_answers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(200)
                .json_body(version_body("ws://127.0.0.1:9222/devtools/browser/ready"));
        })
        .await;

    let info = DevToolsEndpoint::local(server.port())
        .wait_until_ready(30, Duration::from_millis(500))
        .await
        .unwrap();
    assert!(info.web_socket_debugger_url.ends_with("/ready"));
}

fn chrome_is_running() -> Option<String> {
    Some("Google Chrome".to_string())
}

fn nothing_running() -> Option<String> {
    None
}

#[tokio::test]
async fn test_refuses_browser_without_debugging() {
    let port = closed_port();
    let manager = SessionManager::new(
        SessionConfig::new(port).browser_path(Some("/definitely/not/a/browser".into())),
    )
    .with_process_lookup(chrome_is_running);

    let err = manager.acquire().await.unwrap_err();
    assert!(matches!(err, SessionError::BrowserRunningWithoutDebugging { .. }));
    assert!(err.to_string().contains("quit the browser"));
}

#[tokio::test]
async fn test_live_endpoint_is_attached_not_launched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/json/version");
            then.status(200)
                .json_body(version_body(&format!("ws://127.0.0.1:{}/devtools/browser/gone", closed_port())));
        })
        .await;

    // A running browser would normally block a launch; with a live endpoint
    // the manager attaches instead, so the only failure is the dead socket.
    let manager = SessionManager::new(SessionConfig::new(server.port()))
        .with_process_lookup(chrome_is_running);
    let err = manager.acquire().await.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_missing_executable_fails_before_waiting() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = SessionConfig::new(closed_port())
        .profile_dir(Some(scratch.path().join("profile")))
        .browser_path(Some(scratch.path().join("no-such-chrome")))
        .connect_schedule(30, Duration::from_millis(500));
    config.source_profile = None;

    let started = Instant::now();
    let err = SessionManager::new(config)
        .with_process_lookup(nothing_running)
        .acquire()
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Launch(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(scratch.path().join("profile").is_dir());
}
