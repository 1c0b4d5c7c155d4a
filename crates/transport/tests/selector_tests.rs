use kcriff_core::config::TransportConfig;
use kcriff_transport::{TransportKind, TransportSelector};
use std::path::PathBuf;

// Nothing listens on port 1.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

fn config(libraries: &[&str], endpoint: &str, probe: bool) -> TransportConfig {
    TransportConfig {
        library_paths: libraries.iter().map(PathBuf::from).collect(),
        search_default_paths: false,
        endpoint: endpoint.to_string(),
        probe_endpoint: probe,
        request_timeout_secs: 2,
    }
}

#[async_std::test]
async fn test_falls_back_to_http_without_binding() {
    let selector = TransportSelector::new(config(
        &["/nonexistent/libkcriff.so"],
        "http://localhost:5000",
        false,
    ));

    let transport = selector.resolve().await.expect("http fallback");
    assert_eq!(transport.kind(), TransportKind::Http);
    assert_eq!(transport.location(), "http://localhost:5000/");
}

#[async_std::test]
async fn test_unreachable_endpoint_lists_every_attempt() {
    let selector = TransportSelector::new(config(
        &["/nonexistent/a/libkcriff.so", "/nonexistent/b/libkcriff.so"],
        DEAD_ENDPOINT,
        true,
    ));

    let err = match selector.resolve().await {
        Ok(t) => panic!("expected failure, got {}", t.location()),
        Err(e) => e,
    };
    assert_eq!(err.attempts.len(), 2);
    assert_eq!(err.attempts[0].candidate, "/nonexistent/a/libkcriff.so");
    assert_eq!(err.endpoint, DEAD_ENDPOINT);
    assert!(!err.endpoint_reason.is_empty());
}

#[async_std::test]
async fn test_malformed_endpoint_is_unavailable() {
    let selector = TransportSelector::new(config(&[], "localhost 5000", false));
    let err = selector.resolve().await.err().expect("bad endpoint");
    assert!(err.attempts.is_empty());
    assert_eq!(err.endpoint, "localhost 5000");
    assert!(!err.endpoint_reason.is_empty());
}

#[cfg(target_os = "linux")]
#[async_std::test]
async fn test_library_without_entry_points_is_rejected() {
    // libc loads fine but exports none of the model entry points.
    let selector = TransportSelector::new(config(&["libc.so.6"], DEAD_ENDPOINT, true));

    let err = selector.resolve().await.err().expect("no usable transport");
    assert_eq!(err.attempts.len(), 1);
    assert!(
        err.attempts[0].reason.contains("GetModels"),
        "unexpected reason: {}",
        err.attempts[0].reason
    );
}
