use async_std::task;
use kcriff_core::config::TransportConfig;
use kcriff_core::RequestError;
use kcriff_transport::{Call, HttpTransport, Transport, TransportKind, TransportSelector};
use std::time::Duration;

/// Starts a fake model service on `port` and waits until it accepts connections.
async fn serve_fake_backend(port: u16) -> String {
    let mut app = tide::new();
    app.at("/api/models").get(|_| async {
        Ok(r#"[{"name":"llama3","description":"Meta Llama 3","size":4000000000,"downloaded":false,"kc_recommended":true}]"#)
    });
    app.at("/api/models/status")
        .get(|req: tide::Request<()>| async move {
            let name = req
                .url()
                .query_pairs()
                .find(|(key, _)| key == "name")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            Ok(format!(
                r#"{{"model_name":"{}","progress":42.5,"completed":false}}"#,
                name
            ))
        });
    app.at("/api/models/remove").get(|_| async {
        Ok(tide::Response::builder(404).body("no such model").build())
    });
    app.at("/api/updates").get(|_| async {
        task::sleep(Duration::from_secs(2)).await;
        Ok(r#"{"available":false}"#)
    });
    app.at("/api/health")
        .get(|_| async { Ok(r#"{"status":"ok","version":"1.2.0"}"#) });

    let addr = format!("127.0.0.1:{}", port);
    task::spawn(app.listen(addr.clone()));

    for _ in 0..50 {
        if async_std::net::TcpStream::connect(&addr).await.is_ok() {
            return format!("http://{}", addr);
        }
        task::sleep(Duration::from_millis(20)).await;
    }
    panic!("fake backend failed to start on {}", addr);
}

fn transport(base: &str, timeout: Duration) -> HttpTransport {
    HttpTransport::new(base, timeout).expect("valid endpoint")
}

#[async_std::test]
async fn test_list_models_returns_raw_payload() {
    let base = serve_fake_backend(9411).await;
    let http = transport(&base, Duration::from_secs(5));

    let payload = http.call(Call::ListModels).await.unwrap();
    assert!(payload.contains("kc_recommended"));
}

#[async_std::test]
async fn test_model_name_reaches_the_service() {
    let base = serve_fake_backend(9412).await;
    let http = transport(&base, Duration::from_secs(5));

    let payload = http
        .call(Call::GetDownloadStatus("phi 3 mini".into()))
        .await
        .unwrap();
    assert!(payload.contains(r#""model_name":"phi 3 mini""#));
}

#[async_std::test]
async fn test_error_status_is_a_request_error() {
    let base = serve_fake_backend(9413).await;
    let http = transport(&base, Duration::from_secs(5));

    let err = http.call(Call::RemoveModel("llama3".into())).await.unwrap_err();
    assert_eq!(
        err,
        RequestError::Http {
            status: 404,
            body: "no such model".into()
        }
    );

    // Routes the service does not know about are reported the same way.
    let err = http.call(Call::ApplyUpdate).await.unwrap_err();
    assert!(matches!(err, RequestError::Http { status: 404, .. }));
}

#[async_std::test]
async fn test_slow_reply_times_out() {
    let base = serve_fake_backend(9414).await;
    let http = transport(&base, Duration::from_millis(200));

    let err = http.call(Call::CheckForUpdates).await.unwrap_err();
    assert_eq!(err, RequestError::Timeout(Duration::from_millis(200)));
}

#[async_std::test]
async fn test_refused_connection_is_a_network_error() {
    let http = transport("http://127.0.0.1:1", Duration::from_secs(2));
    let err = http.call(Call::HealthCheck).await.unwrap_err();
    assert!(matches!(err, RequestError::Network(_)), "got {:?}", err);
}

#[async_std::test]
async fn test_selector_probes_live_endpoint() {
    let base = serve_fake_backend(9415).await;
    let config = TransportConfig {
        library_paths: vec!["/nonexistent/libkcriff.so".into()],
        search_default_paths: false,
        endpoint: base.clone(),
        probe_endpoint: true,
        request_timeout_secs: 5,
    };

    let transport = TransportSelector::new(config).resolve().await.unwrap();
    assert_eq!(transport.kind(), TransportKind::Http);

    let health = transport.call(Call::HealthCheck).await.unwrap();
    assert!(health.contains("\"ok\""));
}
