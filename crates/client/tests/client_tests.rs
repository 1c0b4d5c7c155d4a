use kcriff_client::ModelClient;
use kcriff_core::manifest::DownloadState;
use kcriff_core::{ClientError, RequestError};
use kcriff_transport::backend::{error_payload, status_payload};
use kcriff_transport::{Capability, StubTransport, TransportKind};
use std::sync::Arc;

const CATALOGUE: &str = r#"[
    {"name":"mistral-7b","description":"Mistral 7B","size":4100000000,"parameters":7300000000,"downloaded":false,"kc_recommended":true},
    {"name":"phi-2","description":"Phi-2","size":1600000000,"parameters":2700000000,"downloaded":true,"kc_recommended":false},
    {"name":"llama3-8b","description":"Llama 3","size":4700000000,"parameters":8000000000,"downloaded":true,"kc_recommended":true},
    {"name":"tinyllama","description":"TinyLlama","size":600000000,"parameters":1100000000,"downloaded":false,"kc_recommended":false}
]"#;

fn client(stub: StubTransport) -> (ModelClient, Arc<StubTransport>) {
    let stub = Arc::new(stub);
    (ModelClient::new(stub.clone()), stub)
}

fn names(models: &[kcriff_core::manifest::Model]) -> Vec<&str> {
    models.iter().map(|m| m.name.as_str()).collect()
}

#[async_std::test]
async fn test_recommended_filter_keeps_order() {
    let (client, stub) = client(StubTransport::new().with_models(CATALOGUE));
    assert_eq!(client.transport_kind(), TransportKind::InMemory);

    // Nothing is listed before the first fetch.
    assert!(client.recommended_models().is_empty());

    let all = client.list_models().await.unwrap();
    assert_eq!(all.len(), 4);

    assert_eq!(names(&client.recommended_models()), vec!["mistral-7b", "llama3-8b"]);
    assert_eq!(names(&client.downloaded_models()), vec!["phi-2", "llama3-8b"]);
    assert_eq!(client.cached_models(), all);

    // Derived views never hit the backend.
    assert_eq!(stub.call_count(Capability::ListModels, None), 1);
}

#[async_std::test]
async fn test_failed_listing_keeps_previous_snapshot() {
    let (client, _) = client(StubTransport::new().with_models("{\"models\": 12}"));
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert!(client.cached_models().is_empty());
}

#[async_std::test]
async fn test_status_decoding() {
    let (client, _) = client(StubTransport::new().with_statuses(
        "phi-2",
        vec![
            Ok(status_payload("phi-2", 37.5, false)),
            Ok(error_payload("disk full")),
            Err(RequestError::Network("connection reset".into())),
            Ok("{{{".to_string()),
        ],
    ));

    let status = client.get_download_status("phi-2").await.unwrap();
    assert_eq!(status.progress, 37.5);
    assert_eq!(status.state, DownloadState::Downloading);
    assert!(!status.completed);

    assert_eq!(
        client.get_download_status("phi-2").await.unwrap_err(),
        ClientError::Remote("disk full".into())
    );
    assert!(matches!(
        client.get_download_status("phi-2").await.unwrap_err(),
        ClientError::Request(RequestError::Network(_))
    ));
    assert!(matches!(
        client.get_download_status("phi-2").await.unwrap_err(),
        ClientError::Decode(_)
    ));
}

#[async_std::test]
async fn test_start_and_remove_acknowledge() {
    let (client, stub) = client(
        StubTransport::new()
            .with_start_reply("huge", Ok(error_payload("insufficient disk space"))),
    );

    let ack = client.start_download("mistral-7b").await.unwrap();
    assert_eq!(ack.status.as_deref(), Some("downloading"));

    let err = client.start_download("huge").await.unwrap_err();
    assert_eq!(err, ClientError::Remote("insufficient disk space".into()));

    let ack = client.remove_model("mistral-7b").await.unwrap();
    assert_eq!(ack.status.as_deref(), Some("removed"));
    assert_eq!(stub.call_count(Capability::StartDownload, None), 2);
}

#[async_std::test]
async fn test_updates_and_health() {
    let (client, _) = client(
        StubTransport::new()
            .with_updates(Ok(r#"{"available":true,"current_version":"0.1.0","new_version":"0.2.0","release_notes":"New models"}"#.into()))
            .with_apply_reply(Ok(r#"{"status":"updating","from_version":"0.1.0","to_version":"0.2.0"}"#.into()))
            .with_health(Ok(r#"{"status":"ok","version":"0.1.0","name":"KC-Riff"}"#.into())),
    );

    let info = client.check_for_updates().await.unwrap();
    assert!(info.available);
    assert_eq!(info.new_version.as_deref(), Some("0.2.0"));
    assert_eq!(info.release_notes.as_deref(), Some("New models"));

    let ack = client.apply_update().await.unwrap();
    assert_eq!(ack.to_version.as_deref(), Some("0.2.0"));

    let health = client.health_check().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.version.as_deref(), Some("0.1.0"));
}

#[async_std::test]
async fn test_no_update_is_remote_error() {
    let (client, _) = client(StubTransport::new());
    let err = client.apply_update().await.unwrap_err();
    assert_eq!(err, ClientError::Remote("No update available".into()));
}

#[async_std::test]
async fn test_empty_reply_is_decode_error() {
    let (client, _) = client(StubTransport::new().with_health(Ok(String::new())));
    assert!(matches!(
        client.health_check().await.unwrap_err(),
        ClientError::Decode(_)
    ));
}

#[test]
fn test_claims_are_exclusive() {
    let (client, _) = client(StubTransport::new());
    let claim = client.claim_download("mistral-7b").unwrap();
    assert!(client.is_downloading("mistral-7b"));
    assert!(client.claim_download("mistral-7b").is_none());
    assert_eq!(client.active_downloads(), vec!["mistral-7b".to_string()]);

    drop(claim);
    assert!(!client.is_downloading("mistral-7b"));
}
