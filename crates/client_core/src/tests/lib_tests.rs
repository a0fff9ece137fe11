use super::*;
use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    uploads: Arc<Mutex<Vec<(Option<String>, Option<String>, Vec<u8>)>>>,
    generate_bodies: Arc<Mutex<Vec<Value>>>,
    broken_generate: bool,
}

async fn record_upload(state: &ServerState, mut multipart: Multipart) -> Option<String> {
    let mut filename = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default();
        filename = file_name.clone();
        state
            .uploads
            .lock()
            .await
            .push((name, file_name, bytes.to_vec()));
    }
    filename
}

async fn handle_parse(State(state): State<ServerState>, multipart: Multipart) -> Json<Value> {
    record_upload(&state, multipart).await;
    Json(json!({ "model": "iPhone13", "capacity": "128GB", "color": null }))
}

async fn handle_upload(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let filename = record_upload(&state, multipart).await.unwrap_or_default();
    if !filename.ends_with(".txt") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Formato de archivo no válido. Sube un .txt" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "preview_url": "/generated/preview_1.png",
            "pdf_url": "/generated/etiqueta_1.pdf",
        })),
    )
}

async fn handle_generate(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if state.broken_generate {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    state.generate_bodies.lock().await.push(body);
    Json(json!({ "image_url": "/generated/label_1.png" })).into_response()
}

async fn handle_generated(Path(name): Path<String>) -> impl IntoResponse {
    if name == "label_1.png" {
        (StatusCode::OK, b"\x89PNG-label".to_vec())
    } else {
        (StatusCode::NOT_FOUND, Vec::new())
    }
}

async fn spawn_label_server(broken_generate: bool) -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        broken_generate,
        ..ServerState::default()
    };
    let app = Router::new()
        .route("/parse", post(handle_parse))
        .route("/upload", post(handle_upload))
        .route("/generate", post(handle_generate))
        .route("/generated/:name", get(handle_generated))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn report(name: &str) -> ReportFile {
    ReportFile::new(name, b"Device Model\n\niPhone13 A2633\nBattery Life 91%".to_vec())
}

#[test]
fn endpoints_keep_base_path_and_artifacts_resolve_from_origin() {
    let client = LabelClient::new("http://labels.local:5000/etiquetas").expect("client");
    assert_eq!(client.base_url().as_str(), "http://labels.local:5000/etiquetas/");
    assert_eq!(
        client.endpoint(PARSE_PATH).expect("endpoint").as_str(),
        "http://labels.local:5000/etiquetas/parse"
    );
    assert_eq!(
        client
            .resolve_url("/generated/label_1.png")
            .expect("resolve")
            .as_str(),
        "http://labels.local:5000/generated/label_1.png"
    );
    assert_eq!(
        client
            .resolve_url("https://cdn.example.com/l.png")
            .expect("resolve")
            .as_str(),
        "https://cdn.example.com/l.png"
    );
}

#[test]
fn rejects_unparseable_server_urls() {
    assert!(matches!(
        LabelClient::new("not a url"),
        Err(ClientSetupError::InvalidServerUrl { .. })
    ));
    assert!(matches!(
        LabelClient::new("mailto:labels@example.com"),
        Err(ClientSetupError::NotABaseUrl(_))
    ));
}

#[tokio::test]
async fn parse_report_sends_multipart_file_and_defaults_missing_fields() {
    let (server_url, state) = spawn_label_server(false).await.expect("spawn server");
    let client = LabelClient::new(&server_url).expect("client");

    let parsed = client
        .parse_report(&report("report.txt"))
        .await
        .expect("parse");
    assert_eq!(
        parsed,
        ParsedReport {
            model: "iPhone13".to_string(),
            capacity: "128GB".to_string(),
            color: String::new(),
            battery_life: String::new(),
        }
    );

    let uploads = state.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    let (part_name, file_name, bytes) = &uploads[0];
    assert_eq!(part_name.as_deref(), Some(FILE_PART_NAME));
    assert_eq!(file_name.as_deref(), Some("report.txt"));
    assert_eq!(bytes, &report("report.txt").bytes);
}

#[tokio::test]
async fn generate_label_posts_the_draft_as_json() {
    let (server_url, state) = spawn_label_server(false).await.expect("spawn server");
    let client = LabelClient::new(&server_url).expect("client");
    let request = GenerateRequest {
        model: "iPhone 13".to_string(),
        capacity: "128GB".to_string(),
        color: "Negro".to_string(),
        battery_life: "89%".to_string(),
        imei: "123456789012345".to_string(),
    };

    let label = client.generate_label(&request).await.expect("generate");
    assert_eq!(label.image_url, "/generated/label_1.png");

    let bodies = state.generate_bodies.lock().await;
    assert_eq!(
        bodies.as_slice(),
        &[json!({
            "model": "iPhone 13",
            "capacity": "128GB",
            "color": "Negro",
            "battery_life": "89%",
            "imei": "123456789012345",
        })]
    );
}

#[tokio::test]
async fn error_field_is_reported_regardless_of_status() {
    let (server_url, _state) = spawn_label_server(false).await.expect("spawn server");
    let client = LabelClient::new(&server_url).expect("client");

    let err = client
        .upload_report(&report("report.pdf"))
        .await
        .expect_err("rejected upload");
    assert_eq!(
        err,
        RemoteError::Server("Formato de archivo no válido. Sube un .txt".to_string())
    );

    let ok = client
        .upload_report(&report("report.txt"))
        .await
        .expect("legacy upload");
    assert_eq!(ok.preview_url, "/generated/preview_1.png");
    assert_eq!(ok.pdf_url, "/generated/etiqueta_1.pdf");
}

#[tokio::test]
async fn non_json_error_page_is_malformed_and_mentions_status() {
    let (server_url, _state) = spawn_label_server(true).await.expect("spawn server");
    let client = LabelClient::new(&server_url).expect("client");
    let request = GenerateRequest::from(&shared::domain::LabelDraft::default());

    match client.generate_label(&request).await {
        Err(RemoteError::Malformed(message)) => assert!(message.contains("500"), "{message}"),
        other => panic!("expected malformed error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = LabelClient::new(&format!("http://{addr}")).expect("client");
    let err = client
        .parse_report(&report("report.txt"))
        .await
        .expect_err("unreachable");
    assert!(matches!(err, RemoteError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn fetch_artifact_downloads_relative_urls() {
    let (server_url, _state) = spawn_label_server(false).await.expect("spawn server");
    let client = LabelClient::new(&server_url).expect("client");

    let bytes = client
        .fetch_artifact("/generated/label_1.png")
        .await
        .expect("download");
    assert_eq!(bytes, b"\x89PNG-label".to_vec());

    let err = client
        .fetch_artifact("/generated/missing.png")
        .await
        .expect_err("missing artifact");
    assert!(matches!(err, RemoteError::Transport(_)), "{err:?}");
}
