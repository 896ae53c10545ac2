//! Detection client wire tests
//!
//! Exercises the real `DetectionClient` against a minimal local endpoint:
//! multipart field shape, success decoding, status preservation, and the
//! transport/decode error split.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::sync::Mutex;

use lookout::{DetectError, Detector, DetectionClient, DetectionClientConfig, EncodedFrame};

/// What the mock endpoint saw in the upload.
#[derive(Default, Clone)]
struct Received {
    field_name: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    byte_len: usize,
}

type Shared = Arc<Mutex<Received>>;

async fn detect_ok(State(received): State<Shared>, mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let mut seen = Received {
            field_name: field.name().map(str::to_string),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            byte_len: 0,
        };
        seen.byte_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        *received.lock().await = seen;
    }

    Json(serde_json::json!({
        "detected_objects": [
            {"class": "person", "confidence": 0.93, "bbox": [10, 20, 100, 200]}
        ],
        "processed_image": "data:image/jpeg;base64,AAAA"
    }))
}

async fn detect_unavailable() -> impl IntoResponse {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn detect_garbage() -> impl IntoResponse {
    "this is not json"
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> DetectionClient {
    DetectionClient::new(DetectionClientConfig {
        endpoint: format!("http://{addr}/api/detect"),
        ..Default::default()
    })
    .unwrap()
}

fn jpeg_frame() -> EncodedFrame {
    EncodedFrame {
        bytes: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02, 0x03, 0x04]),
        width: 2,
        height: 2,
    }
}

#[tokio::test]
async fn submits_multipart_and_decodes_the_batch() {
    let received: Shared = Arc::default();
    let app = Router::new()
        .route("/api/detect", post(detect_ok))
        .with_state(received.clone());
    let addr = serve(app).await;

    let batch = client_for(addr).submit(&jpeg_frame()).await.unwrap();

    assert_eq!(batch.objects.len(), 1);
    assert_eq!(batch.objects[0].class, "person");
    assert_eq!(batch.objects[0].confidence, 0.93);
    assert_eq!(batch.objects[0].bbox, [10, 20, 100, 200]);
    assert_eq!(
        batch.annotated_image.as_deref(),
        Some("data:image/jpeg;base64,AAAA")
    );

    let seen = received.lock().await.clone();
    assert_eq!(seen.field_name.as_deref(), Some("image"));
    assert_eq!(seen.file_name.as_deref(), Some("capture.jpg"));
    assert_eq!(seen.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(seen.byte_len, jpeg_frame().bytes.len());
}

#[tokio::test]
async fn non_success_status_is_preserved() {
    let app = Router::new().route("/api/detect", post(detect_unavailable));
    let addr = serve(app).await;

    let err = client_for(addr).submit(&jpeg_frame()).await.unwrap_err();
    assert!(matches!(err, DetectError::Server { status: 500 }));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let app = Router::new().route("/api/detect", post(detect_garbage));
    let addr = serve(app).await;

    let err = client_for(addr).submit(&jpeg_frame()).await.unwrap_err();
    assert!(matches!(err, DetectError::Decode(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let client = DetectionClient::new(DetectionClientConfig {
        endpoint: "http://127.0.0.1:9/api/detect".to_string(),
        connect_timeout: std::time::Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap();

    let err = client.submit(&jpeg_frame()).await.unwrap_err();
    assert!(matches!(err, DetectError::Network(_)));
}
