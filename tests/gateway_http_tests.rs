use std::sync::Arc;

use axum::body::{Body, to_bytes};
use http::{Method, Request, StatusCode};
use localvault::{GatewayState, LocalStore, StoreConfig, UploadLimits, build_router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "vault-test-boundary";

async fn app_with_limits(limits: UploadLimits) -> (TempDir, axum::Router) {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(StoreConfig::new(dir.path())).await.unwrap();
    let app = build_router(GatewayState::new(Arc::new(store), limits));
    (dir, app)
}

async fn app() -> (TempDir, axum::Router) {
    app_with_limits(UploadLimits::default()).await
}

async fn read_response(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice::<Value>(&body).expect("body should be valid JSON");
    (status, json)
}

async fn send_json(app: &axum::Router, method: Method, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build");
    read_response(app, request).await
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    read_response(app, request).await
}

/// (field name, file name, content type, content); a `None` file name makes
/// a plain text field.
type Part<'a> = (&'a str, Option<&'a str>, &'a str, &'a str);

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, content_type, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send_multipart(app: &axum::Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request should build");
    read_response(app, request).await
}

fn mutation(action: &str, data: Value) -> Value {
    json!({
        "action": action,
        "data": data,
        "userId": "u1",
        "userName": "Asha",
        "timestamp": "2024-05-10T09:00:00Z"
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let (_dir, app) = app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn sync_then_mutations_keep_snapshot_and_log_in_step() {
    let (_dir, app) = app().await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/backup/sync/policies",
        json!({"data": [{"id": "a", "holder": "Asha"}, {"id": "b", "holder": "Bo"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/backup/policies",
        mutation("UPDATE", json!({"id": "a", "holder": "Asha K"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/backup/policies",
        mutation("DELETE", json!({"id": "b"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, records) = get(&app, "/backup/read/policies").await;
    assert_eq!(status, StatusCode::OK);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "a");
    assert_eq!(records[0]["holder"], "Asha K");
    assert!(records[0]["backupTimestamp"].is_string());

    let (status, log) = get(&app, "/backup/history/policies/2024-05").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log["totalEntries"], 2);
    let events = log["entriesByDate"]["2024-05-10"].as_array().unwrap();
    assert_eq!(events[0]["action"], "UPDATE");
    assert_eq!(events[1]["action"], "DELETE");
    assert_eq!(events[1]["userName"], "Asha");
}

#[tokio::test]
async fn repeated_create_collapses_in_snapshot_but_not_in_log() {
    let (_dir, app) = app().await;
    let body = mutation("CREATE", json!({"id": "t1", "title": "Call client"}));

    for _ in 0..2 {
        let (status, _) = send_json(&app, Method::POST, "/backup/tasks", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, records) = get(&app, "/backup/read/tasks").await;
    assert_eq!(records.as_array().unwrap().len(), 1);

    let (_, log) = get(&app, "/backup/history/tasks/2024-05").await;
    assert_eq!(log["totalEntries"], 2);
}

#[tokio::test]
async fn reconciliation_replaces_temporary_entry() {
    let (_dir, app) = app().await;

    send_json(
        &app,
        Method::POST,
        "/backup/policies",
        mutation("CREATE", json!({"id": "temp_1700000000000_abcdefghi", "holder": "Asha"})),
    )
    .await;

    let mut reconcile = mutation("UPDATE", json!({"id": "real-1", "holder": "Asha"}));
    reconcile["supersedesTempId"] = json!("temp_1700000000000_abcdefghi");
    let (status, _) = send_json(&app, Method::POST, "/backup/policies", reconcile).await;
    assert_eq!(status, StatusCode::OK);

    let (_, records) = get(&app, "/backup/read/policies").await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "real-1");

    let (status, _) = get(&app, "/backup/read/policies/temp_1700000000000_abcdefghi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reads_of_unknown_collections_are_empty() {
    let (_dir, app) = app().await;

    let (status, body) = get(&app, "/backup/read/never_written").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = get(&app, "/backup/history/never_written/2024-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalEntries"], 0);
}

#[tokio::test]
async fn missing_record_is_404_with_error_envelope() {
    let (_dir, app) = app().await;

    let (status, body) = get(&app, "/backup/read/policies/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let (_dir, app) = app().await;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/backup/policies",
        mutation("CREATE", json!({"holder": "no id"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/backup/bad.name",
        mutation("CREATE", json!({"id": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/backup/policies",
        json!({"action": "UPSERT", "data": {"id": "x"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/backup/history/policies/2024-13").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // nothing above reached the store
    let (_, records) = get(&app, "/backup/read/policies").await;
    assert_eq!(records, json!([]));
}

#[tokio::test]
async fn read_filters_by_user() {
    let (_dir, app) = app().await;
    send_json(
        &app,
        Method::POST,
        "/backup/sync/tasks",
        json!({"data": [
            {"id": "1", "userId": "u1"},
            {"id": "2", "userId": "u2"},
            {"id": "3", "userId": "u1"}
        ]}),
    )
    .await;

    let (status, records) = get(&app, "/backup/read/tasks?userId=u1").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn query_filters_and_sorts() {
    let (_dir, app) = app().await;
    send_json(
        &app,
        Method::POST,
        "/backup/sync/policies",
        json!({"data": [
            {"id": "a", "status": "active", "premium": 300},
            {"id": "b", "status": "lapsed", "premium": 100},
            {"id": "c", "status": "active", "premium": 200}
        ]}),
    )
    .await;

    let (status, records) = send_json(
        &app,
        Method::POST,
        "/backup/query/policies",
        json!({"filters": {"status": "active"}, "sortBy": "premium", "sortOrder": "desc"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);

    let (status, records) = send_json(&app, Method::POST, "/backup/query/policies", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn single_upload_is_stored_and_counted() {
    let (_dir, app) = app().await;

    let (status, body) = send_multipart(
        &app,
        "/backup/asset/policies/p1",
        &[("file", Some("claim form.pdf"), "application/pdf", "%PDF-1.4")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("policies_p1_"));
    assert!(filename.ends_with("_claim_form.pdf"));

    let (_, stats) = get(&app, "/backup/stats").await;
    assert_eq!(stats["totalAssetCount"], 1);
}

#[tokio::test]
async fn batch_upload_stores_every_file() {
    let (_dir, app) = app().await;

    let (status, body) = send_multipart(
        &app,
        "/backup/assets/policies/p1",
        &[
            ("files", Some("front.jpg"), "image/jpeg", "front"),
            ("files", Some("back.jpg"), "image/jpeg", "back"),
            ("note", None, "text/plain", "ignored"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files[0]["originalName"], "front.jpg");
    assert_eq!(files[1]["mimeType"], "image/jpeg");
    assert_eq!(files[1]["size"], 4);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let (_dir, app) = app().await;

    let (status, body) = send_multipart(
        &app,
        "/backup/asset/policies/p1",
        &[("note", None, "text/plain", "no file here")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");

    let (status, body) = send_multipart(
        &app,
        "/backup/assets/policies/p1",
        &[("note", None, "text/plain", "still no file")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No files uploaded");
}

#[tokio::test]
async fn too_many_files_writes_nothing() {
    let (_dir, app) = app_with_limits(UploadLimits {
        max_files: 2,
        ..UploadLimits::default()
    })
    .await;

    let (status, body) = send_multipart(
        &app,
        "/backup/assets/policies/p1",
        &[
            ("files", Some("1.txt"), "text/plain", "1"),
            ("files", Some("2.txt"), "text/plain", "2"),
            ("files", Some("3.txt"), "text/plain", "3"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 2"));

    let (_, stats) = get(&app, "/backup/stats").await;
    assert_eq!(stats["totalAssetCount"], 0);
}

#[tokio::test]
async fn oversized_file_is_413() {
    let (_dir, app) = app_with_limits(UploadLimits {
        max_file_bytes: 8,
        max_files: 2,
    })
    .await;

    let (status, body) = send_multipart(
        &app,
        "/backup/asset/policies/p1",
        &[("file", Some("big.bin"), "application/octet-stream", "0123456789abcdef")],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn batch_with_one_oversized_file_stores_nothing() {
    let (_dir, app) = app_with_limits(UploadLimits {
        max_file_bytes: 8,
        max_files: 3,
    })
    .await;

    let (status, body) = send_multipart(
        &app,
        "/backup/assets/policies/p1",
        &[
            ("files", Some("exact.bin"), "application/octet-stream", "01234567"),
            ("files", Some("big.bin"), "application/octet-stream", "0123456789abcdef"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("big.bin"));

    let (_, stats) = get(&app, "/backup/stats").await;
    assert_eq!(stats["totalAssetCount"], 0);

    // a file at exactly the limit is fine on its own
    let (status, _) = send_multipart(
        &app,
        "/backup/asset/policies/p1",
        &[("file", Some("exact.bin"), "application/octet-stream", "01234567")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stats_cover_snapshots_logs_and_assets() {
    let (_dir, app) = app().await;

    let (_, stats) = get(&app, "/backup/stats").await;
    assert_eq!(stats["totalAssetCount"], 0);
    assert_eq!(stats["perCollectionCount"], json!({}));

    send_json(
        &app,
        Method::POST,
        "/backup/policies",
        mutation("CREATE", json!({"id": "p1"})),
    )
    .await;
    send_json(
        &app,
        Method::POST,
        "/backup/sync/tasks",
        json!({"data": [{"id": "t1"}, {"id": "t2"}]}),
    )
    .await;

    let (status, stats) = get(&app, "/backup/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["perCollectionCount"], json!({"policies": 1, "tasks": 2}));
    assert_eq!(stats["monthlyLogFileNames"], json!(["2024-05_policies.json"]));
}
