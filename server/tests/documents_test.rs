//! End-to-end tests for the document API over a real socket.
//!
//! Documents live in memory so no PostgreSQL instance is needed.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use stride_engine::ManualClock;
use stride_server::config::Config;
use stride_server::db::MemoryDocuments;
use stride_server::AppState;

struct TestServer {
    base: String,
    clock: Arc<ManualClock>,
    client: reqwest::Client,
}

async fn spawn(auth_secret: Option<&str>) -> TestServer {
    let config = Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "postgres://unused".into(),
        max_connections: 1,
        auth_secret: auth_secret.map(str::to_string),
    };
    let clock = Arc::new(ManualClock::at("2026-02-01T14:00:00Z").unwrap());
    let state = AppState::new(Arc::new(MemoryDocuments::new()), clock.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stride_server::app(state)).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        clock,
        client: reqwest::Client::new(),
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

// ============================================================================
// Merge Semantics
// ============================================================================

#[tokio::test]
async fn merge_keeps_unmentioned_keys() {
    let server = spawn(None).await;
    let url = server.url("/v1/documents/acct-1");

    let response = server
        .client
        .patch(&url)
        .json(&json!({
            "workouts": [{"id": "w1"}],
            "goals": {"weeklyWorkouts": 4}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.clock.advance(chrono::Duration::minutes(5));
    let response = server
        .client
        .patch(&url)
        .json(&json!({"workouts": []}))
        .send()
        .await
        .unwrap();
    let merged: Value = response.json().await.unwrap();
    assert_eq!(merged["updatedAt"], json!("2026-02-01T14:05:00.000Z"));

    let document: Value = server.client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(document["workouts"], json!([]));
    assert_eq!(document["goals"]["weeklyWorkouts"], json!(4));
    assert_eq!(document["updatedAt"], json!("2026-02-01T14:05:00.000Z"));
}

#[tokio::test]
async fn accounts_are_isolated() {
    let server = spawn(None).await;
    server
        .client
        .patch(server.url("/v1/documents/acct-a"))
        .json(&json!({"workouts": [{"id": "a"}]}))
        .send()
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/v1/documents/acct-b"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn percent_encoded_ids_round_trip() {
    let server = spawn(None).await;
    let url = server.url("/v1/documents/user%40example.com");
    server
        .client
        .patch(&url)
        .json(&json!({"settings": {"theme": "dark"}}))
        .send()
        .await
        .unwrap();

    let document: Value = server.client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(document["settings"]["theme"], json!("dark"));
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn delete_removes_document() {
    let server = spawn(None).await;
    let url = server.url("/v1/documents/acct-1");
    server
        .client
        .patch(&url)
        .json(&json!({"metrics": []}))
        .send()
        .await
        .unwrap();

    let response = server.client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = server.client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn bearer_secret_gates_every_route() {
    let server = spawn(Some("s3cret")).await;
    let url = server.url("/v1/documents/acct-1");

    let response = server
        .client
        .patch(&url)
        .json(&json!({"goals": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Unauthorized"));

    let response = server
        .client
        .patch(&url)
        .bearer_auth("s3cret")
        .json(&json!({"goals": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
