//! Document endpoint routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::db::Body;
use crate::error::Result;
use crate::handlers::{delete_document, fetch_document, merge_document, MergeResponse};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/v1/documents/{account_id}",
        get(get_handler).patch(patch_handler).delete(delete_handler),
    )
}

/// GET /v1/documents/{account_id} - Read the whole document.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(account_id): Path<String>,
) -> Result<Json<Body>> {
    let body = fetch_document(state.documents.as_ref(), &account_id).await?;
    Ok(Json(body))
}

/// PATCH /v1/documents/{account_id} - Merge top-level fields.
async fn patch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(account_id): Path<String>,
    Json(fields): Json<Value>,
) -> Result<Json<MergeResponse>> {
    let response = merge_document(
        state.documents.as_ref(),
        state.clock.as_ref(),
        &account_id,
        fields,
    )
    .await?;
    Ok(Json(response))
}

/// DELETE /v1/documents/{account_id} - Remove the document.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(account_id): Path<String>,
) -> Result<StatusCode> {
    delete_document(state.documents.as_ref(), &account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::db::MemoryDocuments;
    use crate::{app, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use stride_engine::ManualClock;
    use tower::ServiceExt;

    fn state(auth_secret: Option<&str>) -> AppState {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "postgres://unused".into(),
            max_connections: 1,
            auth_secret: auth_secret.map(str::to_string),
        };
        let clock = ManualClock::at("2026-02-01T14:00:00Z").unwrap();
        AppState::new(Arc::new(MemoryDocuments::new()), Arc::new(clock), config)
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health() {
        let response = app(state(None))
            .oneshot(request(Method::GET, "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], json!("ok"));
    }

    #[tokio::test]
    async fn patch_then_get() {
        let state = state(None);

        let response = app(state.clone())
            .oneshot(request(
                Method::PATCH,
                "/v1/documents/acct-1",
                Some(json!({"goals": {"weeklyWorkouts": 4}})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"accountId": "acct-1", "updatedAt": "2026-02-01T14:00:00.000Z"})
        );

        let response = app(state)
            .oneshot(request(Method::GET, "/v1/documents/acct-1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["goals"]["weeklyWorkouts"], json!(4));
        assert_eq!(body["updatedAt"], json!("2026-02-01T14:00:00.000Z"));
    }

    #[tokio::test]
    async fn missing_document_is_404() {
        let response = app(state(None))
            .oneshot(request(Method::GET, "/v1/documents/nobody", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn non_object_patch_is_400() {
        let response = app(state(None))
            .oneshot(request(
                Method::PATCH,
                "/v1/documents/acct-1",
                Some(json!([1, 2, 3])),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn secret_is_enforced() {
        let state = state(Some("s3cret"));

        let response = app(state.clone())
            .oneshot(request(Method::GET, "/v1/documents/acct-1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let authorized = Request::builder()
            .method(Method::DELETE)
            .uri("/v1/documents/acct-1")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(authorized).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
