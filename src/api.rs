//! HTTP application: onboarding and mood routers plus the service probes.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::mood::{MoodRouteState, mood_routes};
use crate::onboarding::{OnboardingRouteState, onboarding_routes};
use crate::store::Database;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "safespace-api";

async fn root() -> &'static str {
    "Welcome to SafeSpace"
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

/// Build the full API router over a shared database handle.
pub fn app(db: Arc<dyn Database>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(onboarding_routes(OnboardingRouteState { db: db.clone() }))
        .merge(mood_routes(MoodRouteState { db }))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::store::LibSqlBackend;

    async fn test_app() -> Router {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        app(db)
    }

    async fn get_body(router: Router, path: &str) -> (StatusCode, Vec<u8>) {
        let resp = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn root_greets() {
        let (status, body) = get_body(test_app().await, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Welcome to SafeSpace");
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (status, body) = get_body(test_app().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, serde_json::json!({"status": "ok", "service": "safespace-api"}));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = get_body(test_app().await, "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_allowed() {
        let resp = test_app()
            .await
            .oneshot(
                Request::options("/api/onboarding")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }
}
