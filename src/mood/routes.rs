//! REST endpoints for daily mood entries.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{DEFAULT_LIST_LIMIT, MoodEntry, MoodListQuery, MoodRequest};
use crate::error::ApiError;
use crate::store::Database;

/// Path of the mood endpoints.
pub const MOOD_PATH: &str = "/api/mood";

/// Shared state for mood routes.
#[derive(Clone)]
pub struct MoodRouteState {
    pub db: Arc<dyn Database>,
}

/// Resolve the `Authorization: Bearer <token>` header to a user.
///
/// Missing or malformed header is 401; a token nobody holds is 403.
pub async fn authenticate(db: &dyn Database, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Access token required".into()))?;

    db.user_for_token(token)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Invalid or expired token".into()))
}

/// POST /api/mood
async fn save_mood(
    State(state): State<MoodRouteState>,
    headers: HeaderMap,
    payload: Result<Json<MoodRequest>, JsonRejection>,
) -> Result<Json<MoodEntry>, ApiError> {
    let user_id = authenticate(state.db.as_ref(), &headers).await?;
    let Json(req) = payload
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
    let entry = req.into_new_entry(user_id).map_err(ApiError::BadRequest)?;

    let saved = state.db.upsert_mood(&entry).await?;
    info!(%user_id, date = %saved.date, mood = saved.mood, "Mood saved");
    Ok(Json(saved))
}

/// GET /api/mood?limit=N
async fn list_moods(
    State(state): State<MoodRouteState>,
    headers: HeaderMap,
    Query(query): Query<MoodListQuery>,
) -> Result<Json<Vec<MoodEntry>>, ApiError> {
    let user_id = authenticate(state.db.as_ref(), &headers).await?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let entries = state.db.list_moods(user_id, limit).await?;
    debug!(%user_id, count = entries.len(), "Moods listed");
    Ok(Json(entries))
}

/// Build the mood REST routes.
pub fn mood_routes(state: MoodRouteState) -> Router {
    Router::new()
        .route(MOOD_PATH, get(list_moods).post(save_mood))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::onboarding::model::{NewUser, Preferences};
    use crate::store::LibSqlBackend;

    async fn setup() -> (Router, String) {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let user = db
            .create_user(&NewUser {
                first_name: "Ava".into(),
                last_name: "Lee".into(),
                email: "ava@example.com".into(),
                password: "pw".into(),
                birth_date: None,
                goals: vec![],
                experience: None,
                preferences: Preferences::default(),
                idempotency_key: None,
            })
            .await
            .unwrap();
        let token = db.create_session(user.id).await.unwrap();
        (mood_routes(MoodRouteState { db }), token)
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post(token: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(MOOD_PATH).header("content-type", "application/json");
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (router, _) = setup().await;
        let (status, v) = send(&router, post(None, json!({"mood": 3}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(v["error"], "Access token required");
    }

    #[tokio::test]
    async fn unknown_token_is_forbidden() {
        let (router, _) = setup().await;
        let (status, _) = send(
            &router,
            post(Some("nope"), json!({"mood": 3, "date": "2024-05-01T08:00:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn out_of_range_mood_is_bad_request() {
        let (router, token) = setup().await;
        let (status, _) = send(
            &router,
            post(Some(&token), json!({"mood": 9, "date": "2024-05-01T08:00:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn same_day_upsert_keeps_one_entry() {
        let (router, token) = setup().await;
        let (s1, first) = send(
            &router,
            post(
                Some(&token),
                json!({"mood": 2, "date": "2024-05-01T08:00:00Z", "activities": ["work"]}),
            ),
        )
        .await;
        let (s2, second) = send(
            &router,
            post(
                Some(&token),
                json!({"mood": 4, "note": "evening walk", "date": "2024-05-01T20:00:00Z"}),
            ),
        )
        .await;
        assert_eq!(s1, StatusCode::OK);
        assert_eq!(s2, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["mood"], 4);

        let list = Request::get(MOOD_PATH)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, v) = send(&router, list).await;
        assert_eq!(status, StatusCode::OK);
        let entries = v.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["note"], "evening walk");
        assert_eq!(entries[0]["date"], "2024-05-01");
    }

    #[tokio::test]
    async fn list_honors_limit() {
        let (router, token) = setup().await;
        for day in 1..=3 {
            let date = format!("2024-05-0{day}T12:00:00Z");
            send(&router, post(Some(&token), json!({"mood": 3, "date": date}))).await;
        }
        let list = Request::get(format!("{MOOD_PATH}?limit=2"))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (_, v) = send(&router, list).await;
        let dates: Vec<&str> = v
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, vec!["2024-05-03", "2024-05-02"]);
    }
}
