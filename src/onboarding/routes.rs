//! REST endpoint that creates a user profile from a finished wizard draft.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use super::client::{IDEMPOTENCY_HEADER, ONBOARDING_PATH};
use super::model::{NewUser, OnboardingRequest, UserProfile};
use super::validation::is_plausible_email;
use crate::error::{ApiError, DatabaseError};
use crate::store::Database;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub db: Arc<dyn Database>,
}

/// Response body for a created or replayed onboarding.
#[derive(Debug, Serialize)]
pub struct OnboardedBody {
    pub message: &'static str,
    pub user: UserProfile,
    pub token: String,
}

const CREATED_MESSAGE: &str = "User created successfully";
const REPLAYED_MESSAGE: &str = "User already onboarded";
const DUPLICATE_EMAIL_MESSAGE: &str = "User with this email already exists";

/// Check required fields and normalize the request into a `NewUser`.
pub fn new_user_from(
    req: OnboardingRequest,
    idempotency_key: Option<String>,
) -> Result<NewUser, String> {
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if first_name.is_empty() || last_name.is_empty() {
        return Err("First name and last name are required".into());
    }
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if !is_plausible_email(&email) {
        return Err("Please enter a valid email address".into());
    }
    if req.password.is_empty() {
        return Err("Password is required".into());
    }

    Ok(NewUser {
        first_name,
        last_name,
        email,
        password: req.password,
        birth_date: req.birth_date,
        goals: req.goals,
        experience: req.experience,
        preferences: req.preferences,
        idempotency_key,
    })
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
}

async fn existing_for_key(
    db: &dyn Database,
    key: Option<&str>,
) -> Result<Option<UserProfile>, DatabaseError> {
    match key {
        Some(key) => db.get_user_by_idempotency_key(key).await,
        None => Ok(None),
    }
}

async fn replay(
    db: &dyn Database,
    user: UserProfile,
) -> Result<(StatusCode, Json<OnboardedBody>), ApiError> {
    let token = db.create_session(user.id).await?;
    info!(user_id = %user.id, "Onboarding replayed for existing key");
    Ok((
        StatusCode::OK,
        Json(OnboardedBody {
            message: REPLAYED_MESSAGE,
            user,
            token,
        }),
    ))
}

/// POST /api/onboarding
///
/// 201 on create, 200 when the idempotency key was already used, 400 on a
/// malformed body, 409 on a taken email.
async fn create_profile(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OnboardedBody>), ApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e, "Rejected onboarding body");
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;
    let key = idempotency_key(&headers);

    if let Some(existing) = existing_for_key(state.db.as_ref(), key.as_deref()).await? {
        return replay(state.db.as_ref(), existing).await;
    }

    let new_user = new_user_from(req, key.clone()).map_err(ApiError::BadRequest)?;

    if state.db.get_user_by_email(&new_user.email).await?.is_some() {
        warn!("Onboarding rejected, email already registered");
        return Err(ApiError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
    }

    let user = match state.db.create_user(&new_user).await {
        Ok(user) => user,
        Err(DatabaseError::Constraint(msg)) => {
            // Lost a race with a concurrent request carrying the same key.
            if let Some(existing) = existing_for_key(state.db.as_ref(), key.as_deref()).await? {
                return replay(state.db.as_ref(), existing).await;
            }
            warn!(reason = %msg, "Onboarding conflict");
            return Err(ApiError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.db.create_session(user.id).await?;
    info!(user_id = %user.id, goals = user.goals.len(), "User onboarded");
    Ok((
        StatusCode::CREATED,
        Json(OnboardedBody {
            message: CREATED_MESSAGE,
            user,
            token,
        }),
    ))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route(ONBOARDING_PATH, post(create_profile))
        .with_state(state)
}
