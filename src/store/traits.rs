//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::mood::model::{MoodEntry, NewMoodEntry};
use crate::onboarding::model::{NewUser, UserProfile};

/// Backend-agnostic database trait covering users, sessions and moods.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert a new user. A taken email or idempotency key is a
    /// `DatabaseError::Constraint`.
    async fn create_user(&self, user: &NewUser) -> Result<UserProfile, DatabaseError>;

    /// Get a user by ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError>;

    /// Get a user by (normalized) email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Get the user created with this idempotency key, if any.
    async fn get_user_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<UserProfile>, DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Issue a new opaque session token for a user.
    async fn create_session(&self, user_id: Uuid) -> Result<String, DatabaseError>;

    /// Resolve a session token to its user.
    async fn user_for_token(&self, token: &str) -> Result<Option<Uuid>, DatabaseError>;

    // ── Moods ───────────────────────────────────────────────────────

    /// Insert or replace the user's entry for that day.
    async fn upsert_mood(&self, entry: &NewMoodEntry) -> Result<MoodEntry, DatabaseError>;

    /// The user's entries, newest day first, up to `limit`.
    async fn list_moods(&self, user_id: Uuid, limit: usize)
    -> Result<Vec<MoodEntry>, DatabaseError>;
}
