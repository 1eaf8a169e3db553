//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::mood::model::{MoodEntry, NewMoodEntry};
use crate::onboarding::model::{NewUser, UserProfile};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn user_where(
        &self,
        column: &str,
        value: String,
        op: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
                params![value],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("{op} row: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, first_name, last_name, email, birth_date, goals, experience, \
     notifications, reminders, privacy, created_at, updated_at";

const MOOD_COLUMNS: &str = "id, user_id, mood, note, activities, date, created_at, updated_at";

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map an insert failure, turning unique-key violations into `Constraint`.
fn insert_error(op: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        let target = if msg.contains("users.email") {
            "email"
        } else if msg.contains("users.idempotency_key") {
            "idempotency_key"
        } else {
            "unique key"
        };
        DatabaseError::Constraint(format!("{op}: duplicate {target}"))
    } else {
        DatabaseError::Query(format!("{op}: {e}"))
    }
}

/// Convert `Option<String>` to libsql Value.
fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::Query(format!("{field} parse: {e}")))
}

fn parse_string_list(raw: Option<String>) -> Vec<String> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn row_to_user(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    let id_str: String = row.get(0).map_err(|e| DatabaseError::Query(format!("user.id: {e}")))?;
    let id = parse_uuid(&id_str, "user.id")?;
    let first_name: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("user.first_name: {e}")))?;
    let last_name: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("user.last_name: {e}")))?;
    let email: String = row.get(3).map_err(|e| DatabaseError::Query(format!("user.email: {e}")))?;

    let birth_date = row
        .get::<String>(4)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| parse_datetime(&s));

    let goals = parse_string_list(row.get(5).ok());

    let experience = row
        .get::<String>(6)
        .ok()
        .and_then(|s| s.parse().ok());

    let notifications: i64 = row.get(7).unwrap_or(1);
    let reminders: i64 = row.get(8).unwrap_or(1);
    let privacy = row
        .get::<String>(9)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    let created_str: String = row.get(10).unwrap_or_default();
    let updated_str: String = row.get(11).unwrap_or_default();

    Ok(UserProfile {
        id,
        first_name,
        last_name,
        email,
        birth_date,
        goals,
        experience,
        notifications: notifications != 0,
        reminders: reminders != 0,
        privacy,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_mood(row: &libsql::Row) -> Result<MoodEntry, DatabaseError> {
    let id_str: String = row.get(0).map_err(|e| DatabaseError::Query(format!("mood.id: {e}")))?;
    let user_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("mood.user_id: {e}")))?;
    let mood: i64 = row.get(2).map_err(|e| DatabaseError::Query(format!("mood.mood: {e}")))?;
    let note: Option<String> = row.get::<String>(3).ok().filter(|s| !s.is_empty());
    let activities = parse_string_list(row.get(4).ok());
    let date_str: String = row.get(5).map_err(|e| DatabaseError::Query(format!("mood.date: {e}")))?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("mood.date parse: {e}")))?;
    let created_str: String = row.get(6).unwrap_or_default();
    let updated_str: String = row.get(7).unwrap_or_default();

    Ok(MoodEntry {
        id: parse_uuid(&id_str, "mood.id")?,
        user_id: parse_uuid(&user_str, "mood.user_id")?,
        mood: u8::try_from(mood)
            .map_err(|e| DatabaseError::Query(format!("mood.mood range: {e}")))?,
        note,
        activities,
        date,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user: &NewUser) -> Result<UserProfile, DatabaseError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let goals = serde_json::to_string(&user.goals)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let birth_date = user.birth_date.map(|d| d.to_rfc3339());
        let experience = user.experience.map(|e| e.as_str().to_string());

        self.conn()
            .execute(
                "INSERT INTO users (id, first_name, last_name, email, password, birth_date, goals, \
                 experience, notifications, reminders, privacy, idempotency_key, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                params![
                    id.to_string(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    user.email.as_str(),
                    user.password.as_str(),
                    opt_text(birth_date),
                    goals,
                    opt_text(experience),
                    i64::from(user.preferences.notifications),
                    i64::from(user.preferences.reminders),
                    user.preferences.privacy.to_string(),
                    opt_text(user.idempotency_key.clone()),
                    now
                ],
            )
            .await
            .map_err(|e| insert_error("create_user", e))?;

        debug!(user_id = %id, "User created");
        self.get_user(id).await?.ok_or(DatabaseError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>, DatabaseError> {
        self.user_where("id", id.to_string(), "get_user").await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, DatabaseError> {
        self.user_where("email", email.to_string(), "get_user_by_email")
            .await
    }

    async fn get_user_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<UserProfile>, DatabaseError> {
        self.user_where("idempotency_key", key.to_string(), "get_user_by_idempotency_key")
            .await
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(&self, user_id: Uuid) -> Result<String, DatabaseError> {
        let token = Uuid::new_v4().simple().to_string();
        self.conn()
            .execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token.as_str(), user_id.to_string(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| insert_error("create_session", e))?;
        Ok(token)
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<Uuid>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT user_id FROM sessions WHERE token = ?1", params![token])
            .await
            .map_err(|e| DatabaseError::Query(format!("user_for_token: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("session.user_id: {e}")))?;
                Ok(Some(parse_uuid(&raw, "session.user_id")?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("user_for_token row: {e}"))),
        }
    }

    // ── Moods ───────────────────────────────────────────────────────

    async fn upsert_mood(&self, entry: &NewMoodEntry) -> Result<MoodEntry, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let activities = serde_json::to_string(&entry.activities)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let date = entry.date.format("%Y-%m-%d").to_string();

        self.conn()
            .execute(
                "INSERT INTO moods (id, user_id, mood, note, activities, date, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
                 ON CONFLICT(user_id, date) DO UPDATE SET \
                 mood = excluded.mood, note = excluded.note, \
                 activities = excluded.activities, updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    entry.user_id.to_string(),
                    i64::from(entry.mood),
                    opt_text(entry.note.clone()),
                    activities,
                    date.as_str(),
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_mood: {e}")))?;

        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MOOD_COLUMNS} FROM moods WHERE user_id = ?1 AND date = ?2"),
                params![entry.user_id.to_string(), date.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_mood select: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_mood(&row),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "mood".into(),
                id: format!("{}/{date}", entry.user_id),
            }),
            Err(e) => Err(DatabaseError::Query(format!("upsert_mood row: {e}"))),
        }
    }

    async fn list_moods(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MoodEntry>, DatabaseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MOOD_COLUMNS} FROM moods WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2"
                ),
                params![user_id.to_string(), limit],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_moods: {e}")))?;

        let mut entries = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => entries.push(row_to_mood(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_moods row: {e}"))),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{Experience, Preferences, Privacy};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn new_user(email: &str, key: Option<&str>) -> NewUser {
        NewUser {
            first_name: "Ava".into(),
            last_name: "Lee".into(),
            email: email.into(),
            password: "hunter22".into(),
            birth_date: Some(
                DateTime::parse_from_rfc3339("1994-03-09T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
            goals: vec!["anxiety".into(), "sleep".into()],
            experience: Some(Experience::Some),
            preferences: Preferences {
                notifications: false,
                reminders: true,
                privacy: Privacy::Private,
            },
            idempotency_key: key.map(String::from),
        }
    }

    fn mood(user_id: Uuid, score: u8, day: u32) -> NewMoodEntry {
        NewMoodEntry {
            user_id,
            mood: score,
            note: None,
            activities: vec!["walk".into()],
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_and_get_user() {
        let db = test_db().await;
        let created = db.create_user(&new_user("ava@example.com", None)).await.unwrap();

        assert_eq!(created.first_name, "Ava");
        assert_eq!(created.goals, vec!["anxiety", "sleep"]);
        assert_eq!(created.experience, Some(Experience::Some));
        assert!(!created.notifications);
        assert_eq!(created.privacy, Privacy::Private);
        assert_eq!(
            created.birth_date.unwrap().to_rfc3339(),
            "1994-03-09T00:00:00+00:00"
        );

        let by_id = db.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
        let by_email = db.get_user_by_email("ava@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_constraint() {
        let db = test_db().await;
        db.create_user(&new_user("ava@example.com", None)).await.unwrap();
        let err = db
            .create_user(&new_user("ava@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(ref m) if m.contains("email")));
    }

    #[tokio::test]
    async fn idempotency_key_lookup() {
        let db = test_db().await;
        let created = db
            .create_user(&new_user("ava@example.com", Some("key-1")))
            .await
            .unwrap();
        let found = db.get_user_by_idempotency_key("key-1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(db.get_user_by_idempotency_key("key-2").await.unwrap().is_none());

        let err = db
            .create_user(&new_user("other@example.com", Some("key-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let db = test_db().await;
        assert!(db.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_tokens_resolve() {
        let db = test_db().await;
        let user = db.create_user(&new_user("ava@example.com", None)).await.unwrap();
        let token = db.create_session(user.id).await.unwrap();

        assert_eq!(db.user_for_token(&token).await.unwrap(), Some(user.id));
        assert_eq!(db.user_for_token("bogus").await.unwrap(), None);
    }

    #[tokio::test]
    async fn same_day_mood_is_replaced() {
        let db = test_db().await;
        let user = db.create_user(&new_user("ava@example.com", None)).await.unwrap();

        let first = db.upsert_mood(&mood(user.id, 2, 1)).await.unwrap();
        let mut again = mood(user.id, 5, 1);
        again.note = Some("better".into());
        let second = db.upsert_mood(&again).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.mood, 5);
        assert_eq!(second.note.as_deref(), Some("better"));

        let all = db.list_moods(user.id, 30).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn moods_list_newest_first_with_limit() {
        let db = test_db().await;
        let user = db.create_user(&new_user("ava@example.com", None)).await.unwrap();
        for day in [3, 1, 2] {
            db.upsert_mood(&mood(user.id, 3, day)).await.unwrap();
        }

        let days: Vec<u32> = db
            .list_moods(user.id, 30)
            .await
            .unwrap()
            .iter()
            .map(|m| chrono::Datelike::day(&m.date))
            .collect();
        assert_eq!(days, vec![3, 2, 1]);

        assert_eq!(db.list_moods(user.id, 2).await.unwrap().len(), 2);
        assert!(db.list_moods(Uuid::new_v4(), 30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_mood_row_fails_the_listing() {
        let db = test_db().await;
        let user = db.create_user(&new_user("ava@example.com", None)).await.unwrap();
        db.upsert_mood(&mood(user.id, 3, 1)).await.unwrap();
        db.conn()
            .execute(
                "INSERT INTO moods (id, user_id, mood, activities, date, created_at, updated_at) \
                 VALUES (?1, ?2, 4, '[]', 'not-a-date', '', '')",
                params![Uuid::new_v4().to_string(), user.id.to_string()],
            )
            .await
            .unwrap();

        let err = db.list_moods(user.id, 30).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(ref m) if m.contains("mood.date")));
    }
}
