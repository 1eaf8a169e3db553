//! Onboarding data models: the client draft, its wire form, and the
//! server-side user profile.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Goal tags offered on the goals step, as `(id, label)`.
pub const GOAL_CATALOG: &[(&str, &str)] = &[
    ("anxiety", "Manage Anxiety"),
    ("depression", "Combat Depression"),
    ("stress", "Reduce Stress"),
    ("sleep", "Improve Sleep"),
    ("relationships", "Better Relationships"),
    ("self-care", "Practice Self-Care"),
    ("confidence", "Build Confidence"),
    ("mindfulness", "Increase Mindfulness"),
];

/// Prior experience with mental health tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    Beginner,
    Some,
    Experienced,
}

impl Experience {
    pub const ALL: [Experience; 3] = [Self::Beginner, Self::Some, Self::Experienced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Some => "some",
            Self::Experienced => "experienced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "New to mental health tools",
            Self::Some => "Some experience with apps/therapy",
            Self::Experienced => "Very experienced",
        }
    }
}

impl std::fmt::Display for Experience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Experience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "some" => Ok(Self::Some),
            "experienced" => Ok(Self::Experienced),
            other => Err(format!("unknown experience level '{other}'")),
        }
    }
}

/// Who can see the user's activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    Public,
    Friends,
    Private,
}

impl Default for Privacy {
    fn default() -> Self {
        Self::Friends
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Friends => write!(f, "friends"),
            Self::Private => write!(f, "private"),
        }
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown privacy setting '{other}'")),
        }
    }
}

/// A single preference value, used to build a new `Preferences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceField {
    Notifications(bool),
    Reminders(bool),
    Privacy(Privacy),
}

/// Notification and privacy preferences.
///
/// Immutable value: changes go through [`Preferences::with_field`], which
/// copies every sibling field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default = "default_true")]
    pub reminders: bool,
    #[serde(default)]
    pub privacy: Privacy,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            reminders: true,
            privacy: Privacy::default(),
        }
    }
}

impl Preferences {
    pub fn with_field(self, field: PreferenceField) -> Self {
        match field {
            PreferenceField::Notifications(v) => Self {
                notifications: v,
                ..self
            },
            PreferenceField::Reminders(v) => Self {
                reminders: v,
                ..self
            },
            PreferenceField::Privacy(v) => Self { privacy: v, ..self },
        }
    }

    /// Apply every field set in `patch`, leaving the rest as they are.
    pub fn merged(self, patch: &PreferencesPatch) -> Self {
        patch.fields().into_iter().fold(self, Preferences::with_field)
    }
}

/// Partial preferences from one input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub notifications: Option<bool>,
    pub reminders: Option<bool>,
    pub privacy: Option<Privacy>,
}

impl PreferencesPatch {
    fn fields(&self) -> Vec<PreferenceField> {
        let mut fields = Vec::new();
        if let Some(v) = self.notifications {
            fields.push(PreferenceField::Notifications(v));
        }
        if let Some(v) = self.reminders {
            fields.push(PreferenceField::Reminders(v));
        }
        if let Some(v) = self.privacy {
            fields.push(PreferenceField::Privacy(v));
        }
        fields
    }
}

/// Set of goal-tag ids.
///
/// Insertion order is kept for display only; equality ignores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct GoalSet(Vec<String>);

impl GoalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, goal: &str) -> bool {
        self.0.iter().any(|g| g == goal)
    }

    /// Add a goal. Returns false if it was already present.
    pub fn insert(&mut self, goal: impl Into<String>) -> bool {
        let goal = goal.into();
        if self.contains(&goal) {
            return false;
        }
        self.0.push(goal);
        true
    }

    /// Remove a goal. Returns false if it was absent.
    pub fn remove(&mut self, goal: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|g| g != goal);
        self.0.len() != before
    }

    /// Add if absent, remove if present. Returns the new membership.
    pub fn toggle(&mut self, goal: &str) -> bool {
        if self.remove(goal) {
            false
        } else {
            self.0.push(goal.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl PartialEq for GoalSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|g| other.contains(g))
    }
}

impl Eq for GoalSet {}

impl From<Vec<String>> for GoalSet {
    fn from(goals: Vec<String>) -> Self {
        let mut set = GoalSet::new();
        for goal in goals {
            set.insert(goal);
        }
        set
    }
}

impl From<GoalSet> for Vec<String> {
    fn from(set: GoalSet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for GoalSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = GoalSet::new();
        for goal in iter {
            set.insert(goal);
        }
        set
    }
}

/// In-progress onboarding form, held by the client until submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub birth_date: Option<NaiveDate>,
    pub goals: GoalSet,
    pub experience: Option<Experience>,
    pub preferences: Preferences,
}

/// A partial draft produced by one input event. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub goals: Option<GoalSet>,
    pub experience: Option<Experience>,
    pub preferences: Option<PreferencesPatch>,
}

impl DraftUpdate {
    pub fn first_name(value: impl Into<String>) -> Self {
        Self {
            first_name: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn last_name(value: impl Into<String>) -> Self {
        Self {
            last_name: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self {
            email: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn password(value: impl Into<String>) -> Self {
        Self {
            password: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn birth_date(value: NaiveDate) -> Self {
        Self {
            birth_date: Some(value),
            ..Default::default()
        }
    }

    pub fn experience(value: Experience) -> Self {
        Self {
            experience: Some(value),
            ..Default::default()
        }
    }

    pub fn preference(field: PreferenceField) -> Self {
        let mut patch = PreferencesPatch::default();
        match field {
            PreferenceField::Notifications(v) => patch.notifications = Some(v),
            PreferenceField::Reminders(v) => patch.reminders = Some(v),
            PreferenceField::Privacy(v) => patch.privacy = Some(v),
        }
        Self {
            preferences: Some(patch),
            ..Default::default()
        }
    }
}

/// Body of `POST /api/onboarding`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, with = "birth_date_wire")]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default, with = "experience_wire")]
    pub experience: Option<Experience>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl From<&Draft> for OnboardingRequest {
    fn from(draft: &Draft) -> Self {
        Self {
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            password: draft.password.clone(),
            birth_date: draft.birth_date.map(utc_midnight),
            goals: draft.goals.clone().into(),
            experience: draft.experience,
            preferences: draft.preferences,
        }
    }
}

/// The instant at UTC midnight of a calendar date.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `birthDate` on the wire: an RFC 3339 instant at UTC midnight.
///
/// Accepts a bare `YYYY-MM-DD` or any RFC 3339 instant on input; both are
/// normalized to UTC midnight of their UTC calendar day. `""` means unset.
pub mod birth_date_wire {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(utc_midnight(date));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| utc_midnight(dt.with_timezone(&Utc).date_naive()))
            .map_err(|e| format!("invalid birthDate '{s}': {e}"))
    }
}

/// `experience` on the wire: a level name, with `""` or `null` for unset.
pub mod experience_wire {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Experience>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(exp) => serializer.serialize_str(exp.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Experience>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Minimal persisted-user record cached client-side after onboarding.
///
/// Fields the server echoes beyond the named ones are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Success body of `POST /api/onboarding`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingResponse {
    #[serde(default)]
    pub message: String,
    pub user: SessionIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl OnboardingResponse {
    /// The identity to cache, carrying the session token if one was issued.
    pub fn into_identity(self) -> SessionIdentity {
        let mut identity = self.user;
        if identity.token.is_none() {
            identity.token = self.token;
        }
        identity
    }
}

/// A validated onboarding request, ready to persist.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub birth_date: Option<DateTime<Utc>>,
    pub goals: Vec<String>,
    pub experience: Option<Experience>,
    pub preferences: Preferences,
    pub idempotency_key: Option<String>,
}

/// Server-owned user profile. The password is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, with = "birth_date_wire")]
    pub birth_date: Option<DateTime<Utc>>,
    pub goals: Vec<String>,
    #[serde(default, with = "experience_wire")]
    pub experience: Option<Experience>,
    pub notifications: bool,
    pub reminders: bool,
    pub privacy: Privacy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
