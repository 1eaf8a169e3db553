use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest and highest mood score on the five-point scale.
pub const MOOD_MIN: i64 = 1;
pub const MOOD_MAX: i64 = 5;

/// Default page size for mood listings.
pub const DEFAULT_LIST_LIMIT: usize = 30;

/// Body of `POST /api/mood`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRequest {
    pub mood: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    pub date: Option<String>,
}

impl MoodRequest {
    /// Check the body and resolve it to a storable entry for `user_id`.
    pub fn into_new_entry(self, user_id: Uuid) -> Result<NewMoodEntry, String> {
        let (Some(mood), Some(date)) = (self.mood, self.date.as_deref()) else {
            return Err("Mood and date are required".into());
        };
        if !(MOOD_MIN..=MOOD_MAX).contains(&mood) {
            return Err(format!("Mood must be between {MOOD_MIN} and {MOOD_MAX}"));
        }
        let instant = DateTime::parse_from_rfc3339(date)
            .map_err(|_| "Date must be an RFC 3339 timestamp".to_string())?
            .with_timezone(&Utc);

        Ok(NewMoodEntry {
            user_id,
            mood: mood as u8,
            note: self.note.filter(|n| !n.trim().is_empty()),
            activities: self.activities,
            date: instant.date_naive(),
        })
    }
}

/// A validated mood entry, keyed by user and UTC calendar day.
#[derive(Debug, Clone)]
pub struct NewMoodEntry {
    pub user_id: Uuid,
    pub mood: u8,
    pub note: Option<String>,
    pub activities: Vec<String>,
    pub date: NaiveDate,
}

/// A stored mood entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub activities: Vec<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query string of `GET /api/mood`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoodListQuery {
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mood: Option<i64>, date: Option<&str>) -> MoodRequest {
        MoodRequest {
            mood,
            note: None,
            activities: vec![],
            date: date.map(String::from),
        }
    }

    #[test]
    fn date_resolves_to_utc_day() {
        let entry = request(Some(4), Some("2024-05-01T23:30:00-02:00"))
            .into_new_entry(Uuid::nil())
            .unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(entry.mood, 4);
    }

    #[test]
    fn out_of_range_mood_rejected() {
        for mood in [0, 6, -1] {
            let err = request(Some(mood), Some("2024-05-01T10:00:00Z"))
                .into_new_entry(Uuid::nil())
                .unwrap_err();
            assert!(err.contains("between 1 and 5"));
        }
    }

    #[test]
    fn missing_fields_rejected() {
        assert!(request(None, Some("2024-05-01T10:00:00Z")).into_new_entry(Uuid::nil()).is_err());
        assert!(request(Some(3), None).into_new_entry(Uuid::nil()).is_err());
        assert!(request(Some(3), Some("yesterday")).into_new_entry(Uuid::nil()).is_err());
    }

    #[test]
    fn blank_note_dropped() {
        let mut req = request(Some(2), Some("2024-05-01T10:00:00Z"));
        req.note = Some("   ".into());
        assert_eq!(req.into_new_entry(Uuid::nil()).unwrap().note, None);
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = MoodEntry {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            mood: 3,
            note: None,
            activities: vec!["walk".into()],
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["userId"], Uuid::nil().to_string());
        assert_eq!(v["date"], "2024-05-01");
        assert!(v.get("note").is_none());
    }
}
