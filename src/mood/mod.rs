//! Mood logging: one entry per user per UTC day, behind a session token.

pub mod model;
pub mod routes;

pub use model::{MoodEntry, MoodRequest, NewMoodEntry};
pub use routes::{MoodRouteState, mood_routes};
