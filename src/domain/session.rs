use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Hours a chat session stays usable after it was created.
pub const SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub business_name: Option<String>,
}

impl Session {
    /// Starts a brand-new session with a random opaque id.
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: now,
            business_name: None,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_session_valid(self.created_at, now)
    }
}

pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// A session is valid while strictly less than [`session_ttl`] has elapsed.
pub fn is_session_valid(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at < session_ttl()
}
