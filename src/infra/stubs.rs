//! In-memory adapters for tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::usecases::contracts::{Clock, SessionStore, StoredSession};

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    stored: StoredSession,
}

impl MemorySessionStore {
    pub fn with_session(session_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            stored: StoredSession {
                session_id: Some(session_id.to_owned()),
                created_at: Some(created_at),
                ..StoredSession::default()
            },
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<StoredSession> {
        Ok(self.stored.clone())
    }

    fn save_session(&mut self, session_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        self.stored.session_id = Some(session_id.to_owned());
        self.stored.created_at = Some(created_at);
        Ok(())
    }

    fn save_transcript(&mut self, raw: &str) -> Result<()> {
        self.stored.transcript = Some(raw.to_owned());
        Ok(())
    }

    fn save_business_name(&mut self, business_name: Option<&str>) -> Result<()> {
        self.stored.business_name = business_name.map(str::to_owned);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.stored = StoredSession::default();
        Ok(())
    }
}

/// Clock whose time only moves when a test advances it. Clones share time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock should not be poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock should not be poisoned")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn memory_store_clear_forgets_everything() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("fixture time should be valid");
        let mut store = MemorySessionStore::with_session("s-1", now);
        store.save_transcript("[]").expect("save transcript");

        store.clear().expect("clear");

        assert_eq!(store.load().expect("load"), StoredSession::default());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("fixture time should be valid");
        let clock = ManualClock::at(start);
        let handle = clock.clone();

        handle.advance(Duration::hours(3));

        assert_eq!(clock.now(), start + Duration::hours(3));
    }
}
