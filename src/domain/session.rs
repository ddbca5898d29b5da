use crate::domain::card::CardId;
use crate::domain::machine::MachineId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The bounded window between authentication and logout in which a card may
/// move money. At most one active session exists per card; `SessionManager`
/// enforces that under the card's lock.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Session {
    pub id: SessionId,
    pub card_id: CardId,
    pub machine_id: MachineId,
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn open(card_id: CardId, machine_id: MachineId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            card_id,
            machine_id,
            active: true,
            started_at: now,
            last_seen: now,
            ended_at: None,
        }
    }

    /// Marks the session inactive and stamps the end time. Closing twice
    /// keeps the first end time.
    pub fn close(&mut self, now: DateTime<Utc>) {
        if self.active {
            self.active = false;
            self.ended_at = Some(now);
        }
    }

    pub fn idle_since(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_close_is_idempotent() {
        let mut session = Session::open(CardId(1), MachineId(1));
        let first = Utc::now();
        session.close(first);
        let stamped = session.ended_at;

        session.close(first + Duration::seconds(30));
        assert!(!session.active);
        assert_eq!(session.ended_at, stamped);
    }

    #[test]
    fn test_idle_tracking() {
        let mut session = Session::open(CardId(1), MachineId(1));
        let later = Utc::now() + Duration::seconds(90);
        assert!(session.idle_since(later) >= Duration::seconds(90));

        session.last_seen = later;
        assert!(session.idle_since(later) == Duration::zero());
    }
}
