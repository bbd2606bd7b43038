//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side record of an authenticated browser
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Random token, also the primary key
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for `user_id` that lives for `ttl`.
    ///
    /// Returns `None` when the expiry time is out of range.
    pub fn start(user_id: i64, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        Some(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now.checked_add_signed(ttl)?,
            created_at: now,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_generates_unique_tokens() {
        let a = Session::start(1, Duration::hours(1)).unwrap();
        let b = Session::start(1, Duration::hours(1)).unwrap();
        assert_ne!(a.id, b.id);
        assert!(!a.is_expired());
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let session = Session::start(1, Duration::hours(-1)).unwrap();
        assert!(session.is_expired());
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        assert!(Session::start(1, Duration::hours(3_000_000_000)).is_none());
    }
}
