use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for the refresh_sessions table.
/// One row per live refresh token; rows are never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SessionModel {
    pub refresh_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionModel {
    pub fn new(refresh_id: String, user_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            refresh_id,
            user_id,
            created_at: Utc::now(),
            expires_at,
        }
    }

    /// Checks if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Remaining lifetime, clamped at zero
    pub fn remaining_ttl(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_model() {
        let session = SessionModel::new(
            "refresh-id".to_string(),
            "u1".to_string(),
            Utc::now() + Duration::days(7),
        );

        assert_eq!(session.user_id, "u1");
        assert!(session.expires_at > session.created_at);
        assert!(!session.is_expired());
        assert!(session.remaining_ttl() > Duration::days(6));
    }

    #[test]
    fn test_expired_session_has_no_remaining_ttl() {
        let session = SessionModel::new(
            "refresh-id".to_string(),
            "u1".to_string(),
            Utc::now() - Duration::hours(1),
        );

        assert!(session.is_expired());
        assert_eq!(session.remaining_ttl(), Duration::zero());
    }
}
