use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::errors::StoreError;
use super::models::SessionModel;

/// Trait for refresh session persistence.
///
/// Every method is a single atomic unit: callers never observe a
/// half-applied mutation.
#[async_trait]
pub trait SessionRepository {
    /// Records a live refresh session. Putting the same record again is a
    /// no-op; a different record under an existing refresh ID is `Duplicate`.
    async fn create_session(&self, session: &SessionModel) -> Result<(), StoreError>;

    async fn get_session(&self, refresh_id: &str) -> Result<Option<SessionModel>, StoreError>;

    /// Deletes one session, returning how many rows went away (0 or 1)
    async fn delete_session(&self, refresh_id: &str) -> Result<u64, StoreError>;

    /// Deletes every session owned by `user_id`
    async fn delete_user_sessions(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Deletes `old_refresh_id` and inserts `session` as one unit.
    /// When nothing was deleted nothing is inserted and 0 is returned.
    async fn rotate_session(
        &self,
        old_refresh_id: &str,
        session: &SessionModel,
    ) -> Result<u64, StoreError>;

    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError>;
}

/// In-memory implementation of SessionRepository for development and testing
///
/// All mutations run under a single lock, so a rotation is observed by
/// concurrent callers either entirely or not at all. Data is lost when the
/// application restarts.
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, SessionModel>>,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated sessions
    pub fn with_sessions(sessions: Vec<SessionModel>) -> Self {
        let session_map = sessions
            .into_iter()
            .map(|session| (session.refresh_id.clone(), session))
            .collect();

        Self {
            sessions: Mutex::new(session_map),
        }
    }

    /// Returns the current number of sessions in the repository
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Checks if a session exists by refresh ID
    pub fn has_session(&self, refresh_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(refresh_id)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionModel>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Database("session map lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), StoreError> {
        debug!(refresh_id = %session.refresh_id, user_id = %session.user_id, "Creating session in memory");

        let mut sessions = self.lock()?;
        match sessions.get(&session.refresh_id) {
            Some(existing) if existing == session => {
                debug!(refresh_id = %session.refresh_id, "Session already recorded in memory");
                return Ok(());
            }
            Some(_) => {
                warn!(refresh_id = %session.refresh_id, "Different session already exists in memory");
                return Err(StoreError::Duplicate(session.refresh_id.clone()));
            }
            None => {}
        }
        sessions.insert(session.refresh_id.clone(), session.clone());

        debug!(refresh_id = %session.refresh_id, "Session created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, refresh_id: &str) -> Result<Option<SessionModel>, StoreError> {
        let sessions = self.lock()?;
        Ok(sessions.get(refresh_id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, refresh_id: &str) -> Result<u64, StoreError> {
        debug!(refresh_id = %refresh_id, "Deleting session from memory");

        let mut sessions = self.lock()?;
        let deleted = u64::from(sessions.remove(refresh_id).is_some());

        debug!(refresh_id = %refresh_id, deleted, "Session delete finished in memory");
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn delete_user_sessions(&self, user_id: &str) -> Result<u64, StoreError> {
        debug!(user_id = %user_id, "Deleting all user sessions from memory");

        let mut sessions = self.lock()?;
        let initial_count = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        let deleted = (initial_count - sessions.len()) as u64;

        debug!(user_id = %user_id, deleted, "User sessions deleted from memory");
        Ok(deleted)
    }

    #[instrument(skip(self, session))]
    async fn rotate_session(
        &self,
        old_refresh_id: &str,
        session: &SessionModel,
    ) -> Result<u64, StoreError> {
        debug!(
            old_refresh_id = %old_refresh_id,
            new_refresh_id = %session.refresh_id,
            "Rotating session in memory"
        );

        let mut sessions = self.lock()?;
        if sessions.contains_key(&session.refresh_id) {
            warn!(refresh_id = %session.refresh_id, "Replacement session already exists in memory");
            return Err(StoreError::Duplicate(session.refresh_id.clone()));
        }
        if sessions.remove(old_refresh_id).is_none() {
            debug!(old_refresh_id = %old_refresh_id, "Session to rotate not found in memory");
            return Ok(0);
        }
        sessions.insert(session.refresh_id.clone(), session.clone());

        Ok(1)
    }

    #[instrument(skip(self))]
    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        debug!("Cleaning up expired sessions from memory");

        let mut sessions = self.lock()?;
        let now = Utc::now();
        let initial_count = sessions.len();

        sessions.retain(|_, session| session.expires_at > now);

        let removed_count = initial_count - sessions.len();
        debug!(
            expired_sessions_removed = removed_count,
            "Expired sessions cleaned up from memory"
        );
        Ok(removed_count as u64)
    }
}

/// PostgreSQL implementation of session repository
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the refresh_sessions table and its user index if missing
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS refresh_sessions (
                refresh_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS refresh_sessions_user_id_idx ON refresh_sessions (user_id)",
        )
        .execute(&self.pool)
        .await?;

        debug!("refresh_sessions schema ready");
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), StoreError> {
        debug!(refresh_id = %session.refresh_id, user_id = %session.user_id, "Creating session in database");

        let inserted = sqlx::query(
            "INSERT INTO refresh_sessions (refresh_id, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (refresh_id) DO NOTHING",
        )
        .bind(&session.refresh_id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create session in database");
            StoreError::from(e)
        })?
        .rows_affected();

        if inserted == 0 {
            let existing_owner: Option<String> =
                sqlx::query_scalar("SELECT user_id FROM refresh_sessions WHERE refresh_id = $1")
                    .bind(&session.refresh_id)
                    .fetch_optional(&self.pool)
                    .await?;

            if existing_owner.as_deref() != Some(session.user_id.as_str()) {
                warn!(refresh_id = %session.refresh_id, "Different session already exists in database");
                return Err(StoreError::Duplicate(session.refresh_id.clone()));
            }
            debug!(refresh_id = %session.refresh_id, "Session already recorded in database");
            return Ok(());
        }

        debug!(refresh_id = %session.refresh_id, "Session created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, refresh_id: &str) -> Result<Option<SessionModel>, StoreError> {
        let row = sqlx::query(
            "SELECT refresh_id, user_id, created_at, expires_at FROM refresh_sessions WHERE refresh_id = $1",
        )
        .bind(refresh_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, refresh_id = %refresh_id, "Failed to fetch session from database");
            StoreError::from(e)
        })?;

        Ok(row.map(|row| SessionModel {
            refresh_id: row.get("refresh_id"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, refresh_id: &str) -> Result<u64, StoreError> {
        debug!(refresh_id = %refresh_id, "Deleting session from database");

        let result = sqlx::query("DELETE FROM refresh_sessions WHERE refresh_id = $1")
            .bind(refresh_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, refresh_id = %refresh_id, "Failed to delete session from database");
                StoreError::from(e)
            })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_user_sessions(&self, user_id: &str) -> Result<u64, StoreError> {
        debug!(user_id = %user_id, "Deleting all user sessions from database");

        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to delete user sessions from database");
                StoreError::from(e)
            })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, session))]
    async fn rotate_session(
        &self,
        old_refresh_id: &str,
        session: &SessionModel,
    ) -> Result<u64, StoreError> {
        debug!(
            old_refresh_id = %old_refresh_id,
            new_refresh_id = %session.refresh_id,
            "Rotating session in database"
        );

        let mut tx = self.pool.begin().await?;

        // A concurrent rotation of the same row blocks on the row lock and
        // then sees zero affected rows.
        let deleted = sqlx::query("DELETE FROM refresh_sessions WHERE refresh_id = $1")
            .bind(old_refresh_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            debug!(old_refresh_id = %old_refresh_id, "Session to rotate not found in database");
            tx.rollback().await?;
            return Ok(0);
        }

        sqlx::query(
            "INSERT INTO refresh_sessions (refresh_id, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.refresh_id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert rotated session");
            StoreError::from(e)
        })?;

        tx.commit().await?;

        debug!(new_refresh_id = %session.refresh_id, "Session rotated successfully in database");
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        debug!("Cleaning up expired sessions from database");

        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to cleanup expired sessions");
                StoreError::from(e)
            })?;

        let rows_affected = result.rows_affected();
        debug!(
            expired_sessions_removed = rows_affected,
            "Expired sessions cleaned up"
        );
        Ok(rows_affected)
    }
}
