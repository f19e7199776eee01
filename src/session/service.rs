use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    errors::{SessionError, StoreError},
    models::SessionModel,
    repository::SessionRepository,
    token::TokenKeys,
    types::{AccessClaims, AccessDetails, RefreshClaims, TokenPair},
};

/// Token lifecycle engine: mints, verifies, rotates and revokes token pairs.
///
/// Access tokens are trusted statelessly until they expire; only refresh
/// tokens are checked against the session store. Logging out therefore
/// does not cut short an access token that is already in circulation.
pub struct SessionService {
    keys: Arc<TokenKeys>,
    repository: Arc<dyn SessionRepository + Send + Sync>,
    store_timeout: Duration,
}

impl SessionService {
    pub fn new(
        keys: Arc<TokenKeys>,
        repository: Arc<dyn SessionRepository + Send + Sync>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            keys,
            repository,
            store_timeout,
        }
    }

    /// Mints a fresh token pair for `user_id`. Touches no state.
    #[instrument(skip(self))]
    pub fn create(&self, user_id: &str) -> Result<TokenPair, SessionError> {
        if user_id.trim().is_empty() {
            return Err(SessionError::InvalidClaims(
                "user id must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let access_id = Uuid::new_v4().to_string();
        let refresh_id = Uuid::new_v4().to_string();
        let access_expires_at = now + self.keys.access_ttl;
        let refresh_expires_at = now + self.keys.refresh_ttl;

        let access_token = self.keys.access.issue(&AccessClaims {
            authorized: true,
            access_id: access_id.clone(),
            user_id: user_id.to_string(),
            exp: access_expires_at.timestamp(),
            iat: now.timestamp(),
        })?;

        let refresh_token = self.keys.refresh.issue(&RefreshClaims {
            refresh_id: refresh_id.clone(),
            user_id: user_id.to_string(),
            exp: refresh_expires_at.timestamp(),
            iat: now.timestamp(),
        })?;

        debug!(
            access_id = %access_id,
            refresh_id = %refresh_id,
            "Minted token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_id,
            refresh_id,
            user_id: user_id.to_string(),
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Records the refresh half of a pair minted by this service.
    ///
    /// The refresh token is re-verified so that only pairs signed with our
    /// own key, and whose identifiers match their signed claims, are stored.
    #[instrument(skip(self, pair), fields(refresh_id = %pair.refresh_id))]
    pub async fn record(&self, pair: &TokenPair) -> Result<(), SessionError> {
        let claims = self.verify_refresh(&pair.refresh_token)?;
        if claims.refresh_id != pair.refresh_id || claims.user_id != pair.user_id {
            warn!("Refusing to record a token pair whose claims do not match");
            return Err(SessionError::InvalidClaims(
                "token pair does not match its signed claims".to_string(),
            ));
        }

        let session = SessionModel::new(
            pair.refresh_id.clone(),
            pair.user_id.clone(),
            pair.refresh_expires_at,
        );
        self.with_store("create_session", self.repository.create_session(&session))
            .await
    }

    /// Mints and records a new session for `user_id`
    #[instrument(skip(self))]
    pub async fn login(&self, user_id: &str) -> Result<TokenPair, SessionError> {
        info!(user_id = %user_id, "Starting session creation");

        let pair = self.create(user_id)?;
        self.record(&pair).await?;

        info!(
            user_id = %user_id,
            access_id = %pair.access_id,
            refresh_id = %pair.refresh_id,
            "Session created"
        );
        Ok(pair)
    }

    /// Exchanges a live refresh token for a new pair, consuming the old one.
    ///
    /// The old record is deleted and the new one inserted in one store
    /// transaction, so the delete still precedes the insert. The new pair is
    /// signed before that transaction on purpose: the rotation needs the new
    /// refresh ID, and a signing failure must not leave the old session
    /// deleted with nothing issued. Signing has no side effects; if the
    /// delete finds nothing, the signed pair is discarded unrecorded and
    /// unreturned and the caller gets `Unauthorized`.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.verify_refresh(refresh_token)?;
        info!(
            user_id = %claims.user_id,
            refresh_id = %claims.refresh_id,
            "Refreshing session"
        );

        let pair = self.create(&claims.user_id)?;
        let session = SessionModel::new(
            pair.refresh_id.clone(),
            pair.user_id.clone(),
            pair.refresh_expires_at,
        );

        // Never retried: a retry after an unknown outcome could double-issue.
        let deleted = self
            .with_store(
                "rotate_session",
                self.repository.rotate_session(&claims.refresh_id, &session),
            )
            .await?;

        if deleted == 0 {
            warn!(
                refresh_id = %claims.refresh_id,
                "Refresh token already consumed or never issued"
            );
            return Err(SessionError::Unauthorized(
                "refresh token is not a live session".to_string(),
            ));
        }

        info!(
            user_id = %pair.user_id,
            old_refresh_id = %claims.refresh_id,
            new_refresh_id = %pair.refresh_id,
            "Session rotated"
        );
        Ok(pair)
    }

    /// Revokes the single session identified by the refresh token
    #[instrument(skip(self, access_token, refresh_token))]
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), SessionError> {
        let details = self.access_details(access_token, refresh_token)?;

        let deleted = self
            .with_store(
                "delete_session",
                self.repository.delete_session(&details.refresh_id),
            )
            .await?;

        if deleted == 0 {
            warn!(
                refresh_id = %details.refresh_id,
                "Logout presented a refresh token with no live session"
            );
            return Err(SessionError::Unauthorized(
                "refresh token is not a live session".to_string(),
            ));
        }

        info!(
            user_id = %details.user_id,
            access_id = %details.access_id,
            refresh_id = %details.refresh_id,
            "Session revoked"
        );
        Ok(())
    }

    /// Revokes every session of the user the tokens belong to.
    /// Returns how many sessions were removed; zero is not an error.
    #[instrument(skip(self, access_token, refresh_token))]
    pub async fn logout_all(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<u64, SessionError> {
        let details = self.access_details(access_token, refresh_token)?;

        let deleted = self
            .with_store(
                "delete_user_sessions",
                self.repository.delete_user_sessions(&details.user_id),
            )
            .await?;

        info!(user_id = %details.user_id, deleted, "All user sessions revoked");
        Ok(deleted)
    }

    /// Stateless access token check: signature, algorithm and expiry only
    #[instrument(skip(self, access_token))]
    pub fn validate(&self, access_token: &str) -> Result<AccessClaims, SessionError> {
        let claims: AccessClaims = self.keys.access.verify(access_token).map_err(|e| {
            warn!(error = %e, "Access token rejected");
            SessionError::from(e)
        })?;

        if !claims.authorized || claims.user_id.is_empty() || claims.access_id.is_empty() {
            warn!("Access token carries unusable claims");
            return Err(SessionError::InvalidClaims(
                "access token claims are incomplete".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Verifies an access/refresh pair presented together and returns the
    /// identifiers needed to revoke the session
    #[instrument(skip(self, access_token, refresh_token))]
    pub fn access_details(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<AccessDetails, SessionError> {
        let access = self.validate(access_token)?;
        let refresh = self.verify_refresh(refresh_token)?;

        if access.user_id != refresh.user_id {
            warn!(
                access_user_id = %access.user_id,
                refresh_user_id = %refresh.user_id,
                "Access and refresh tokens belong to different users"
            );
            return Err(SessionError::Unauthorized(
                "tokens do not belong to the same user".to_string(),
            ));
        }

        Ok(AccessDetails {
            access_id: access.access_id,
            user_id: access.user_id,
            refresh_id: refresh.refresh_id,
        })
    }

    /// Removes expired sessions from the store
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, SessionError> {
        let removed = self
            .with_store(
                "cleanup_expired_sessions",
                self.repository.cleanup_expired_sessions(),
            )
            .await?;

        info!(removed_sessions = removed, "Expired sessions cleanup completed");
        Ok(removed)
    }

    fn verify_refresh(&self, refresh_token: &str) -> Result<RefreshClaims, SessionError> {
        let claims: RefreshClaims = self.keys.refresh.verify(refresh_token).map_err(|e| {
            warn!(error = %e, "Refresh token rejected");
            SessionError::from(e)
        })?;

        if claims.user_id.is_empty() || Uuid::parse_str(&claims.refresh_id).is_err() {
            warn!("Refresh token carries unusable claims");
            return Err(SessionError::InvalidClaims(
                "refresh token claims are incomplete".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Runs one store call under the configured timeout. A timed-out future
    /// is dropped, which rolls back any open transaction.
    async fn with_store<T, F>(&self, operation: &'static str, call: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation = %operation, error = %e, "Session store call failed");
                Err(SessionError::from(e))
            }
            Err(_) => {
                error!(
                    operation = %operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Session store call timed out"
                );
                Err(SessionError::StoreUnavailable(format!(
                    "{} timed out",
                    operation
                )))
            }
        }
    }
}
