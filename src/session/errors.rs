use thiserror::Error;

/// Failures produced while signing or verifying a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // A token signed with any algorithm other than the key's own is
            // treated exactly like a forged signature.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::MalformedToken,
        }
    }
}

/// Failures reported by the session store collaborator
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Session already exists: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Outcome taxonomy of the token service
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The presented credential is not a live, valid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A verified token carried claims that cannot be used
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// A fresh token pair could not be signed
    #[error("Failed to sign token pair: {0}")]
    Signing(String),

    /// The session store timed out or failed
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => SessionError::Signing(msg),
            // Verification detail is logged by the caller, never returned.
            _ => SessionError::Unauthorized("invalid or expired token".to_string()),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::StoreUnavailable(err.to_string())
    }
}
