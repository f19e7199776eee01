use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub authorized: bool,
    #[serde(rename = "access_uuid")]
    pub access_id: String,
    pub user_id: String,
    pub exp: i64, // Expiration timestamp (standard JWT claim)
    pub iat: i64, // Issued at timestamp (standard JWT claim)
}

/// Claims carried by a refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    #[serde(rename = "refresh_uuid")]
    pub refresh_id: String,
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

/// A freshly minted access/refresh pair. Never retained server-side;
/// only `refresh_id` survives inside the session store.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_id: String,
    pub refresh_id: String,
    pub user_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Identifiers recovered from an access token and a refresh token presented together
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDetails {
    pub access_id: String,
    pub user_id: String,
    pub refresh_id: String,
}

/// Request body for the login endpoint
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "id")]
    pub user_id: String,
}

/// Response body for login and refresh
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&TokenPair> for TokenResponse {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        }
    }
}
