use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use super::errors::TokenError;

/// Signs and verifies tokens with one secret bound to one algorithm
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        // Only the configured algorithm is accepted on decode, which rejects
        // tokens whose header names anything else.
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Encodes the claims (including their `exp`) into a signed token
    #[instrument(skip(self, claims))]
    pub fn issue<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key).map_err(|e| {
            debug!(error = %e, "Failed to encode token");
            TokenError::Encoding(e.to_string())
        })
    }

    /// Checks signature, algorithm and expiry, then returns the typed claims
    #[instrument(skip(self, token))]
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<C>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, algorithm = ?self.algorithm, "Failed to verify token");
                TokenError::from(e)
            })
    }
}

/// Process-wide signing configuration. Built once at startup and never mutated.
#[derive(Clone)]
pub struct TokenKeys {
    pub access: TokenSigner,
    pub refresh: TokenSigner,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenKeys {
    pub const ACCESS_ALGORITHM: Algorithm = Algorithm::HS512;
    pub const REFRESH_ALGORITHM: Algorithm = Algorithm::HS256;

    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: TokenSigner::new(access_secret, Self::ACCESS_ALGORITHM),
            refresh: TokenSigner::new(refresh_secret, Self::REFRESH_ALGORITHM),
            access_ttl,
            refresh_ttl,
        }
    }
}
