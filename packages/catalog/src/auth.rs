use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Username
    pub uid: i32,     // User ID
    pub role: String, // e.g. "admin"
    pub exp: usize,   // Expiration timestamp
}

/// Identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub role: String,
}

/// Gate in front of every mutating operation.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Principal, AppError>;
}

/// HS256 tokens signed with a shared secret.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token valid for `ttl`. Used by tooling and tests; issuance for
    /// end users lives outside this crate.
    pub fn sign(
        &self,
        user_id: i32,
        username: &str,
        role: &str,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("token expiry out of range".into()))?
            .timestamp();

        let claims = Claims {
            sub: username.to_owned(),
            uid: user_id,
            role: role.to_owned(),
            exp: usize::try_from(expiration).unwrap_or(0),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify and decode a JWT token.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized
            })
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let claims = self.verify(token.trim())?;
        Ok(Principal {
            user_id: claims.uid,
            username: claims.sub,
            role: claims.role,
        })
    }
}
