//! Session token management

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::SitecastError;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// A verified session token
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Raw token string
    pub raw: String,

    /// Decoded claims
    pub claims: SessionClaims,
}

impl SessionToken {
    /// Get the user ID
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.claims.exp < Utc::now().timestamp()
    }

    /// Get expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// HS256 keys for issuing and verifying session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &SecretString) -> Self {
        let raw = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|c| c.to_string()).collect();

        Self {
            encoding: EncodingKey::from_secret(raw),
            decoding: DecodingKey::from_secret(raw),
            validation,
        }
    }

    /// Issue a token for `user_id` valid for `ttl`
    pub fn issue(&self, user_id: &str, ttl: Duration) -> Result<String, SitecastError> {
        if user_id.trim().is_empty() {
            return Err(SitecastError::ValidationError(
                "token subject is required".to_string(),
            ));
        }
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SitecastError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry
    pub fn verify(&self, raw: &str) -> Result<SessionToken, SitecastError> {
        let data = decode::<SessionClaims>(raw, &self.decoding, &self.validation)
            .map_err(|e| SitecastError::Unauthenticated(format!("invalid token: {}", e)))?;

        if data.claims.sub.trim().is_empty() {
            return Err(SitecastError::Unauthenticated(
                "token has no subject".to_string(),
            ));
        }

        Ok(SessionToken {
            raw: raw.to_string(),
            claims: data.claims,
        })
    }
}
