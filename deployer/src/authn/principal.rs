//! Authenticated principal and ownership checks

use axum::extract::FromRequestParts;
use http::header::AUTHORIZATION;
use http::request::Parts;

use crate::authn::session_token::SessionKeys;
use crate::errors::SitecastError;

/// The user on whose behalf a request runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Fail unless the principal owns the resource
    pub fn ensure_owner(&self, owner_id: &str, resource: &str) -> Result<(), SitecastError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(SitecastError::AuthorizationError(format!(
                "{} belongs to another user",
                resource
            )))
        }
    }
}

/// Extract the bearer token from an `Authorization` header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// State that can verify session tokens
pub trait HasSessionKeys {
    fn session_keys(&self) -> &SessionKeys;
}

impl<S> FromRequestParts<S> for Principal
where
    S: HasSessionKeys + Send + Sync,
{
    type Rejection = SitecastError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SitecastError::Unauthenticated("missing bearer token".to_string()))?;

        let raw = bearer_token(header).ok_or_else(|| {
            SitecastError::Unauthenticated("malformed authorization header".to_string())
        })?;

        let token = state.session_keys().verify(raw)?;
        Ok(Principal::new(token.user_id()))
    }
}
