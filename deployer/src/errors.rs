//! Error types for Sitecast

use http::StatusCode;
use thiserror::Error;

use crate::models::credential::Platform;

/// Main error type for Sitecast
#[derive(Error, Debug)]
pub enum SitecastError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Not authorized: {0}")]
    AuthorizationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("Publish to {platform} failed for '{slug}': {cause}")]
    PublishError {
        platform: Platform,
        slug: String,
        cause: String,
    },

    #[error("Remove from {platform} failed for '{slug}': {cause}")]
    RemoveError {
        platform: Platform,
        slug: String,
        cause: String,
    },

    #[error("Vault error: {0}")]
    VaultError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SitecastError {
    /// Wrap a backend failure during publish
    pub fn publish(platform: Platform, slug: &str, cause: impl ToString) -> Self {
        SitecastError::PublishError {
            platform,
            slug: slug.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Wrap a backend failure during removal
    pub fn remove(platform: Platform, slug: &str, cause: impl ToString) -> Self {
        SitecastError::RemoveError {
            platform,
            slug: slug.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Short machine-readable kind, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            SitecastError::IoError(_) => "io",
            SitecastError::JsonError(_) => "json",
            SitecastError::HttpError(_) => "http",
            SitecastError::ObjectStoreError(_) => "object_store",
            SitecastError::ValidationError(_) => "validation",
            SitecastError::Unauthenticated(_) => "unauthenticated",
            SitecastError::AuthorizationError(_) => "authorization",
            SitecastError::NotFound(_) => "not_found",
            SitecastError::Conflict(_) => "conflict",
            SitecastError::CredentialError(_) => "credential",
            SitecastError::GenerationError(_) => "generation",
            SitecastError::PublishError { .. } => "publish",
            SitecastError::RemoveError { .. } => "remove",
            SitecastError::VaultError(_) => "vault",
            SitecastError::StorageError(_) => "storage",
            SitecastError::QueueError(_) => "queue",
            SitecastError::ConfigError(_) => "config",
            SitecastError::ServerError(_) => "server",
            SitecastError::ShutdownError(_) => "shutdown",
            SitecastError::Internal(_) => "internal",
        }
    }

    /// HTTP status for the API surface
    pub fn status_code(&self) -> StatusCode {
        match self {
            SitecastError::ValidationError(_) | SitecastError::JsonError(_) => {
                StatusCode::BAD_REQUEST
            }
            SitecastError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            SitecastError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            SitecastError::NotFound(_) => StatusCode::NOT_FOUND,
            SitecastError::Conflict(_) => StatusCode::CONFLICT,
            SitecastError::CredentialError(_)
            | SitecastError::GenerationError(_)
            | SitecastError::PublishError { .. }
            | SitecastError::RemoveError { .. }
            | SitecastError::HttpError(_)
            | SitecastError::ObjectStoreError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for SitecastError {
    fn from(err: anyhow::Error) -> Self {
        SitecastError::Internal(err.to_string())
    }
}
