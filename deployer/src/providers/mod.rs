//! Storage providers: the closed set of publish targets

pub mod local;
pub mod netlify;
pub mod s3;
pub mod sigv4;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::SitecastError;
use crate::models::campaign::Destination;
use crate::models::credential::{OpenedCredential, Platform};

use self::local::LocalProvider;
use self::netlify::NetlifyProvider;
use self::s3::S3Provider;

/// What to publish and where
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub platform: Platform,
    pub slug: &'a str,
    /// Final document, header snippet already injected
    pub body: &'a str,
    pub destination: &'a Destination,
    /// Known managed-hosting site from an earlier publish
    pub site_id: Option<&'a str>,
}

/// What to remove
#[derive(Debug, Clone, Copy)]
pub struct RemoveRequest<'a> {
    pub platform: Platform,
    pub slug: &'a str,
    pub destination: &'a Destination,
    pub site_id: Option<&'a str>,
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub url: String,
    pub site_id: Option<String>,
}

/// Common provider contract.
///
/// Providers never touch deployment records; the caller applies the outcome.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn publish(
        &self,
        request: PublishRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<PublishOutcome, SitecastError>;

    async fn remove(
        &self,
        request: RemoveRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<(), SitecastError>;

    /// Buckets, sites or domains reachable with the credential
    async fn list_buckets(
        &self,
        credential: Option<&OpenedCredential>,
    ) -> Result<Vec<String>, SitecastError>;

    /// Folder-like prefixes inside a bucket
    async fn list_prefixes(
        &self,
        credential: Option<&OpenedCredential>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SitecastError>;
}

/// Credential that must be present for credentialed platforms
pub(crate) fn require_credential(
    platform: Platform,
    credential: Option<&OpenedCredential>,
) -> Result<&OpenedCredential, SitecastError> {
    credential.ok_or_else(|| {
        SitecastError::CredentialError(format!("{} requires a credential", platform))
    })
}

/// Provider options
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Netlify API base URL
    pub netlify_api_url: String,

    /// Root directory for custom-domain hosting
    pub local_base_path: PathBuf,

    /// Timeout for storage backend calls
    pub publish_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            netlify_api_url: netlify::DEFAULT_API_URL.to_string(),
            local_base_path: PathBuf::from("/var/www/sitecast"),
            publish_timeout: Duration::from_secs(60),
        }
    }
}

/// The closed set of providers
pub enum Provider {
    S3(S3Provider),
    Netlify(NetlifyProvider),
    Local(LocalProvider),
}

#[async_trait]
impl StorageProvider for Provider {
    async fn publish(
        &self,
        request: PublishRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<PublishOutcome, SitecastError> {
        match self {
            Provider::S3(p) => p.publish(request, credential).await,
            Provider::Netlify(p) => p.publish(request, credential).await,
            Provider::Local(p) => p.publish(request, credential).await,
        }
    }

    async fn remove(
        &self,
        request: RemoveRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<(), SitecastError> {
        match self {
            Provider::S3(p) => p.remove(request, credential).await,
            Provider::Netlify(p) => p.remove(request, credential).await,
            Provider::Local(p) => p.remove(request, credential).await,
        }
    }

    async fn list_buckets(
        &self,
        credential: Option<&OpenedCredential>,
    ) -> Result<Vec<String>, SitecastError> {
        match self {
            Provider::S3(p) => p.list_buckets(credential).await,
            Provider::Netlify(p) => p.list_buckets(credential).await,
            Provider::Local(p) => p.list_buckets(credential).await,
        }
    }

    async fn list_prefixes(
        &self,
        credential: Option<&OpenedCredential>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SitecastError> {
        match self {
            Provider::S3(p) => p.list_prefixes(credential, bucket, prefix).await,
            Provider::Netlify(p) => p.list_prefixes(credential, bucket, prefix).await,
            Provider::Local(p) => p.list_prefixes(credential, bucket, prefix).await,
        }
    }
}

/// Selects the provider for a platform tag
pub struct ProviderFactory {
    s3: Provider,
    netlify: Provider,
    local: Provider,
}

impl ProviderFactory {
    pub fn new(options: &ProviderOptions) -> Result<Self, SitecastError> {
        Ok(Self {
            s3: Provider::S3(S3Provider::new(options.publish_timeout)?),
            netlify: Provider::Netlify(NetlifyProvider::new(
                &options.netlify_api_url,
                options.publish_timeout,
            )?),
            local: Provider::Local(LocalProvider::new(options.local_base_path.clone())),
        })
    }

    pub fn for_platform(&self, platform: Platform) -> &Provider {
        match platform {
            Platform::AwsS3
            | Platform::DigitalOcean
            | Platform::Backblaze
            | Platform::CloudflareR2 => &self.s3,
            Platform::Netlify => &self.netlify,
            Platform::CustomDomain => &self.local,
        }
    }
}
