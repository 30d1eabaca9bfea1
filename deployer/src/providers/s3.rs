//! S3-compatible object storage: AWS S3, DigitalOcean Spaces, Backblaze B2, Cloudflare R2

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::header::{HeaderMap, HeaderValue};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::SitecastError;
use crate::models::credential::{OpenedCredential, Platform};
use crate::providers::sigv4;
use crate::providers::{
    require_credential, PublishOutcome, PublishRequest, RemoveRequest, StorageProvider,
};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// `ListAllMyBucketsResult` body; owner and dates are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketListing {
    #[serde(default)]
    buckets: Buckets,
}

#[derive(Debug, Default, Deserialize)]
struct Buckets {
    #[serde(default, rename = "Bucket")]
    entries: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketEntry {
    name: String,
}

/// Resolved addressing for one S3-compatible variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub platform: Platform,
    pub region: String,
    /// Custom endpoint, `None` for AWS default resolution
    pub endpoint: Option<String>,
    pub account_id: Option<String>,
}

impl S3Target {
    /// Resolve region and endpoint from a credential
    pub fn resolve(credential: &OpenedCredential) -> Result<Self, SitecastError> {
        let platform = credential.platform;
        match platform {
            Platform::AwsS3 => Ok(Self {
                platform,
                region: credential.region()?.to_string(),
                endpoint: None,
                account_id: None,
            }),
            Platform::DigitalOcean => {
                let region = credential.region()?.to_string();
                Ok(Self {
                    platform,
                    endpoint: Some(format!("https://{}.digitaloceanspaces.com", region)),
                    region,
                    account_id: None,
                })
            }
            Platform::Backblaze => {
                let region = credential.region()?.to_string();
                Ok(Self {
                    platform,
                    endpoint: Some(format!("https://s3.{}.backblazeb2.com", region)),
                    region,
                    account_id: None,
                })
            }
            Platform::CloudflareR2 => {
                let account = credential.account_id()?.to_string();
                Ok(Self {
                    platform,
                    region: "auto".to_string(),
                    endpoint: Some(format!("https://{}.r2.cloudflarestorage.com", account)),
                    account_id: Some(account),
                })
            }
            Platform::Netlify | Platform::CustomDomain => Err(SitecastError::CredentialError(
                format!("{} is not an S3-compatible platform", platform),
            )),
        }
    }

    /// Endpoint answering account-level calls such as ListBuckets
    pub fn service_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        }
    }

    /// Public URL of an uploaded object
    pub fn public_url(&self, bucket: &str, key: &str, cdn_url: Option<&str>) -> String {
        match self.platform {
            Platform::DigitalOcean => {
                format!("https://{}.{}.digitaloceanspaces.com/{}", bucket, self.region, key)
            }
            Platform::Backblaze => {
                format!("https://{}.s3.{}.backblazeb2.com/{}", bucket, self.region, key)
            }
            Platform::CloudflareR2 => match cdn_url
                .map(|u| u.trim_end_matches('/'))
                .filter(|u| !u.is_empty())
            {
                Some(cdn) => format!("{}/{}", cdn, key),
                None => {
                    warn!(
                        "No CDN URL configured for R2 bucket '{}', falling back to the internal endpoint URL",
                        bucket
                    );
                    format!(
                        "https://{}.r2.cloudflarestorage.com/{}/{}",
                        self.account_id.as_deref().unwrap_or_default(),
                        bucket,
                        key
                    )
                }
            },
            _ => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
        }
    }
}

/// S3-compatible provider
pub struct S3Provider {
    http: Client,
    timeout: Duration,
}

impl S3Provider {
    pub fn new(timeout: Duration) -> Result<Self, SitecastError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    fn store(
        &self,
        credential: &OpenedCredential,
        target: &S3Target,
        bucket: &str,
    ) -> Result<AmazonS3, SitecastError> {
        let mut headers = HeaderMap::new();
        if target.platform != Platform::CloudflareR2 {
            // R2 rejects canned ACLs
            headers.insert("x-amz-acl", HeaderValue::from_static("public-read"));
        }
        let client_options = ClientOptions::new()
            .with_timeout(self.timeout)
            .with_default_headers(headers);

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&target.region)
            .with_access_key_id(credential.access_key()?)
            .with_secret_access_key(credential.secret_key()?)
            .with_client_options(client_options);

        if let Some(endpoint) = &target.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        Ok(builder.build()?)
    }
}

/// Credential problems stay credential errors, the rest is a backend failure
fn as_backend_error(
    err: SitecastError,
    wrap: impl FnOnce(SitecastError) -> SitecastError,
) -> SitecastError {
    match err {
        SitecastError::CredentialError(_) => err,
        other => wrap(other),
    }
}

fn required_bucket<'a>(
    platform: Platform,
    slug: &str,
    bucket: Option<&'a str>,
) -> Result<&'a str, SitecastError> {
    bucket
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| SitecastError::publish(platform, slug, "no bucket configured"))
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn publish(
        &self,
        request: PublishRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<PublishOutcome, SitecastError> {
        let credential = require_credential(request.platform, credential)?;
        let target = S3Target::resolve(credential)?;
        let bucket = required_bucket(
            request.platform,
            request.slug,
            request.destination.bucket.as_deref(),
        )?;
        let key = request.destination.object_key(request.slug);
        let store = self
            .store(credential, &target, bucket)
            .map_err(|e| as_backend_error(e, |cause| {
                SitecastError::publish(request.platform, request.slug, cause)
            }))?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, HTML_CONTENT_TYPE.into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        debug!("Uploading {} to {} bucket '{}'", key, request.platform, bucket);
        store
            .put_opts(
                &ObjectPath::from(key.as_str()),
                PutPayload::from(Bytes::from(request.body.to_string())),
                options,
            )
            .await
            .map_err(|e| SitecastError::publish(request.platform, request.slug, e))?;

        let url = target.public_url(bucket, &key, credential.cdn_url.as_deref());
        info!("Published '{}' to {}", request.slug, url);
        Ok(PublishOutcome { url, site_id: None })
    }

    async fn remove(
        &self,
        request: RemoveRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<(), SitecastError> {
        let credential = require_credential(request.platform, credential)?;
        let target = S3Target::resolve(credential)?;
        let bucket = request
            .destination
            .bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                SitecastError::remove(request.platform, request.slug, "no bucket configured")
            })?;
        let key = request.destination.object_key(request.slug);
        let store = self
            .store(credential, &target, bucket)
            .map_err(|e| as_backend_error(e, |cause| {
                SitecastError::remove(request.platform, request.slug, cause)
            }))?;

        match store.delete(&ObjectPath::from(key.as_str())).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(SitecastError::remove(request.platform, request.slug, e)),
        }
    }

    async fn list_buckets(
        &self,
        credential: Option<&OpenedCredential>,
    ) -> Result<Vec<String>, SitecastError> {
        let credential = require_credential(Platform::AwsS3, credential)?;
        let target = S3Target::resolve(credential)?;
        let endpoint = target.service_endpoint();
        let host = url::Url::parse(&endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| SitecastError::ConfigError(format!("invalid endpoint: {}", endpoint)))?;

        let signed = sigv4::sign_get(
            &host,
            "/",
            &target.region,
            credential.access_key()?,
            credential.secret_key()?,
            Utc::now(),
        );

        let response = self
            .http
            .get(format!("{}/", endpoint))
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .header(http::header::AUTHORIZATION, &signed.authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("ListBuckets on {} failed: {} - {}", target.platform, status, body);
            return Err(SitecastError::StorageError(format!(
                "bucket listing failed with {}",
                status
            )));
        }

        parse_bucket_names(&body)
    }

    async fn list_prefixes(
        &self,
        credential: Option<&OpenedCredential>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SitecastError> {
        let credential = require_credential(Platform::AwsS3, credential)?;
        let target = S3Target::resolve(credential)?;
        let store = self.store(credential, &target, bucket)?;

        let prefix = prefix.trim_start_matches('/');
        let (parent, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let parent_path = (!parent.is_empty()).then(|| ObjectPath::from(parent));

        let listing = store.list_with_delimiter(parent_path.as_ref()).await?;
        let mut prefixes: Vec<String> = listing
            .common_prefixes
            .into_iter()
            .map(|p| format!("{}/", p.as_ref()))
            .filter(|p| p.starts_with(prefix))
            .collect();
        prefixes.sort();
        Ok(prefixes)
    }
}

/// Bucket names from a ListAllMyBucketsResult document
pub fn parse_bucket_names(xml: &str) -> Result<Vec<String>, SitecastError> {
    let listing: BucketListing = quick_xml::de::from_str(xml)
        .map_err(|e| SitecastError::StorageError(format!("invalid bucket listing: {}", e)))?;
    Ok(listing
        .buckets
        .entries
        .into_iter()
        .map(|b| b.name.trim().to_string())
        .collect())
}
