//! Custom-domain hosting on the local filesystem.
//!
//! Layout: `{base}/{domain}/{slug}/index.html`, served by a web server that
//! maps each domain directory to its virtual host.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::SitecastError;
use crate::filesys::dir::Dir;
use crate::models::credential::{OpenedCredential, Platform};
use crate::providers::{PublishOutcome, PublishRequest, RemoveRequest, StorageProvider};

/// Local filesystem provider
pub struct LocalProvider {
    base: Dir,
}

impl LocalProvider {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base: Dir::new(base_path.into()),
        }
    }

    pub fn base(&self) -> &Dir {
        &self.base
    }

    fn site_dir(&self, domain: &str, slug: &str) -> Dir {
        self.base.subdir(domain).subdir(slug)
    }
}

/// A domain or slug usable as one path segment
fn path_segment<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    match value {
        Some(v) if v != "." && v != ".." && !v.contains(['/', '\\']) => Ok(v),
        Some(v) => Err(format!("invalid {} '{}'", what, v)),
        None => Err(format!("no {} configured", what)),
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    async fn publish(
        &self,
        request: PublishRequest<'_>,
        _credential: Option<&OpenedCredential>,
    ) -> Result<PublishOutcome, SitecastError> {
        let fail = |cause: String| SitecastError::publish(Platform::CustomDomain, request.slug, cause);
        let domain = path_segment(request.destination.domain.as_deref(), "domain").map_err(fail)?;
        let slug = path_segment(Some(request.slug), "slug").map_err(fail)?;

        let dir = self.site_dir(domain, slug);
        let file = dir.file("index.html");
        debug!("Writing {}", file.path().display());
        file.write_atomic(request.body.as_bytes())
            .await
            .map_err(|e| fail(e.to_string()))?;

        let url = format!("https://{}/{}/", domain, slug);
        info!("Published '{}' to {}", slug, url);
        Ok(PublishOutcome { url, site_id: None })
    }

    async fn remove(
        &self,
        request: RemoveRequest<'_>,
        _credential: Option<&OpenedCredential>,
    ) -> Result<(), SitecastError> {
        let fail = |cause: String| SitecastError::remove(Platform::CustomDomain, request.slug, cause);
        let domain = path_segment(request.destination.domain.as_deref(), "domain").map_err(fail)?;
        let slug = path_segment(Some(request.slug), "slug").map_err(fail)?;

        self.site_dir(domain, slug)
            .delete()
            .await
            .map_err(|e| fail(e.to_string()))
    }

    async fn list_buckets(
        &self,
        _credential: Option<&OpenedCredential>,
    ) -> Result<Vec<String>, SitecastError> {
        self.base.list_dirs().await
    }

    async fn list_prefixes(
        &self,
        _credential: Option<&OpenedCredential>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SitecastError> {
        let domain = path_segment(Some(bucket), "domain").map_err(SitecastError::ValidationError)?;
        let names = self.base.subdir(domain).list_dirs().await?;
        Ok(names.into_iter().filter(|n| n.starts_with(prefix)).collect())
    }
}
