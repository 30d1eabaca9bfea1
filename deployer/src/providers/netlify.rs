//! Netlify-style managed hosting: one site per artifact, zip deploys

use std::io::{Cursor, Write};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use openapi_client::models::{CreateSiteRequest, Deploy, Site};
use rand::Rng;
use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::errors::SitecastError;
use crate::models::credential::{OpenedCredential, Platform};
use crate::providers::{
    require_credential, PublishOutcome, PublishRequest, RemoveRequest, StorageProvider,
};

pub const DEFAULT_API_URL: &str = "https://api.netlify.com/api/v1";

const HEADERS_FILE: &str = "/*\n  Content-Type: text/html; charset=utf-8\n\n\
/*.html\n  Content-Type: text/html; charset=utf-8\n\n\
/*.css\n  Content-Type: text/css; charset=utf-8\n\n\
/*.js\n  Content-Type: application/javascript; charset=utf-8";

const NETLIFY_TOML: &str = "[build]\n  publish = \".\"\n\n\
[[headers]]\n  for = \"/*\"\n  [headers.values]\n    Content-Type = \"text/html; charset=utf-8\"\n\n\
[[headers]]\n  for = \"/*.html\"\n  [headers.values]\n    Content-Type = \"text/html; charset=utf-8\"\n\n\
[[headers]]\n  for = \"/*.css\"\n  [headers.values]\n    Content-Type = \"text/css; charset=utf-8\"\n\n\
[[headers]]\n  for = \"/*.js\"\n  [headers.values]\n    Content-Type = \"application/javascript; charset=utf-8\"\n\n\
[[headers]]\n  for = \"/*.xml\"\n  [headers.values]\n    Content-Type = \"application/xml; charset=utf-8\"";

/// Outcome of a create-site call
enum SiteCreation {
    Created(Site),
    NameTaken,
}

/// Netlify API provider
pub struct NetlifyProvider {
    client: Client,
    base_url: String,
}

impl NetlifyProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SitecastError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder, token: &SecretString) -> RequestBuilder {
        request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", token.expose_secret()),
        )
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, String> {
        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Netlify {} failed: {} - {}", what, status, body);
            return Err(format!("{} returned {}", what, status));
        }
        response.json().await.map_err(|e| e.to_string())
    }

    async fn create_site(&self, token: &SecretString, name: &str) -> Result<SiteCreation, String> {
        let url = format!("{}/sites", self.base_url);
        debug!("POST {} (name {})", url, name);

        let response = self
            .authorized(self.client.post(&url), token)
            .json(&CreateSiteRequest {
                name: name.to_string(),
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Ok(SiteCreation::NameTaken);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Netlify site creation failed: {} - {}", status, body);
            return Err(format!("site creation returned {}", status));
        }

        let site: Site = response.json().await.map_err(|e| e.to_string())?;
        Ok(SiteCreation::Created(site))
    }

    async fn get_site(&self, token: &SecretString, site_id: &str) -> Result<Site, String> {
        let url = format!("{}/sites/{}", self.base_url, site_id);
        debug!("GET {}", url);
        self.send_json(self.authorized(self.client.get(&url), token), "site lookup")
            .await
    }

    async fn deploy_bundle(
        &self,
        token: &SecretString,
        site_id: &str,
        bundle: Vec<u8>,
    ) -> Result<Deploy, String> {
        let url = format!("{}/sites/{}/deploys", self.base_url, site_id);
        debug!("POST {} ({} bytes)", url, bundle.len());
        let request = self
            .authorized(self.client.post(&url), token)
            .header(header::CONTENT_TYPE, "application/zip")
            .body(bundle);
        self.send_json(request, "deploy").await
    }

    /// Find the target site, creating it when there is none yet
    async fn resolve_site(
        &self,
        token: &SecretString,
        slug: &str,
        known_site: Option<&str>,
    ) -> Result<Site, SitecastError> {
        let fail = |cause: String| SitecastError::publish(Platform::Netlify, slug, cause);

        if let Some(site_id) = known_site {
            return self.get_site(token, site_id).await.map_err(fail);
        }

        match self.create_site(token, slug).await.map_err(fail)? {
            SiteCreation::Created(site) => Ok(site),
            SiteCreation::NameTaken => {
                let candidate = format!("{}-{}", slug, rand::thread_rng().gen_range(100..=9099));
                info!(
                    "Netlify site name '{}' is taken, retrying as '{}'",
                    slug, candidate
                );
                match self.create_site(token, &candidate).await.map_err(fail)? {
                    SiteCreation::Created(site) => Ok(site),
                    SiteCreation::NameTaken => Err(fail(format!(
                        "site name '{}' is taken even with a random suffix",
                        candidate
                    ))),
                }
            }
        }
    }
}

/// Zip bundle with the document and MIME configuration
pub fn build_bundle(body: &str) -> Result<Vec<u8>, SitecastError> {
    let zip_err = |e: zip::result::ZipError| SitecastError::Internal(format!("zip: {}", e));

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (name, contents) in [
            ("index.html", body),
            ("_headers", HEADERS_FILE),
            ("netlify.toml", NETLIFY_TOML),
        ] {
            zip.start_file(name, options).map_err(zip_err)?;
            zip.write_all(contents.as_bytes())?;
        }
        zip.finish().map_err(zip_err)?;
    }
    Ok(buffer.into_inner())
}

fn access_token(credential: &OpenedCredential) -> Result<SecretString, SitecastError> {
    Ok(SecretString::from(credential.access_token()?.to_string()))
}

#[async_trait]
impl StorageProvider for NetlifyProvider {
    async fn publish(
        &self,
        request: PublishRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<PublishOutcome, SitecastError> {
        let credential = require_credential(Platform::Netlify, credential)?;
        let token = access_token(credential)?;

        // Only the record's own site is reused, never the credential's shared one
        let site = self.resolve_site(&token, request.slug, request.site_id).await?;

        let bundle = build_bundle(request.body)?;
        self.deploy_bundle(&token, &site.id, bundle)
            .await
            .map_err(|cause| SitecastError::publish(Platform::Netlify, request.slug, cause))?;

        let url = format!("https://{}.netlify.app", site.name);
        info!("Published '{}' to {} (site {})", request.slug, url, site.id);
        Ok(PublishOutcome {
            url,
            site_id: Some(site.id),
        })
    }

    async fn remove(
        &self,
        request: RemoveRequest<'_>,
        credential: Option<&OpenedCredential>,
    ) -> Result<(), SitecastError> {
        let credential = require_credential(Platform::Netlify, credential)?;
        let token = access_token(credential)?;

        let Some(site_id) = request.site_id else {
            debug!("No Netlify site recorded for '{}', nothing to remove", request.slug);
            return Ok(());
        };
        if credential.site_id.as_deref() == Some(site_id) {
            warn!(
                "Site {} is pinned on the credential and shared, leaving it in place",
                site_id
            );
            return Ok(());
        }

        let url = format!("{}/sites/{}", self.base_url, site_id);
        debug!("DELETE {}", url);
        let response = self
            .authorized(self.client.delete(&url), &token)
            .send()
            .await
            .map_err(|e| SitecastError::remove(Platform::Netlify, request.slug, e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        error!("Netlify site deletion failed: {} - {}", status, body);
        Err(SitecastError::remove(
            Platform::Netlify,
            request.slug,
            format!("site deletion returned {}", status),
        ))
    }

    async fn list_buckets(
        &self,
        credential: Option<&OpenedCredential>,
    ) -> Result<Vec<String>, SitecastError> {
        let credential = require_credential(Platform::Netlify, credential)?;
        let token = access_token(credential)?;

        let url = format!("{}/sites", self.base_url);
        debug!("GET {}", url);
        let sites: Vec<Site> = self
            .send_json(self.authorized(self.client.get(&url), &token), "site listing")
            .await
            .map_err(SitecastError::StorageError)?;
        Ok(sites.into_iter().map(|s| s.name).collect())
    }

    async fn list_prefixes(
        &self,
        _credential: Option<&OpenedCredential>,
        _bucket: &str,
        _prefix: &str,
    ) -> Result<Vec<String>, SitecastError> {
        Ok(Vec::new())
    }
}
