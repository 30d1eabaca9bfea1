//! Deployment record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentStatus};
use crate::errors::SitecastError;
use crate::generator::inject_header;
use crate::models::campaign::Destination;
use crate::models::credential::Platform;
use crate::models::job::Job;
use crate::models::RowData;

/// One published (or attempted) artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Same id as the deploy job that created it
    pub id: String,

    pub owner_id: String,

    pub campaign_id: String,

    pub product_name: String,

    pub slug: String,

    pub platform: Platform,

    #[serde(default)]
    pub destination: Destination,

    /// Public URL, empty until the first successful publish
    #[serde(default)]
    pub url: String,

    #[serde(flatten)]
    pub lifecycle: DeploymentFsm,

    /// Generated document, without the header snippet
    #[serde(default)]
    pub artifact: String,

    #[serde(default)]
    pub header_snippet: String,

    /// Managed-hosting site id, reused on redeploy
    #[serde(default)]
    pub site_id: Option<String>,

    /// Source row, kept so a record without an artifact can be regenerated
    #[serde(default)]
    pub row: RowData,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// New Pending record for a deploy job
    pub fn pending(job: &Job, owner_id: &str) -> Self {
        let now = Utc::now();
        let product_name = job
            .row
            .get("name")
            .or_else(|| job.row.get("product_name"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| job.slug.clone());

        Self {
            id: job.id.clone(),
            owner_id: owner_id.to_string(),
            campaign_id: job.campaign_id.clone(),
            product_name,
            slug: job.slug.clone(),
            platform: job.platform,
            destination: job.destination.clone(),
            url: String::new(),
            lifecycle: DeploymentFsm::new(),
            artifact: String::new(),
            header_snippet: job
                .row
                .get("header_code")
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            site_id: None,
            row: job.row.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> DeploymentStatus {
        self.lifecycle.state()
    }

    pub fn error(&self) -> Option<&str> {
        self.lifecycle.error()
    }

    /// Apply a lifecycle event
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), SitecastError> {
        self.lifecycle
            .process(event)
            .map_err(SitecastError::Conflict)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a successful publish
    pub fn mark_live(&mut self, url: String, site_id: Option<String>) -> Result<(), SitecastError> {
        self.process(DeploymentEvent::Published)?;
        self.url = url;
        if site_id.is_some() {
            self.site_id = site_id;
        }
        Ok(())
    }

    /// Record a failure
    pub fn mark_failed(&mut self, err: &SitecastError) -> Result<(), SitecastError> {
        self.process(DeploymentEvent::PublishFailed(err.to_string()))
    }

    /// The document as it is published: artifact plus header snippet
    pub fn published_body(&self) -> String {
        inject_header(&self.artifact, &self.header_snippet)
    }
}
