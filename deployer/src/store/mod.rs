//! Repositories for templates, credentials, campaigns and deployment records

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::errors::SitecastError;
use crate::models::campaign::Campaign;
use crate::models::credential::Credential;
use crate::models::deployment::Deployment;
use crate::models::template::Template;

#[async_trait]
pub trait Store: Send + Sync {
    async fn put_template(&self, template: &Template) -> Result<(), SitecastError>;
    async fn get_template(&self, id: &str) -> Result<Option<Template>, SitecastError>;
    async fn list_templates(&self) -> Result<Vec<Template>, SitecastError>;

    async fn put_credential(&self, credential: &Credential) -> Result<(), SitecastError>;
    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, SitecastError>;
    async fn list_credentials(&self, owner_id: &str) -> Result<Vec<Credential>, SitecastError>;
    /// Returns whether a document was removed
    async fn delete_credential(&self, id: &str) -> Result<bool, SitecastError>;

    async fn put_campaign(&self, campaign: &Campaign) -> Result<(), SitecastError>;
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, SitecastError>;
    async fn list_campaigns(&self, owner_id: &str) -> Result<Vec<Campaign>, SitecastError>;

    async fn put_deployment(&self, deployment: &Deployment) -> Result<(), SitecastError>;
    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, SitecastError>;
    async fn list_deployments(&self, owner_id: &str) -> Result<Vec<Deployment>, SitecastError>;
    async fn list_campaign_deployments(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<Deployment>, SitecastError>;
    /// Returns whether a document was removed
    async fn delete_deployment(&self, id: &str) -> Result<bool, SitecastError>;
}

/// Newest first
pub(crate) fn newest_first<T>(
    items: &mut [T],
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}
