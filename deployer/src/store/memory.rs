//! In-memory store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::errors::SitecastError;
use crate::models::campaign::Campaign;
use crate::models::credential::Credential;
use crate::models::deployment::Deployment;
use crate::models::template::Template;
use crate::store::{newest_first, Store};

struct Collection<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Collection<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn put(&self, id: &str, value: T) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(id.to_string(), value);
    }

    fn get(&self, id: &str) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).cloned()
    }

    fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(id).is_some()
    }

    fn filter(&self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|v| keep(v)).cloned().collect()
    }
}

/// Non-durable store for tests and ephemeral runs
pub struct MemoryStore {
    templates: Collection<Template>,
    credentials: Collection<Credential>,
    campaigns: Collection<Campaign>,
    deployments: Collection<Deployment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            templates: Collection::new(),
            credentials: Collection::new(),
            campaigns: Collection::new(),
            deployments: Collection::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_template(&self, template: &Template) -> Result<(), SitecastError> {
        self.templates.put(&template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>, SitecastError> {
        Ok(self.templates.get(id))
    }

    async fn list_templates(&self) -> Result<Vec<Template>, SitecastError> {
        let mut templates = self.templates.filter(|_| true);
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), SitecastError> {
        self.credentials.put(&credential.id, credential.clone());
        Ok(())
    }

    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, SitecastError> {
        Ok(self.credentials.get(id))
    }

    async fn list_credentials(&self, owner_id: &str) -> Result<Vec<Credential>, SitecastError> {
        let mut items = self.credentials.filter(|c| c.owner_id == owner_id);
        newest_first(&mut items, |c| c.created_at);
        Ok(items)
    }

    async fn delete_credential(&self, id: &str) -> Result<bool, SitecastError> {
        Ok(self.credentials.remove(id))
    }

    async fn put_campaign(&self, campaign: &Campaign) -> Result<(), SitecastError> {
        self.campaigns.put(&campaign.id, campaign.clone());
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, SitecastError> {
        Ok(self.campaigns.get(id))
    }

    async fn list_campaigns(&self, owner_id: &str) -> Result<Vec<Campaign>, SitecastError> {
        let mut items = self.campaigns.filter(|c| c.owner_id == owner_id);
        newest_first(&mut items, |c| c.created_at);
        Ok(items)
    }

    async fn put_deployment(&self, deployment: &Deployment) -> Result<(), SitecastError> {
        self.deployments.put(&deployment.id, deployment.clone());
        Ok(())
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, SitecastError> {
        Ok(self.deployments.get(id))
    }

    async fn list_deployments(&self, owner_id: &str) -> Result<Vec<Deployment>, SitecastError> {
        let mut items = self.deployments.filter(|d| d.owner_id == owner_id);
        newest_first(&mut items, |d| d.created_at);
        Ok(items)
    }

    async fn list_campaign_deployments(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<Deployment>, SitecastError> {
        let mut items = self.deployments.filter(|d| d.campaign_id == campaign_id);
        newest_first(&mut items, |d| d.created_at);
        Ok(items)
    }

    async fn delete_deployment(&self, id: &str) -> Result<bool, SitecastError> {
        Ok(self.deployments.remove(id))
    }
}
