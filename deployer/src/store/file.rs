//! JSON document store: one file per document, one directory per collection

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::errors::SitecastError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::campaign::Campaign;
use crate::models::credential::Credential;
use crate::models::deployment::Deployment;
use crate::models::template::Template;
use crate::store::{newest_first, Store};

const TEMPLATES: &str = "templates";
const CREDENTIALS: &str = "credentials";
const CAMPAIGNS: &str = "campaigns";
const DEPLOYMENTS: &str = "deployments";

/// File-backed store
pub struct FileStore {
    root: Dir,
}

impl FileStore {
    /// Open (and create) a store under `root`
    pub async fn open(root: Dir) -> Result<Self, SitecastError> {
        for collection in [TEMPLATES, CREDENTIALS, CAMPAIGNS, DEPLOYMENTS] {
            root.subdir(collection).create().await?;
        }
        Ok(Self { root })
    }

    fn document(&self, collection: &str, id: &str) -> Result<File, SitecastError> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(SitecastError::ValidationError(format!("invalid id '{}'", id)));
        }
        Ok(self.root.subdir(collection).file(&format!("{}.json", id)))
    }

    async fn put<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<File, SitecastError> {
        let file = self.document(collection, id)?;
        file.write_json(value).await?;
        Ok(file)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, SitecastError> {
        match self.document(collection, id) {
            Ok(file) => file.read_json_opt().await,
            // Ids that cannot name a file cannot exist
            Err(_) => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, SitecastError> {
        let Ok(file) = self.document(collection, id) else {
            return Ok(false);
        };
        if !file.exists().await {
            return Ok(false);
        }
        file.delete().await?;
        Ok(true)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        keep: impl Fn(&T) -> bool + Send,
    ) -> Result<Vec<T>, SitecastError> {
        let mut out = Vec::new();
        for file in self.root.subdir(collection).list_files().await? {
            if file.path().extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match file.read_json::<T>().await {
                Ok(value) if keep(&value) => out.push(value),
                Ok(_) => {}
                // A document may vanish between listing and reading
                Err(SitecastError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Skipping unreadable document {}: {}", file.path().display(), e),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn put_template(&self, template: &Template) -> Result<(), SitecastError> {
        self.put(TEMPLATES, &template.id, template).await?;
        Ok(())
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>, SitecastError> {
        self.get(TEMPLATES, id).await
    }

    async fn list_templates(&self) -> Result<Vec<Template>, SitecastError> {
        let mut templates: Vec<Template> = self.list(TEMPLATES, |_| true).await?;
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), SitecastError> {
        let file = self.put(CREDENTIALS, &credential.id, credential).await?;
        file.set_permissions_600().await
    }

    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, SitecastError> {
        self.get(CREDENTIALS, id).await
    }

    async fn list_credentials(&self, owner_id: &str) -> Result<Vec<Credential>, SitecastError> {
        let mut items: Vec<Credential> = self
            .list(CREDENTIALS, |c: &Credential| c.owner_id == owner_id)
            .await?;
        newest_first(&mut items, |c| c.created_at);
        Ok(items)
    }

    async fn delete_credential(&self, id: &str) -> Result<bool, SitecastError> {
        self.delete(CREDENTIALS, id).await
    }

    async fn put_campaign(&self, campaign: &Campaign) -> Result<(), SitecastError> {
        self.put(CAMPAIGNS, &campaign.id, campaign).await?;
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, SitecastError> {
        self.get(CAMPAIGNS, id).await
    }

    async fn list_campaigns(&self, owner_id: &str) -> Result<Vec<Campaign>, SitecastError> {
        let mut items: Vec<Campaign> = self
            .list(CAMPAIGNS, |c: &Campaign| c.owner_id == owner_id)
            .await?;
        newest_first(&mut items, |c| c.created_at);
        Ok(items)
    }

    async fn put_deployment(&self, deployment: &Deployment) -> Result<(), SitecastError> {
        self.put(DEPLOYMENTS, &deployment.id, deployment).await?;
        Ok(())
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, SitecastError> {
        self.get(DEPLOYMENTS, id).await
    }

    async fn list_deployments(&self, owner_id: &str) -> Result<Vec<Deployment>, SitecastError> {
        let mut items: Vec<Deployment> = self
            .list(DEPLOYMENTS, |d: &Deployment| d.owner_id == owner_id)
            .await?;
        newest_first(&mut items, |d| d.created_at);
        Ok(items)
    }

    async fn list_campaign_deployments(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<Deployment>, SitecastError> {
        let mut items: Vec<Deployment> = self
            .list(DEPLOYMENTS, |d: &Deployment| d.campaign_id == campaign_id)
            .await?;
        newest_first(&mut items, |d| d.created_at);
        Ok(items)
    }

    async fn delete_deployment(&self, id: &str) -> Result<bool, SitecastError> {
        self.delete(DEPLOYMENTS, id).await
    }
}
