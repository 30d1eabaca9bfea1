//! Deployment record operations: listing, header edits, redeploy and removal

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::authn::principal::Principal;
use crate::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use crate::errors::SitecastError;
use crate::models::credential::OpenedCredential;
use crate::models::deployment::Deployment;
use crate::models::job::{Job, JobKind};
use crate::providers::{ProviderFactory, RemoveRequest, StorageProvider};
use crate::queue::JobQueue;
use crate::services::campaigns::rollup;
use crate::store::Store;
use crate::utils::generate_uuid;
use crate::vault::Vault;

/// Per-principal dashboard figures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub live: usize,
    pub failed: usize,
    pub pending: usize,
    pub deployments: usize,
    pub campaigns: usize,
}

pub struct DeploymentService {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    vault: Arc<dyn Vault>,
    providers: Arc<ProviderFactory>,
}

impl DeploymentService {
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn JobQueue>,
        vault: Arc<dyn Vault>,
        providers: Arc<ProviderFactory>,
    ) -> Self {
        Self {
            store,
            queue,
            vault,
            providers,
        }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Deployment>, SitecastError> {
        self.store.list_deployments(&principal.user_id).await
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Deployment, SitecastError> {
        let record = self
            .store
            .get_deployment(id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("deployment {}", id)))?;
        principal.ensure_owner(&record.owner_id, "deployment")?;
        Ok(record)
    }

    /// Replace the header snippet, optionally republishing right away
    pub async fn update_header(
        &self,
        principal: &Principal,
        id: &str,
        snippet: &str,
        redeploy: bool,
    ) -> Result<Deployment, SitecastError> {
        let mut record = self.get(principal, id).await?;
        if redeploy && !record.lifecycle.can_redeploy() {
            return Err(SitecastError::Conflict(format!(
                "deployment {} is still {}",
                id,
                record.status()
            )));
        }

        record.header_snippet = snippet.trim().to_string();
        record.updated_at = Utc::now();
        self.store.put_deployment(&record).await?;

        if redeploy {
            return self.enqueue_redeploy(record).await;
        }
        Ok(record)
    }

    /// Re-enter the pipeline for a Live or Failed record
    pub async fn request_redeploy(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Deployment, SitecastError> {
        let record = self.get(principal, id).await?;
        if !record.lifecycle.can_redeploy() {
            return Err(SitecastError::Conflict(format!(
                "deployment {} is still {}",
                id,
                record.status()
            )));
        }
        self.enqueue_redeploy(record).await
    }

    async fn enqueue_redeploy(&self, mut record: Deployment) -> Result<Deployment, SitecastError> {
        let campaign = self
            .store
            .get_campaign(&record.campaign_id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("campaign {}", record.campaign_id)))?;

        record.process(DeploymentEvent::Redeploy)?;
        self.store.put_deployment(&record).await?;

        let job = Job {
            id: generate_uuid(),
            kind: JobKind::Redeploy {
                deployment_id: record.id.clone(),
            },
            campaign_id: campaign.id.clone(),
            platform: record.platform,
            credential_id: campaign.credential_id.clone(),
            template_id: campaign.template_id.clone(),
            row: record.row.clone(),
            slug: record.slug.clone(),
            destination: record.destination.clone(),
            enqueued_at: Utc::now(),
        };

        if let Err(e) = self.queue.push(job).await {
            // Do not leave a record Pending with no job behind it
            record.mark_failed(&e)?;
            self.store.put_deployment(&record).await?;
            return Err(e);
        }

        info!(deployment_id = %record.id, "Redeploy queued");
        Ok(record)
    }

    /// Remove the published artifact (best effort) and the record.
    ///
    /// A Pending record still has a job in flight and cannot be deleted.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), SitecastError> {
        let record = self.get(principal, id).await?;
        if !record.status().is_terminal() {
            return Err(SitecastError::Conflict(format!(
                "deployment {} is still {}",
                id,
                record.status()
            )));
        }

        // A Failed record may still have an earlier publish behind it
        if !record.url.is_empty() || record.site_id.is_some() {
            if let Err(e) = self.remove_artifact(&record).await {
                warn!(deployment_id = %record.id, "Could not remove published artifact: {}", e);
            }
        }

        if !self.store.delete_deployment(&record.id).await? {
            return Ok(());
        }
        info!(deployment_id = %record.id, "Deployment deleted");

        self.note_removal(&record).await
    }

    /// Count the deleted record against its campaign so the rollup can still finish
    async fn note_removal(&self, record: &Deployment) -> Result<(), SitecastError> {
        let Some(mut campaign) = self.store.get_campaign(&record.campaign_id).await? else {
            return Ok(());
        };
        campaign.removed += 1;
        if record.status() == DeploymentStatus::Live {
            campaign.removed_live += 1;
        }
        self.store.put_campaign(&campaign).await?;

        rollup(self.store.as_ref(), &campaign.id).await?;
        Ok(())
    }

    async fn remove_artifact(&self, record: &Deployment) -> Result<(), SitecastError> {
        let credential = self.credential_for(record).await?;
        let request = RemoveRequest {
            platform: record.platform,
            slug: &record.slug,
            destination: &record.destination,
            site_id: record.site_id.as_deref(),
        };
        self.providers
            .for_platform(record.platform)
            .remove(request, credential.as_ref())
            .await
    }

    async fn credential_for(
        &self,
        record: &Deployment,
    ) -> Result<Option<OpenedCredential>, SitecastError> {
        if !record.platform.requires_credential() {
            return Ok(None);
        }
        let campaign = self
            .store
            .get_campaign(&record.campaign_id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("campaign {}", record.campaign_id)))?;
        let credential_id = campaign.credential_id.ok_or_else(|| {
            SitecastError::CredentialError(format!("campaign {} has no credential", campaign.id))
        })?;
        let credential = self
            .store
            .get_credential(&credential_id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("credential {}", credential_id)))?;
        Ok(Some(credential.open(self.vault.as_ref())))
    }

    pub async fn stats(&self, principal: &Principal) -> Result<DashboardStats, SitecastError> {
        let records = self.store.list_deployments(&principal.user_id).await?;
        let campaigns = self.store.list_campaigns(&principal.user_id).await?;
        let count = |status| records.iter().filter(|r| r.status() == status).count();
        Ok(DashboardStats {
            live: count(DeploymentStatus::Live),
            failed: count(DeploymentStatus::Failed),
            pending: count(DeploymentStatus::Pending),
            deployments: records.len(),
            campaigns: campaigns.len(),
        })
    }
}
