//! Job pipeline: generate, publish and record one job end to end

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::deploy::fsm::{DeploymentEvent, FsmSettings};
use crate::errors::SitecastError;
use crate::generator::Generator;
use crate::models::credential::OpenedCredential;
use crate::models::deployment::Deployment;
use crate::models::job::{Job, JobKind};
use crate::providers::{ProviderFactory, PublishRequest, StorageProvider};
use crate::store::Store;
use crate::vault::Vault;

pub struct Pipeline {
    store: Arc<dyn Store>,
    vault: Arc<dyn Vault>,
    generator: Generator,
    providers: Arc<ProviderFactory>,
    settings: FsmSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        vault: Arc<dyn Vault>,
        generator: Generator,
        providers: Arc<ProviderFactory>,
        settings: FsmSettings,
    ) -> Self {
        Self {
            store,
            vault,
            generator,
            providers,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run one job. The record is Pending before any external call and
    /// terminal when this returns.
    pub async fn execute(&self, job: &Job) -> Result<Deployment, SitecastError> {
        let mut record = match &job.kind {
            JobKind::Deploy => match self.begin_deploy(job).await? {
                Some(record) => record,
                None => {
                    let done = self
                        .store
                        .get_deployment(job.deployment_id())
                        .await?
                        .ok_or_else(|| SitecastError::NotFound(format!("deployment {}", job.id)))?;
                    return Ok(done);
                }
            },
            JobKind::Redeploy { deployment_id } => {
                let mut record = self
                    .store
                    .get_deployment(deployment_id)
                    .await?
                    .ok_or_else(|| {
                        SitecastError::NotFound(format!("deployment {}", deployment_id))
                    })?;
                record.process(DeploymentEvent::Redeploy)?;
                self.store.put_deployment(&record).await?;
                record
            }
        };

        match self.run(job, &mut record).await {
            Ok(()) => {
                info!(
                    deployment_id = %record.id,
                    platform = %record.platform,
                    url = %record.url,
                    "Deployment live"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(deployment_id = %record.id, "Deployment failed: {}", e);
                if !record.status().is_terminal() {
                    record.mark_failed(&e)?;
                    self.store.put_deployment(&record).await?;
                }
                Err(e)
            }
        }
    }

    /// Create (or resume) the record for a deploy job. `None` means the job
    /// was already carried to a terminal state by an earlier delivery.
    async fn begin_deploy(&self, job: &Job) -> Result<Option<Deployment>, SitecastError> {
        let campaign = self
            .store
            .get_campaign(&job.campaign_id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("campaign {}", job.campaign_id)))?;

        match self.store.get_deployment(&job.id).await? {
            Some(existing) if existing.status().is_terminal() => {
                debug!(deployment_id = %existing.id, "Redelivered job already finished");
                Ok(None)
            }
            Some(existing) => Ok(Some(existing)),
            None => {
                let record = Deployment::pending(job, &campaign.owner_id);
                self.store.put_deployment(&record).await?;
                Ok(Some(record))
            }
        }
    }

    async fn run(&self, job: &Job, record: &mut Deployment) -> Result<(), SitecastError> {
        if record.artifact.is_empty() {
            let template = self
                .store
                .get_template(&job.template_id)
                .await?
                .ok_or_else(|| SitecastError::NotFound(format!("template {}", job.template_id)))?;

            let row = if record.row.is_empty() { &job.row } else { &record.row };
            let artifact = timeout(
                self.settings.generation_timeout,
                self.generator.generate(&template, row),
            )
            .await
            .map_err(|_| {
                SitecastError::GenerationError(format!(
                    "timed out after {}s",
                    self.settings.generation_timeout.as_secs()
                ))
            })??;
            record.artifact = artifact;
            debug!(deployment_id = %record.id, bytes = record.artifact.len(), "Artifact generated");
        }

        let credential = self.open_credential(job, record).await?;
        let body = record.published_body();
        let request = PublishRequest {
            platform: record.platform,
            slug: &record.slug,
            body: &body,
            destination: &record.destination,
            site_id: record.site_id.as_deref(),
        };

        let outcome = timeout(
            self.settings.publish_timeout,
            self.providers
                .for_platform(record.platform)
                .publish(request, credential.as_ref()),
        )
        .await
        .map_err(|_| {
            SitecastError::publish(
                record.platform,
                &record.slug,
                format!("timed out after {}s", self.settings.publish_timeout.as_secs()),
            )
        })??;

        // What was published stays on the record even when storing Live fails
        record.url = outcome.url.clone();
        if outcome.site_id.is_some() {
            record.site_id = outcome.site_id.clone();
        }

        // The record only turns Live once the Live state is stored
        let mut live = record.clone();
        live.mark_live(outcome.url, outcome.site_id)?;
        self.store.put_deployment(&live).await?;
        *record = live;
        Ok(())
    }

    async fn open_credential(
        &self,
        job: &Job,
        record: &Deployment,
    ) -> Result<Option<OpenedCredential>, SitecastError> {
        if !record.platform.requires_credential() {
            return Ok(None);
        }

        let credential_id = job.credential_id.as_deref().ok_or_else(|| {
            SitecastError::CredentialError(format!("{} requires a credential", record.platform))
        })?;
        let credential = self
            .store
            .get_credential(credential_id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("credential {}", credential_id)))?;

        if credential.owner_id != record.owner_id {
            return Err(SitecastError::AuthorizationError(
                "credential belongs to another user".to_string(),
            ));
        }
        if credential.platform != record.platform {
            return Err(SitecastError::CredentialError(format!(
                "credential is for {}, record targets {}",
                credential.platform, record.platform
            )));
        }
        Ok(Some(credential.open(self.vault.as_ref())))
    }
}
