//! Worker pipeline tests against the local custom-domain provider

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use sitecast::authn::principal::Principal;
use sitecast::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use sitecast::errors::SitecastError;
use sitecast::generator::Generator;
use sitecast::models::campaign::{Campaign, CampaignStatus, Destination};
use sitecast::models::credential::{Credential, Platform};
use sitecast::models::deployment::Deployment;
use sitecast::models::job::{Job, JobKind};
use sitecast::models::template::Template;
use sitecast::providers::ProviderFactory;
use sitecast::queue::JobQueue;
use sitecast::services::campaigns::CampaignSubmission;
use sitecast::store::memory::MemoryStore;
use sitecast::store::Store;
use sitecast::workers::deployer;
use sitecast::workers::pipeline::Pipeline;

use crate::support::{product, Harness, USER};

async fn submit(h: &Harness, rows: Vec<sitecast::models::RowData>) -> String {
    h.state
        .campaigns
        .submit(&h.principal, h.custom_domain(rows))
        .await
        .unwrap()
        .campaign_id
}

#[tokio::test]
async fn test_jobs_publish_and_go_live() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget"), product("Gizmo", "gizmo")]).await;

    assert_eq!(h.drain().await, 2);

    let records = h.store.list_campaign_deployments(&campaign_id).await.unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.status(), DeploymentStatus::Live);
        assert_eq!(record.url, format!("https://example.com/{}/", record.slug));
        assert!(!record.artifact.contains("```"));
        let published = std::fs::read_to_string(h.published_file(&record.slug)).unwrap();
        assert_eq!(published, record.artifact);
    }

    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert!(h.queue.failed().await.unwrap().is_empty());
    assert_eq!(h.queue.inflight_len(), 0);
}

#[tokio::test]
async fn test_generation_failure_marks_record_failed() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("boom", "broken"), product("Widget", "widget")]).await;
    h.drain().await;

    let records = h.store.list_campaign_deployments(&campaign_id).await.unwrap();
    let broken = records.iter().find(|r| r.slug == "broken").unwrap();
    assert_eq!(broken.status(), DeploymentStatus::Failed);
    assert!(broken.error().unwrap().contains("backend exploded"));
    assert!(broken.url.is_empty());
    assert!(!h.published_file("broken").exists());

    let failed = h.queue.failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job.slug, "broken");

    // One live record is enough for the campaign to complete
    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn test_campaign_fails_when_nothing_goes_live() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("boom", "one"), product("boom again", "two")]).await;
    h.drain().await;

    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Failed);
    let records = h.store.list_campaign_deployments(&campaign_id).await.unwrap();
    assert!(records.iter().all(|r| r.status() == DeploymentStatus::Failed));
}

#[tokio::test]
async fn test_redeploy_of_failed_record_goes_live() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("boom", "retry-me")]).await;
    h.drain().await;

    let record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);
    assert_eq!(record.status(), DeploymentStatus::Failed);

    h.backend.heal();
    let pending = h.state.deployments.request_redeploy(&h.principal, &record.id).await.unwrap();
    assert_eq!(pending.status(), DeploymentStatus::Pending);
    assert!(pending.error().is_none());

    h.drain().await;
    let live = h.state.deployments.get(&h.principal, &record.id).await.unwrap();
    assert_eq!(live.status(), DeploymentStatus::Live);
    assert_eq!(live.lifecycle.attempts(), 2);
    assert!(h.published_file("retry-me").exists());

    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn test_header_update_republishes_stored_artifact() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget")]).await;
    h.drain().await;
    let record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);
    let calls = h.backend.calls();

    h.state
        .deployments
        .update_header(&h.principal, &record.id, "<meta name=\"verify\" content=\"1\">", true)
        .await
        .unwrap();
    h.drain().await;

    let updated = h.state.deployments.get(&h.principal, &record.id).await.unwrap();
    assert_eq!(updated.status(), DeploymentStatus::Live);
    assert_eq!(updated.url, record.url);
    assert_eq!(updated.artifact, record.artifact);
    // The stored artifact is reused, no new generation
    assert_eq!(h.backend.calls(), calls);

    let published = std::fs::read_to_string(h.published_file("widget")).unwrap();
    assert!(published.contains("<meta name=\"verify\" content=\"1\">\n</head>"));
}

#[tokio::test]
async fn test_redeploy_refused_while_pending() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget")]).await;
    h.drain().await;
    let record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);

    h.state.deployments.request_redeploy(&h.principal, &record.id).await.unwrap();
    let err = h
        .state
        .deployments
        .request_redeploy(&h.principal, &record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SitecastError::Conflict(_)));
    assert_eq!(h.queue.pending_len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_redelivered_job_is_not_reprocessed() {
    let h = Harness::new().await;
    submit(&h, vec![product("Widget", "widget")]).await;

    let delivery = h.queue.pop().await.unwrap().unwrap();
    let job = delivery.job.clone();
    let first = h.state.pipeline.execute(&job).await.unwrap();
    h.queue.ack(&delivery).await.unwrap();
    let calls = h.backend.calls();

    // At-least-once: the same job arrives again
    let again = h.state.pipeline.execute(&job).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.status(), DeploymentStatus::Live);
    assert_eq!(h.backend.calls(), calls);
}

#[tokio::test]
async fn test_missing_campaign_creates_no_record() {
    let h = Harness::new().await;
    let job = Job {
        id: "orphan".to_string(),
        kind: JobKind::Deploy,
        campaign_id: "gone".to_string(),
        platform: Platform::CustomDomain,
        credential_id: None,
        template_id: "landing".to_string(),
        row: product("Widget", "widget"),
        slug: "widget".to_string(),
        destination: Destination::default(),
        enqueued_at: Utc::now(),
    };

    let err = h.state.pipeline.execute(&job).await.unwrap_err();
    assert!(matches!(err, SitecastError::NotFound(_)));
    assert!(h.store.get_deployment("orphan").await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleted_credential_fails_job() {
    let h = Harness::new().await;
    let credential = h.netlify_credential(USER, None).await;
    let report = h
        .state
        .campaigns
        .submit(
            &h.principal,
            CampaignSubmission {
                name: "Netlify".to_string(),
                template_id: "landing".to_string(),
                platform: Platform::Netlify,
                credential_id: Some(credential.id.clone()),
                destination: Destination::default(),
                rows: vec![product("Widget", "widget")],
            },
        )
        .await
        .unwrap();

    h.state.credentials.delete(&h.principal, &credential.id).await.unwrap();
    h.drain().await;

    let record = h
        .store
        .list_campaign_deployments(&report.campaign_id)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(record.status(), DeploymentStatus::Failed);
    assert!(record.error().unwrap().contains("credential"));
    assert_eq!(h.queue.failed().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_removes_artifact_and_record() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget")]).await;
    h.drain().await;
    let record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);
    assert!(h.published_file("widget").exists());

    let intruder = Principal::new("intruder");
    assert!(matches!(
        h.state.deployments.delete(&intruder, &record.id).await,
        Err(SitecastError::AuthorizationError(_))
    ));

    h.state.deployments.delete(&h.principal, &record.id).await.unwrap();
    assert!(!h.published_file("widget").exists());
    assert!(matches!(
        h.state.deployments.get(&h.principal, &record.id).await,
        Err(SitecastError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_dashboard_stats() {
    let h = Harness::new().await;
    submit(&h, vec![product("Widget", "widget"), product("boom", "broken")]).await;
    h.drain().await;

    let stats = h.state.deployments.stats(&h.principal).await.unwrap();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.deployments, 2);
    assert_eq!(stats.campaigns, 1);
}

#[tokio::test]
async fn test_delete_failed_redeploy_removes_earlier_publish() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget")]).await;
    h.drain().await;
    let mut record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);
    assert!(h.published_file("widget").exists());

    // A redeploy that failed leaves the first publish online
    record.process(DeploymentEvent::Redeploy).unwrap();
    record
        .mark_failed(&SitecastError::publish(Platform::CustomDomain, "widget", "timed out"))
        .unwrap();
    h.store.put_deployment(&record).await.unwrap();
    assert!(!record.url.is_empty());

    h.state.deployments.delete(&h.principal, &record.id).await.unwrap();
    assert!(!h.published_file("widget").exists());
    assert!(h.store.get_deployment(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pending_record_cannot_be_deleted() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget")]).await;
    h.drain().await;
    let record = h.store.list_campaign_deployments(&campaign_id).await.unwrap().remove(0);
    h.state.deployments.request_redeploy(&h.principal, &record.id).await.unwrap();

    let err = h.state.deployments.delete(&h.principal, &record.id).await.unwrap_err();
    assert!(matches!(err, SitecastError::Conflict(_)));
    assert!(h.published_file("widget").exists());

    h.drain().await;
    let record = h.store.get_deployment(&record.id).await.unwrap().unwrap();
    assert_eq!(record.status(), DeploymentStatus::Live);
}

#[tokio::test]
async fn test_campaign_finishes_after_a_record_is_deleted() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget"), product("boom", "broken")]).await;

    let delivery = h.queue.pop().await.unwrap().unwrap();
    let first = delivery.job.id.clone();
    deployer::handle(0, h.queue.as_ref(), &h.state.pipeline, delivery).await;
    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Processing);

    h.state.deployments.delete(&h.principal, &first).await.unwrap();
    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Processing);
    assert_eq!(campaign.removed, 1);
    assert_eq!(campaign.removed_live, 1);

    assert_eq!(h.drain().await, 1);

    // The deleted record was Live, so the campaign still counts as delivered
    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    let records = h.store.list_campaign_deployments(&campaign_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status(), DeploymentStatus::Failed);
}

#[tokio::test]
async fn test_deleting_the_last_record_settles_the_campaign() {
    let h = Harness::new().await;
    let campaign_id = submit(&h, vec![product("Widget", "widget"), product("Gizmo", "gizmo")]).await;

    let delivery = h.queue.pop().await.unwrap().unwrap();
    deployer::handle(0, h.queue.as_ref(), &h.state.pipeline, delivery).await;
    let delivery = h.queue.pop().await.unwrap().unwrap();
    let second = delivery.job.id.clone();
    deployer::handle(0, h.queue.as_ref(), &h.state.pipeline, delivery).await;

    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);

    h.state.deployments.delete(&h.principal, &second).await.unwrap();
    let campaign = h.store.get_campaign(&campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.removed, 1);
}

/// Memory store whose first write of a Live record fails
struct LiveWriteFails {
    inner: MemoryStore,
    tripped: AtomicBool,
}

#[async_trait]
impl Store for LiveWriteFails {
    async fn put_template(&self, template: &Template) -> Result<(), SitecastError> {
        self.inner.put_template(template).await
    }
    async fn get_template(&self, id: &str) -> Result<Option<Template>, SitecastError> {
        self.inner.get_template(id).await
    }
    async fn list_templates(&self) -> Result<Vec<Template>, SitecastError> {
        self.inner.list_templates().await
    }
    async fn put_credential(&self, credential: &Credential) -> Result<(), SitecastError> {
        self.inner.put_credential(credential).await
    }
    async fn get_credential(&self, id: &str) -> Result<Option<Credential>, SitecastError> {
        self.inner.get_credential(id).await
    }
    async fn list_credentials(&self, owner_id: &str) -> Result<Vec<Credential>, SitecastError> {
        self.inner.list_credentials(owner_id).await
    }
    async fn delete_credential(&self, id: &str) -> Result<bool, SitecastError> {
        self.inner.delete_credential(id).await
    }
    async fn put_campaign(&self, campaign: &Campaign) -> Result<(), SitecastError> {
        self.inner.put_campaign(campaign).await
    }
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, SitecastError> {
        self.inner.get_campaign(id).await
    }
    async fn list_campaigns(&self, owner_id: &str) -> Result<Vec<Campaign>, SitecastError> {
        self.inner.list_campaigns(owner_id).await
    }
    async fn put_deployment(&self, deployment: &Deployment) -> Result<(), SitecastError> {
        if deployment.status() == DeploymentStatus::Live && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(SitecastError::StorageError("disk full".to_string()));
        }
        self.inner.put_deployment(deployment).await
    }
    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, SitecastError> {
        self.inner.get_deployment(id).await
    }
    async fn list_deployments(&self, owner_id: &str) -> Result<Vec<Deployment>, SitecastError> {
        self.inner.list_deployments(owner_id).await
    }
    async fn list_campaign_deployments(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<Deployment>, SitecastError> {
        self.inner.list_campaign_deployments(campaign_id).await
    }
    async fn delete_deployment(&self, id: &str) -> Result<bool, SitecastError> {
        self.inner.delete_deployment(id).await
    }
}

#[tokio::test]
async fn test_failed_live_write_leaves_record_failed_with_url() {
    let h = Harness::new().await;
    let store = Arc::new(LiveWriteFails {
        inner: MemoryStore::new(),
        tripped: AtomicBool::new(false),
    });
    store.put_template(&crate::support::template()).await.unwrap();
    let pipeline = Pipeline::new(
        store.clone(),
        h.vault.clone(),
        Generator::new(h.backend.clone()),
        Arc::new(ProviderFactory::new(&h.options.providers).unwrap()),
        h.options.fsm_settings.clone(),
    );

    // Campaign goes to the failing store, the job comes off the harness queue
    let report = sitecast::services::campaigns::CampaignService::new(store.clone(), h.queue.clone())
        .submit(&h.principal, h.custom_domain(vec![product("Widget", "widget")]))
        .await
        .unwrap();
    let delivery = h.queue.pop().await.unwrap().unwrap();

    let err = pipeline.execute(&delivery.job).await.unwrap_err();
    assert!(matches!(err, SitecastError::StorageError(_)));

    let record = store.get_deployment(&delivery.job.id).await.unwrap().unwrap();
    assert_eq!(record.status(), DeploymentStatus::Failed);
    assert_eq!(record.url, "https://example.com/widget/");
    assert!(record.error().unwrap().contains("disk full"));
    assert!(h.published_file("widget").exists());

    let records = store.list_campaign_deployments(&report.campaign_id).await.unwrap();
    assert_eq!(records.len(), 1);
}
