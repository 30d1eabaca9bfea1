//! Campaign submission tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use sitecast::authn::principal::Principal;
use sitecast::errors::SitecastError;
use sitecast::models::campaign::{CampaignStatus, Destination};
use sitecast::models::credential::Platform;
use sitecast::models::job::Job;
use sitecast::queue::memory::MemoryQueue;
use sitecast::queue::{Delivery, FailedJob, JobQueue};
use sitecast::services::campaigns::{CampaignService, CampaignSubmission, SkipReason};
use sitecast::store::Store;
use sitecast::workers::deployer;

use crate::support::{product, row, Harness, USER};

#[tokio::test]
async fn test_one_job_per_valid_row() {
    let h = Harness::new().await;
    let submission = h.custom_domain(vec![
        product("Widget", "widget"),
        row(&[("name", "Gadget"), ("sub_domain", "gadget")]),
        product("Gizmo", "gizmo"),
    ]);

    let report = h.state.campaigns.submit(&h.principal, submission).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.queued, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].reason, SkipReason::MissingFields);
    assert_eq!(report.skipped[0].missing_fields, vec!["price".to_string()]);
    assert_eq!(h.queue.pending_len().await.unwrap(), 2);

    let campaign = h.store.get_campaign(&report.campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Processing);
    assert_eq!(campaign.queued, 2);
    assert_eq!(campaign.owner_id, USER);
}

#[tokio::test]
async fn test_duplicate_and_invalid_slugs_skipped() {
    let h = Harness::new().await;
    let submission = h.custom_domain(vec![
        product("Widget", "Shop"),
        product("Widget 2", "shop"),
        product("Widget 3", "***"),
        product("Widget 4", ""),
        row(&[("name", ""), ("price", "")]),
    ]);

    let report = h.state.campaigns.submit(&h.principal, submission).await.unwrap();
    let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
    assert_eq!(report.queued, 1);
    assert_eq!(
        reasons,
        vec![
            SkipReason::DuplicateSlug,
            SkipReason::InvalidSlug,
            SkipReason::MissingSlug,
            SkipReason::EmptyRow,
        ]
    );
}

#[tokio::test]
async fn test_all_rows_skipped_fails_campaign() {
    let h = Harness::new().await;
    let submission = h.custom_domain(vec![row(&[("name", "x")])]);

    let report = h.state.campaigns.submit(&h.principal, submission).await.unwrap();
    assert_eq!(report.queued, 0);

    let campaign = h.store.get_campaign(&report.campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Failed);
    assert_eq!(h.queue.pending_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_platform_mismatch_rejects_batch() {
    let h = Harness::new().await;
    let credential = h.netlify_credential(USER, None).await;

    let submission = CampaignSubmission {
        name: "S3 batch".to_string(),
        template_id: "landing".to_string(),
        platform: Platform::AwsS3,
        credential_id: Some(credential.id),
        destination: Destination {
            bucket: Some("sites".to_string()),
            ..Default::default()
        },
        rows: vec![product("Widget", "widget")],
    };

    let err = h.state.campaigns.submit(&h.principal, submission).await.unwrap_err();
    assert!(matches!(err, SitecastError::ValidationError(_)));
    assert_eq!(h.queue.pending_len().await.unwrap(), 0);
    assert!(h.store.list_campaigns(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_credential_rejected() {
    let h = Harness::new().await;
    let credential = h.netlify_credential("someone-else", None).await;

    let submission = CampaignSubmission {
        name: "Netlify batch".to_string(),
        template_id: "landing".to_string(),
        platform: Platform::Netlify,
        credential_id: Some(credential.id),
        destination: Destination::default(),
        rows: vec![product("Widget", "widget")],
    };

    let err = h.state.campaigns.submit(&h.principal, submission).await.unwrap_err();
    assert!(matches!(err, SitecastError::AuthorizationError(_)));
    assert_eq!(h.queue.pending_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_batch_level_validation() {
    let h = Harness::new().await;

    let mut no_domain = h.custom_domain(vec![product("Widget", "widget")]);
    no_domain.destination.domain = None;
    assert!(matches!(
        h.state.campaigns.submit(&h.principal, no_domain).await,
        Err(SitecastError::ValidationError(_))
    ));

    let empty = h.custom_domain(vec![]);
    assert!(matches!(
        h.state.campaigns.submit(&h.principal, empty).await,
        Err(SitecastError::ValidationError(_))
    ));

    let mut unnamed = h.custom_domain(vec![product("Widget", "widget")]);
    unnamed.name = "  ".to_string();
    assert!(matches!(
        h.state.campaigns.submit(&h.principal, unnamed).await,
        Err(SitecastError::ValidationError(_))
    ));

    let mut unknown = h.custom_domain(vec![product("Widget", "widget")]);
    unknown.template_id = "missing".to_string();
    assert!(matches!(
        h.state.campaigns.submit(&h.principal, unknown).await,
        Err(SitecastError::NotFound(_))
    ));

    let no_credential = CampaignSubmission {
        name: "Netlify".to_string(),
        template_id: "landing".to_string(),
        platform: Platform::Netlify,
        credential_id: None,
        destination: Destination::default(),
        rows: vec![product("Widget", "widget")],
    };
    assert!(matches!(
        h.state.campaigns.submit(&h.principal, no_credential).await,
        Err(SitecastError::ValidationError(_))
    ));

    assert_eq!(h.queue.pending_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_campaign_visible_to_owner_only() {
    let h = Harness::new().await;
    let report = h
        .state
        .campaigns
        .submit(&h.principal, h.custom_domain(vec![product("Widget", "widget")]))
        .await
        .unwrap();

    let overview = h.state.campaigns.get(&h.principal, &report.campaign_id).await.unwrap();
    assert_eq!(overview.campaign.name, "Spring launch");

    let other = Principal::new("intruder");
    assert!(matches!(
        h.state.campaigns.get(&other, &report.campaign_id).await,
        Err(SitecastError::AuthorizationError(_))
    ));
    assert!(h.state.campaigns.list(&other).await.unwrap().is_empty());
}

/// Memory queue that starts refusing pushes from the `fail_from`th one on
struct FlakyQueue {
    inner: MemoryQueue,
    fail_from: usize,
    pushes: AtomicUsize,
}

impl FlakyQueue {
    fn new(fail_from: usize) -> Self {
        Self {
            inner: MemoryQueue::new(),
            fail_from,
            pushes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobQueue for FlakyQueue {
    async fn push(&self, job: Job) -> Result<(), SitecastError> {
        if self.pushes.fetch_add(1, Ordering::SeqCst) + 1 >= self.fail_from {
            return Err(SitecastError::QueueError("spool unavailable".to_string()));
        }
        self.inner.push(job).await
    }
    async fn pop(&self) -> Result<Option<Delivery>, SitecastError> {
        self.inner.pop().await
    }
    async fn ack(&self, delivery: &Delivery) -> Result<(), SitecastError> {
        self.inner.ack(delivery).await
    }
    async fn fail(&self, delivery: &Delivery, reason: &str) -> Result<(), SitecastError> {
        self.inner.fail(delivery, reason).await
    }
    async fn recover(&self) -> Result<usize, SitecastError> {
        self.inner.recover().await
    }
    async fn pending_len(&self) -> Result<usize, SitecastError> {
        self.inner.pending_len().await
    }
    async fn failed(&self) -> Result<Vec<FailedJob>, SitecastError> {
        self.inner.failed().await
    }
}

#[tokio::test]
async fn test_enqueue_failure_midway_shrinks_campaign() {
    let h = Harness::new().await;
    let queue = Arc::new(FlakyQueue::new(2));
    let campaigns = CampaignService::new(h.store.clone(), queue.clone());
    let submission = h.custom_domain(vec![
        product("Widget", "widget"),
        product("Gizmo", "gizmo"),
        product("Gadget", "gadget"),
    ]);

    let err = campaigns.submit(&h.principal, submission).await.unwrap_err();
    assert!(matches!(err, SitecastError::QueueError(_)));

    let stored = h.store.list_campaigns(USER).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].queued, 1);
    assert_eq!(stored[0].status, CampaignStatus::Processing);
    assert_eq!(queue.pending_len().await.unwrap(), 1);

    // The one job that made it in is enough to finish the campaign
    let delivery = queue.pop().await.unwrap().unwrap();
    deployer::handle(0, queue.as_ref(), &h.state.pipeline, delivery).await;
    let campaign = h.store.get_campaign(&stored[0].id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn test_enqueue_failure_on_first_job_fails_campaign() {
    let h = Harness::new().await;
    let queue = Arc::new(FlakyQueue::new(1));
    let campaigns = CampaignService::new(h.store.clone(), queue.clone());

    let submission = h.custom_domain(vec![product("Widget", "widget")]);
    assert!(campaigns.submit(&h.principal, submission).await.is_err());

    let stored = h.store.list_campaigns(USER).await.unwrap();
    assert_eq!(stored[0].queued, 0);
    assert_eq!(stored[0].status, CampaignStatus::Failed);
}
