//! Campaign orchestration: validate a batch, fan it out into jobs, roll up status

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::authn::principal::Principal;
use crate::deploy::fsm::DeploymentStatus;
use crate::errors::SitecastError;
use crate::models::campaign::{Campaign, CampaignStatus, Destination};
use crate::models::credential::Platform;
use crate::models::job::{Job, JobKind};
use crate::models::template::Template;
use crate::models::{pick, slugify, RowData, SLUG_KEYS};
use crate::queue::JobQueue;
use crate::store::Store;
use crate::utils::generate_uuid;

/// A batch as submitted by its owner
#[derive(Debug, Clone)]
pub struct CampaignSubmission {
    pub name: String,
    pub template_id: String,
    pub platform: Platform,
    pub credential_id: Option<String>,
    pub destination: Destination,
    pub rows: Vec<RowData>,
}

/// Why a row did not produce a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyRow,
    MissingFields,
    MissingSlug,
    InvalidSlug,
    DuplicateSlug,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::EmptyRow => "empty_row",
            SkipReason::MissingFields => "missing_fields",
            SkipReason::MissingSlug => "missing_slug",
            SkipReason::InvalidSlug => "invalid_slug",
            SkipReason::DuplicateSlug => "duplicate_slug",
        }
    }
}

/// A skipped row, by zero-based position in the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub index: usize,
    pub reason: SkipReason,
    pub missing_fields: Vec<String>,
}

/// Outcome of a submission
#[derive(Debug, Clone)]
pub struct SubmitReport {
    pub campaign_id: String,
    pub total: usize,
    pub queued: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Campaign with per-status record counts
#[derive(Debug, Clone)]
pub struct CampaignOverview {
    pub campaign: Campaign,
    pub live: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Classify one row. Returns the slug for a valid row.
pub fn check_row(
    template: &Template,
    row: &RowData,
    seen: &HashSet<String>,
) -> Result<String, (SkipReason, Vec<String>)> {
    if row.values().all(|v| v.trim().is_empty()) {
        return Err((SkipReason::EmptyRow, Vec::new()));
    }

    let missing = template.missing_fields(row);
    if !missing.is_empty() {
        return Err((SkipReason::MissingFields, missing));
    }

    let raw = pick(row, &SLUG_KEYS).ok_or((SkipReason::MissingSlug, Vec::new()))?;
    let slug = slugify(raw).ok_or((SkipReason::InvalidSlug, Vec::new()))?;

    if seen.contains(&slug) {
        return Err((SkipReason::DuplicateSlug, Vec::new()));
    }
    Ok(slug)
}

/// Batch orchestrator
pub struct CampaignService {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
}

impl CampaignService {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// Validate the batch as a whole, then enqueue one job per valid row
    pub async fn submit(
        &self,
        principal: &Principal,
        submission: CampaignSubmission,
    ) -> Result<SubmitReport, SitecastError> {
        let template = self.validate(principal, &submission).await?;

        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        let mut accepted = Vec::new();
        for (index, row) in submission.rows.iter().enumerate() {
            match check_row(&template, row, &seen) {
                Ok(slug) => {
                    seen.insert(slug.clone());
                    accepted.push((slug, row));
                }
                Err((reason, missing_fields)) => {
                    debug!(index, reason = reason.as_str(), "Skipping row");
                    skipped.push(SkippedRow {
                        index,
                        reason,
                        missing_fields,
                    });
                }
            }
        }

        let mut campaign = Campaign {
            id: generate_uuid(),
            owner_id: principal.user_id.clone(),
            name: submission.name.trim().to_string(),
            platform: submission.platform,
            credential_id: submission.credential_id.clone(),
            template_id: template.id.clone(),
            destination: submission.destination.clone(),
            status: if accepted.is_empty() {
                CampaignStatus::Failed
            } else {
                CampaignStatus::Processing
            },
            queued: accepted.len(),
            removed: 0,
            removed_live: 0,
            created_at: Utc::now(),
        };
        self.store.put_campaign(&campaign).await?;

        let mut pushed = 0;
        for (slug, row) in accepted {
            let job = Job {
                id: generate_uuid(),
                kind: JobKind::Deploy,
                campaign_id: campaign.id.clone(),
                platform: campaign.platform,
                credential_id: campaign.credential_id.clone(),
                template_id: campaign.template_id.clone(),
                row: row.clone(),
                slug,
                destination: campaign.destination.clone(),
                enqueued_at: Utc::now(),
            };
            if let Err(e) = self.queue.push(job).await {
                self.settle_partial(&mut campaign, pushed).await;
                return Err(e);
            }
            pushed += 1;
        }

        info!(
            campaign_id = %campaign.id,
            total = submission.rows.len(),
            queued = campaign.queued,
            skipped = skipped.len(),
            "Campaign submitted"
        );

        Ok(SubmitReport {
            campaign_id: campaign.id,
            total: submission.rows.len(),
            queued: campaign.queued,
            skipped,
        })
    }

    /// Shrink `queued` to the jobs that actually reached the queue after a
    /// failed push, so the campaign can still finish
    async fn settle_partial(&self, campaign: &mut Campaign, pushed: usize) {
        warn!(
            campaign_id = %campaign.id,
            pushed,
            queued = campaign.queued,
            "Enqueue failed part way through the batch"
        );
        campaign.queued = pushed;
        if pushed == 0 {
            campaign.status = CampaignStatus::Failed;
        }
        if let Err(e) = self.store.put_campaign(campaign).await {
            error!(campaign_id = %campaign.id, "Could not save partial campaign: {}", e);
            return;
        }
        if let Err(e) = rollup(self.store.as_ref(), &campaign.id).await {
            warn!(campaign_id = %campaign.id, "Campaign rollup failed: {}", e);
        }
    }

    /// Whole-batch checks; nothing is written when any of them fails
    async fn validate(
        &self,
        principal: &Principal,
        submission: &CampaignSubmission,
    ) -> Result<Template, SitecastError> {
        if submission.name.trim().is_empty() {
            return Err(SitecastError::ValidationError(
                "campaign name is required".to_string(),
            ));
        }
        if submission.rows.is_empty() {
            return Err(SitecastError::ValidationError(
                "at least one row is required".to_string(),
            ));
        }

        let template = self
            .store
            .get_template(&submission.template_id)
            .await?
            .ok_or_else(|| {
                SitecastError::NotFound(format!("template {}", submission.template_id))
            })?;

        let platform = submission.platform;
        if platform.requires_credential() {
            let credential_id = submission
                .credential_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    SitecastError::ValidationError(format!("{} requires a credential", platform))
                })?;
            let credential = self
                .store
                .get_credential(credential_id)
                .await?
                .ok_or_else(|| SitecastError::NotFound(format!("credential {}", credential_id)))?;
            principal.ensure_owner(&credential.owner_id, "credential")?;
            if credential.platform != platform {
                return Err(SitecastError::ValidationError(format!(
                    "credential is for {}, campaign targets {}",
                    credential.platform, platform
                )));
            }
        } else if submission
            .destination
            .domain
            .as_deref()
            .map(|d| d.trim().is_empty())
            .unwrap_or(true)
        {
            return Err(SitecastError::ValidationError(
                "custom_domain hosting requires a domain".to_string(),
            ));
        }

        if platform.is_s3_compatible()
            && submission
                .destination
                .bucket
                .as_deref()
                .map(|b| b.trim().is_empty())
                .unwrap_or(true)
        {
            return Err(SitecastError::ValidationError(format!(
                "{} requires a bucket",
                platform
            )));
        }

        Ok(template)
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<CampaignOverview>, SitecastError> {
        let campaigns = self.store.list_campaigns(&principal.user_id).await?;
        let mut out = Vec::with_capacity(campaigns.len());
        for campaign in campaigns {
            out.push(self.overview(campaign).await?);
        }
        Ok(out)
    }

    pub async fn get(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<CampaignOverview, SitecastError> {
        let campaign = self
            .store
            .get_campaign(id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("campaign {}", id)))?;
        principal.ensure_owner(&campaign.owner_id, "campaign")?;
        self.overview(campaign).await
    }

    pub async fn templates(&self) -> Result<Vec<Template>, SitecastError> {
        self.store.list_templates().await
    }

    async fn overview(&self, campaign: Campaign) -> Result<CampaignOverview, SitecastError> {
        let records = self.store.list_campaign_deployments(&campaign.id).await?;
        let count = |status| records.iter().filter(|r| r.status() == status).count();
        Ok(CampaignOverview {
            live: count(DeploymentStatus::Live),
            failed: count(DeploymentStatus::Failed),
            pending: count(DeploymentStatus::Pending),
            campaign,
        })
    }
}

/// Recompute a campaign's aggregate status from its records.
///
/// Once every queued job has a terminal record (deleted records included)
/// the campaign is `completed` when at least one record was Live, `failed`
/// otherwise. Only terminal statuses are ever written here.
pub async fn rollup(
    store: &dyn Store,
    campaign_id: &str,
) -> Result<Option<CampaignStatus>, SitecastError> {
    let Some(mut campaign) = store.get_campaign(campaign_id).await? else {
        warn!(campaign_id, "Rollup for unknown campaign");
        return Ok(None);
    };

    let records = store.list_campaign_deployments(campaign_id).await?;
    let terminal = records.iter().filter(|r| r.status().is_terminal()).count();
    if terminal + campaign.removed < campaign.queued {
        return Ok(Some(campaign.status));
    }

    let any_live = campaign.removed_live > 0
        || records.iter().any(|r| r.status() == DeploymentStatus::Live);
    let status = if any_live {
        CampaignStatus::Completed
    } else {
        CampaignStatus::Failed
    };

    if campaign.status != status {
        info!(campaign_id, status = status.as_str(), "Campaign finished");
        campaign.status = status;
        store.put_campaign(&campaign).await?;
    }
    Ok(Some(status))
}
