//! Sitecast API models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Campaign submission: one row per target site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCampaignRequest {
    pub name: String,
    pub template_id: String,
    pub platform: String,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    pub rows: Vec<BTreeMap<String, serde_json::Value>>,
}

/// A row that did not produce a job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedRow {
    pub index: usize,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

/// Campaign submission report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCampaignResponse {
    pub campaign_id: String,
    pub total: usize,
    pub queued: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Campaign summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    pub platform: String,
    pub status: String,
    pub queued: usize,
    pub live: usize,
    pub failed: usize,
    pub pending: usize,
    pub created_at: DateTime<Utc>,
}

/// Campaign list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignSummary>,
    pub total: usize,
}

/// Template summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub required_fields: Vec<String>,
    pub strategy: String,
}

/// Template list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
    pub total: usize,
}

/// Deployment record as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub id: String,
    pub campaign_id: String,
    pub product_name: String,
    pub slug: String,
    pub platform: String,
    pub url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub header_snippet: String,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deployment list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentListResponse {
    pub deployments: Vec<DeploymentInfo>,
    pub total: usize,
}

/// Header snippet update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHeaderRequest {
    pub header_snippet: String,
    /// Republish right away with the new snippet
    #[serde(default = "default_true")]
    pub redeploy: bool,
}

fn default_true() -> bool {
    true
}

/// Redeploy / delete acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentActionResponse {
    pub success: bool,
    pub deployment_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Credential creation, plaintext secrets (sealed on write)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCredentialRequest {
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub cdn_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

/// Credential without secret material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub id: String,
    pub name: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Credential list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialListResponse {
    pub credentials: Vec<CredentialSummary>,
    pub total: usize,
}

/// Prefix discovery query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub bucket: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Discovery listing (buckets, sites, domains or prefixes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub items: Vec<String>,
    pub total: usize,
}

/// Dashboard statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_live: usize,
    pub total_failed: usize,
    pub total_pending: usize,
    pub total_deployments: usize,
    pub total_campaigns: usize,
}
