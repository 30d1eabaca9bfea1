//! Campaign models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::credential::Platform;

/// Campaign aggregate status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Processing,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Processing => "processing",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }
}

/// Where artifacts land inside a backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Bucket for S3-compatible platforms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Optional folder prefix inside the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<String>,

    /// Domain for custom-domain hosting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Destination {
    /// Object key `{root_folder/}{slug}/index.html`
    pub fn object_key(&self, slug: &str) -> String {
        match self
            .root_folder
            .as_deref()
            .map(|r| r.trim().trim_matches('/'))
            .filter(|r| !r.is_empty())
        {
            Some(root) => format!("{}/{}/index.html", root, slug),
            None => format!("{}/index.html", slug),
        }
    }
}

/// A submitted batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub platform: Platform,

    /// Absent only for custom-domain hosting
    #[serde(default)]
    pub credential_id: Option<String>,

    pub template_id: String,

    #[serde(default)]
    pub destination: Destination,

    pub status: CampaignStatus,

    /// Number of jobs enqueued at submission
    pub queued: usize,

    /// Terminal records deleted by their owner, and how many of them were Live
    #[serde(default)]
    pub removed: usize,
    #[serde(default)]
    pub removed_live: usize,

    pub created_at: DateTime<Utc>,
}
