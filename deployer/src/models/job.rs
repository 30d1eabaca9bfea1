//! Queue job models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::campaign::Destination;
use crate::models::credential::Platform;
use crate::models::RowData;

/// What a job asks the worker to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Generate and publish a new artifact from a row
    Deploy,

    /// Republish an existing record's stored artifact
    Redeploy { deployment_id: String },
}

/// A unit of queued work. References ids only, never secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub campaign_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub credential_id: Option<String>,
    pub template_id: String,
    #[serde(default)]
    pub row: RowData,
    pub slug: String,
    #[serde(default)]
    pub destination: Destination,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    /// Id of the deployment record this job writes
    pub fn deployment_id(&self) -> &str {
        match &self.kind {
            JobKind::Deploy => &self.id,
            JobKind::Redeploy { deployment_id } => deployment_id,
        }
    }
}
