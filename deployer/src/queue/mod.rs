//! Job queue: at-least-once delivery of deploy jobs to the worker pool

pub mod memory;
pub mod spool;

use async_trait::async_trait;

use crate::errors::SitecastError;
use crate::models::job::Job;

/// A claimed job. Only the claiming consumer sees it until ack/fail/recover.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: Job,
    pub(crate) receipt: String,
}

impl Delivery {
    /// Opaque claim handle
    pub fn receipt(&self) -> &str {
        &self.receipt
    }
}

/// A job moved to the failure channel
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FailedJob {
    pub job: Job,
    pub reason: String,
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job
    async fn push(&self, job: Job) -> Result<(), SitecastError>;

    /// Claim the oldest pending job, `None` when the queue is empty
    async fn pop(&self) -> Result<Option<Delivery>, SitecastError>;

    /// Acknowledge a finished delivery
    async fn ack(&self, delivery: &Delivery) -> Result<(), SitecastError>;

    /// Move a delivery to the failure channel
    async fn fail(&self, delivery: &Delivery, reason: &str) -> Result<(), SitecastError>;

    /// Return in-flight deliveries to pending. Returns how many were moved.
    async fn recover(&self) -> Result<usize, SitecastError>;

    /// Number of pending jobs
    async fn pending_len(&self) -> Result<usize, SitecastError>;

    /// Jobs in the failure channel
    async fn failed(&self) -> Result<Vec<FailedJob>, SitecastError>;
}
