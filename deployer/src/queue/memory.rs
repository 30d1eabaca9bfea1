//! In-memory queue for tests and ephemeral runs

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::SitecastError;
use crate::models::job::Job;
use crate::queue::{Delivery, FailedJob, JobQueue};

#[derive(Default)]
struct State {
    pending: VecDeque<Job>,
    inflight: HashMap<String, Job>,
    failed: Vec<FailedJob>,
}

/// Non-durable queue
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of claimed, unacknowledged deliveries
    pub fn inflight_len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.inflight.len()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn push(&self, job: Job) -> Result<(), SitecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.pending.push_back(job);
        Ok(())
    }

    async fn pop(&self) -> Result<Option<Delivery>, SitecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(job) = state.pending.pop_front() else {
            return Ok(None);
        };
        let receipt = uuid::Uuid::new_v4().to_string();
        state.inflight.insert(receipt.clone(), job.clone());
        Ok(Some(Delivery { job, receipt }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), SitecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .inflight
            .remove(&delivery.receipt)
            .map(|_| ())
            .ok_or_else(|| SitecastError::QueueError(format!("unknown delivery {}", delivery.receipt)))
    }

    async fn fail(&self, delivery: &Delivery, reason: &str) -> Result<(), SitecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let job = state
            .inflight
            .remove(&delivery.receipt)
            .ok_or_else(|| SitecastError::QueueError(format!("unknown delivery {}", delivery.receipt)))?;
        state.failed.push(FailedJob {
            job,
            reason: reason.to_string(),
            failed_at: Utc::now(),
        });
        Ok(())
    }

    async fn recover(&self) -> Result<usize, SitecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut jobs: Vec<Job> = state.inflight.drain().map(|(_, job)| job).collect();
        jobs.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        let moved = jobs.len();
        for job in jobs.into_iter().rev() {
            state.pending.push_front(job);
        }
        Ok(moved)
    }

    async fn pending_len(&self) -> Result<usize, SitecastError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.pending.len())
    }

    async fn failed(&self) -> Result<Vec<FailedJob>, SitecastError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.failed.clone())
    }
}
