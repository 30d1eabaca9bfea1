//! Durable file-spool queue.
//!
//! One JSON document per job, moved between `pending/`, `inflight/` and
//! `failed/`. Claiming is an atomic rename, so a delivery is handed to exactly
//! one consumer. File names start with a zero-padded timestamp and sequence
//! number, which keeps listing order FIFO.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::errors::SitecastError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::job::Job;
use crate::queue::{Delivery, FailedJob, JobQueue};

/// File-backed queue rooted at one directory
pub struct SpoolQueue {
    pending: Dir,
    inflight: Dir,
    failed: Dir,
    seq: AtomicU64,
}

impl SpoolQueue {
    /// Open (and create) a spool under `root`
    pub async fn open(root: Dir) -> Result<Self, SitecastError> {
        let queue = Self {
            pending: root.subdir("pending"),
            inflight: root.subdir("inflight"),
            failed: root.subdir("failed"),
            seq: AtomicU64::new(0),
        };
        queue.pending.create().await?;
        queue.inflight.create().await?;
        queue.failed.create().await?;
        Ok(queue)
    }

    fn entry_name(&self, job: &Job) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        format!(
            "{:016}-{:08}-{}.json",
            Utc::now().timestamp_micros().max(0),
            seq,
            job.id
        )
    }

    async fn entries(dir: &Dir) -> Result<Vec<File>, SitecastError> {
        Ok(dir
            .list_files()
            .await?
            .into_iter()
            .filter(|f| f.path().extension().map(|e| e == "json").unwrap_or(false))
            .collect())
    }

    fn name_of(file: &File) -> Option<String> {
        file.path()
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }

    fn check_receipt(receipt: &str) -> Result<(), SitecastError> {
        if receipt.is_empty() || receipt.contains(['/', '\\']) || receipt.starts_with('.') {
            return Err(SitecastError::QueueError(format!("invalid receipt '{}'", receipt)));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for SpoolQueue {
    async fn push(&self, job: Job) -> Result<(), SitecastError> {
        let name = self.entry_name(&job);
        self.pending.file(&name).write_json(&job).await?;
        debug!("Spooled job {} as {}", job.id, name);
        Ok(())
    }

    async fn pop(&self) -> Result<Option<Delivery>, SitecastError> {
        for entry in Self::entries(&self.pending).await? {
            let Some(name) = Self::name_of(&entry) else {
                continue;
            };
            let claimed = self.inflight.file(&name);

            match entry.rename_to(&claimed).await {
                Ok(()) => {}
                // Claimed by another consumer in the meantime
                Err(SitecastError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    continue
                }
                Err(e) => return Err(e),
            }

            match claimed.read_json::<Job>().await {
                Ok(job) => {
                    return Ok(Some(Delivery {
                        job,
                        receipt: name,
                    }))
                }
                Err(e) => {
                    error!("Unreadable job {}: {}, moving to failed", name, e);
                    claimed.rename_to(&self.failed.file(&name)).await?;
                }
            }
        }
        Ok(None)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), SitecastError> {
        Self::check_receipt(&delivery.receipt)?;
        let file = self.inflight.file(&delivery.receipt);
        if !file.exists().await {
            return Err(SitecastError::QueueError(format!(
                "unknown delivery {}",
                delivery.receipt
            )));
        }
        file.delete().await
    }

    async fn fail(&self, delivery: &Delivery, reason: &str) -> Result<(), SitecastError> {
        Self::check_receipt(&delivery.receipt)?;
        let file = self.inflight.file(&delivery.receipt);
        if !file.exists().await {
            return Err(SitecastError::QueueError(format!(
                "unknown delivery {}",
                delivery.receipt
            )));
        }

        let record = FailedJob {
            job: delivery.job.clone(),
            reason: reason.to_string(),
            failed_at: Utc::now(),
        };
        self.failed.file(&delivery.receipt).write_json(&record).await?;
        file.delete().await
    }

    async fn recover(&self) -> Result<usize, SitecastError> {
        let mut moved = 0;
        for entry in Self::entries(&self.inflight).await? {
            let Some(name) = Self::name_of(&entry) else {
                continue;
            };
            match entry.rename_to(&self.pending.file(&name)).await {
                Ok(()) => moved += 1,
                Err(e) => warn!("Could not requeue {}: {}", name, e),
            }
        }
        if moved > 0 {
            info!("Recovered {} in-flight job(s)", moved);
        }
        Ok(moved)
    }

    async fn pending_len(&self) -> Result<usize, SitecastError> {
        Ok(Self::entries(&self.pending).await?.len())
    }

    async fn failed(&self) -> Result<Vec<FailedJob>, SitecastError> {
        let mut out = Vec::new();
        for entry in Self::entries(&self.failed).await? {
            match entry.read_json::<FailedJob>().await {
                Ok(record) => out.push(record),
                Err(e) => debug!("Skipping unreadable failed entry {}: {}", entry.path().display(), e),
            }
        }
        Ok(out)
    }
}
