//! Deployment worker: drains the job queue through the pipeline

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::queue::{Delivery, JobQueue};
use crate::services::campaigns::rollup;
use crate::workers::pipeline::Pipeline;

/// Deployer worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Worker index, for logs
    pub worker_id: usize,

    /// Idle polling interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            worker_id: 0,
            interval: Duration::from_millis(500),
        }
    }
}

/// Run one deployer worker until shutdown.
///
/// Shutdown is observed between jobs only; a claimed job always runs to a
/// terminal outcome.
pub async fn run<S, F>(
    options: &Options,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<Pipeline>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(worker = options.worker_id, "Deployer worker starting...");

    loop {
        if (&mut shutdown_signal).now_or_never().is_some() {
            break;
        }

        let delivery = match queue.pop().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                tokio::select! {
                    _ = &mut shutdown_signal => break,
                    _ = sleep_fn(options.interval) => continue,
                }
            }
            Err(e) => {
                error!(worker = options.worker_id, "Failed to poll the queue: {}", e);
                tokio::select! {
                    _ = &mut shutdown_signal => break,
                    _ = sleep_fn(options.interval) => continue,
                }
            }
        };

        handle(options.worker_id, queue.as_ref(), &pipeline, delivery).await;
    }

    info!(worker = options.worker_id, "Deployer worker shutting down...");
}

/// Process one delivery and settle it with the queue
pub async fn handle(worker_id: usize, queue: &dyn JobQueue, pipeline: &Pipeline, delivery: Delivery) {
    let job = &delivery.job;
    debug!(worker = worker_id, job_id = %job.id, slug = %job.slug, "Processing job");

    let settled = match pipeline.execute(job).await {
        Ok(_) => queue.ack(&delivery).await,
        Err(e) => {
            error!(worker = worker_id, job_id = %job.id, "Job failed: {}", e);
            queue.fail(&delivery, &e.to_string()).await
        }
    };
    if let Err(e) = settled {
        warn!(worker = worker_id, job_id = %job.id, "Could not settle delivery: {}", e);
    }

    if let Err(e) = rollup(pipeline.store().as_ref(), &job.campaign_id).await {
        warn!(campaign_id = %job.campaign_id, "Campaign rollup failed: {}", e);
    }
}
