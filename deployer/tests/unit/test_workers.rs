//! Worker pool tests: several deployers sharing one queue

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;

use sitecast::app::run::run_with_state;
use sitecast::app::state::AppState;
use sitecast::deploy::fsm::DeploymentStatus;
use sitecast::models::campaign::CampaignStatus;
use sitecast::queue::JobQueue;
use sitecast::store::Store;
use sitecast::workers::deployer;

use crate::support::{product, Harness};

async fn wait_until_settled(h: &Harness, campaign_id: &str, expected: usize) {
    timeout(Duration::from_secs(10), async {
        loop {
            let records = h.store.list_campaign_deployments(campaign_id).await.unwrap();
            if records.len() == expected && records.iter().all(|r| r.status().is_terminal()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("jobs did not settle in time");
}

async fn assert_settled_independently(h: &Harness, campaign_id: &str) {
    let records = h.store.list_campaign_deployments(campaign_id).await.unwrap();
    let broken = records.iter().find(|r| r.slug == "broken").unwrap();
    let widget = records.iter().find(|r| r.slug == "widget").unwrap();
    assert_eq!(broken.status(), DeploymentStatus::Failed);
    assert!(broken.error().unwrap().contains("backend exploded"));
    assert_eq!(widget.status(), DeploymentStatus::Live);
    assert!(widget.error().is_none());
    assert!(h.published_file("widget").exists());
    assert!(!h.published_file("broken").exists());

    assert_eq!(h.queue.inflight_len(), 0);
    assert_eq!(h.queue.pending_len().await.unwrap(), 0);
    let failed = h.queue.failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job.slug, "broken");

    let campaign = h.store.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_workers_share_queue_and_settle_each_job() {
    let h = Harness::new().await;
    let report = h
        .state
        .campaigns
        .submit(
            &h.principal,
            h.custom_domain(vec![product("boom", "broken"), product("Widget", "widget")]),
        )
        .await
        .unwrap();

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut handles = Vec::new();
    for worker_id in 0..2 {
        let options = deployer::Options {
            worker_id,
            interval: Duration::from_millis(10),
        };
        let queue: Arc<dyn JobQueue> = h.queue.clone();
        let pipeline = h.state.pipeline.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            deployer::run(
                &options,
                queue,
                pipeline,
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            )
            .await;
        }));
    }

    wait_until_settled(&h, &report.campaign_id, 2).await;
    shutdown_tx.send(()).unwrap();
    for handle in handles {
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    assert_settled_independently(&h, &report.campaign_id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_app_runs_worker_pool_until_shutdown() {
    let h = Harness::new().await;
    let mut options = h.options.clone();
    options.enable_server = false;
    options.workers.concurrency = 2;
    options.workers.poll_interval = Duration::from_millis(10);
    options.lifecycle.max_shutdown_delay = Duration::from_secs(30);

    let state = AppState::from_parts(
        h.store.clone(),
        h.queue.clone(),
        h.vault.clone(),
        h.backend.clone(),
        h.keys.clone(),
        &options,
    )
    .unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = tokio::spawn(run_with_state(
        "test".to_string(),
        options,
        Arc::new(state),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let report = h
        .state
        .campaigns
        .submit(
            &h.principal,
            h.custom_domain(vec![product("boom", "broken"), product("Widget", "widget")]),
        )
        .await
        .unwrap();

    wait_until_settled(&h, &report.campaign_id, 2).await;
    stop_tx.send(()).unwrap();
    timeout(Duration::from_secs(10), app)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_settled_independently(&h, &report.campaign_id).await;
}
