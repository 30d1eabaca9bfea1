//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::SitecastError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::deployer;

/// Run Sitecast until the shutdown signal resolves
pub async fn run(
    version: String,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SitecastError> {
    info!("Initializing Sitecast {}...", version);

    let state = AppState::init(&options).await?;
    run_with_state(version, options, Arc::new(state), shutdown_signal).await
}

/// Run the worker pool and the HTTP API around an existing state
pub async fn run_with_state(
    version: String,
    options: AppOptions,
    app_state: Arc<AppState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SitecastError> {
    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());
    shutdown_manager.with_app_state(app_state.clone())?;

    if let Err(e) = init(version, &options, app_state, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start Sitecast: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    version: String,
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), SitecastError> {
    if options.enable_workers {
        init_deployer_workers(options, app_state.clone(), shutdown_tx, shutdown_manager);
    }

    if options.enable_server {
        init_server(
            version,
            options,
            app_state,
            shutdown_manager,
            shutdown_tx.subscribe(),
        )
        .await?;
    }

    Ok(())
}

fn init_deployer_workers(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) {
    info!(
        "Initializing {} deployer worker(s)...",
        options.workers.concurrency
    );

    for worker_id in 0..options.workers.concurrency {
        let worker_options = deployer::Options {
            worker_id,
            interval: options.workers.poll_interval,
        };
        let queue = app_state.queue.clone();
        let pipeline = app_state.pipeline.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            deployer::run(
                &worker_options,
                queue,
                pipeline,
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            )
            .await;
        });

        shutdown_manager.with_deployer_worker_handle(handle);
    }
}

async fn init_server(
    version: String,
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), SitecastError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(
        version,
        app_state.campaigns.clone(),
        app_state.deployments.clone(),
        app_state.credentials.clone(),
        app_state.session_keys.clone(),
    );

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), SitecastError>>>,
    deployer_worker_handles: Vec<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
            deployer_worker_handles: Vec::new(),
        }
    }

    pub fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), SitecastError> {
        if self.app_state.is_some() {
            return Err(SitecastError::ShutdownError(
                "app_state already set".to_string(),
            ));
        }
        self.app_state = Some(state);
        Ok(())
    }

    pub fn with_deployer_worker_handle(&mut self, handle: JoinHandle<()>) {
        self.deployer_worker_handles.push(handle);
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), SitecastError>>,
    ) -> Result<(), SitecastError> {
        if self.server_handle.is_some() {
            return Err(SitecastError::ShutdownError(
                "server_handle already set".to_string(),
            ));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), SitecastError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), SitecastError> {
        info!("Shutting down Sitecast...");

        // 1. Server, so no new jobs are accepted
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| SitecastError::ShutdownError(e.to_string()))??;
        }

        // 2. Workers finish their current job
        for handle in self.deployer_worker_handles.drain(..) {
            handle
                .await
                .map_err(|e| SitecastError::ShutdownError(e.to_string()))?;
        }

        // 3. App state
        if let Some(app_state) = self.app_state.take() {
            app_state.shutdown().await?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
