//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::SitecastError;
use crate::server::handlers::{
    create_credential_handler, dashboard_stats_handler, delete_credential_handler,
    delete_deployment_handler, get_campaign_handler, get_deployment_handler, health_handler,
    list_buckets_handler, list_campaigns_handler, list_credentials_handler,
    list_deployments_handler, list_prefixes_handler, list_templates_handler, redeploy_handler,
    submit_campaign_handler, update_header_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Campaigns
        .route(
            "/campaigns",
            post(submit_campaign_handler).get(list_campaigns_handler),
        )
        .route("/campaigns/{id}", get(get_campaign_handler))
        .route("/templates", get(list_templates_handler))
        // Credentials
        .route(
            "/credentials",
            post(create_credential_handler).get(list_credentials_handler),
        )
        .route(
            "/credentials/{id}",
            axum::routing::delete(delete_credential_handler),
        )
        .route("/credentials/{id}/buckets", get(list_buckets_handler))
        .route("/credentials/{id}/prefixes", get(list_prefixes_handler))
        // Deployments
        .route("/deployments", get(list_deployments_handler))
        .route(
            "/deployments/{id}",
            get(get_deployment_handler).delete(delete_deployment_handler),
        )
        .route("/deployments/{id}/header", put(update_header_handler))
        .route("/deployments/{id}/redeploy", post(redeploy_handler))
        .route("/dashboard/stats", get(dashboard_stats_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), SitecastError>>, SitecastError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SitecastError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| SitecastError::ServerError(e.to_string()))
    });

    Ok(handle)
}
