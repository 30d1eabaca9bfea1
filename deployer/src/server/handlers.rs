//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use openapi_server::models::{
    CampaignListResponse, CampaignSummary, CreateCredentialRequest, CredentialListResponse,
    CredentialSummary, DashboardStats, DeploymentActionResponse, DeploymentInfo,
    DeploymentListResponse, HealthResponse, ListingResponse, PrefixQuery, SkippedRow,
    SubmitCampaignRequest, SubmitCampaignResponse, TemplateListResponse, TemplateSummary,
    UpdateHeaderRequest, VersionResponse,
};
use secrecy::SecretString;

use crate::authn::principal::Principal;
use crate::errors::SitecastError;
use crate::models::campaign::Destination;
use crate::models::credential::{Credential, CredentialInput, Platform};
use crate::models::deployment::Deployment;
use crate::models::row_from_json;
use crate::server::state::ServerState;
use crate::services::campaigns::{CampaignOverview, CampaignSubmission};
use crate::utils::version_info;

type ApiResult<T> = Result<T, SitecastError>;

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "sitecast".to_string(),
        version: state.version.clone(),
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

// ================================ CAMPAIGNS ===================================== //

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn campaign_summary(overview: CampaignOverview) -> CampaignSummary {
    let campaign = overview.campaign;
    CampaignSummary {
        id: campaign.id,
        name: campaign.name,
        platform: campaign.platform.to_string(),
        status: campaign.status.as_str().to_string(),
        queued: campaign.queued,
        live: overview.live,
        failed: overview.failed,
        pending: overview.pending,
        created_at: campaign.created_at,
    }
}

/// Submit a batch
pub async fn submit_campaign_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Json(request): Json<SubmitCampaignRequest>,
) -> ApiResult<impl IntoResponse> {
    let submission = CampaignSubmission {
        name: request.name,
        template_id: request.template_id,
        platform: request.platform.parse::<Platform>()?,
        credential_id: non_blank(request.credential_id),
        destination: Destination {
            bucket: non_blank(request.bucket),
            root_folder: non_blank(request.root_folder),
            domain: non_blank(request.domain),
        },
        rows: request.rows.iter().map(row_from_json).collect(),
    };

    let report = state.campaigns.submit(&principal, submission).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitCampaignResponse {
            campaign_id: report.campaign_id,
            total: report.total,
            queued: report.queued,
            skipped: report
                .skipped
                .into_iter()
                .map(|s| SkippedRow {
                    index: s.index,
                    reason: s.reason.as_str().to_string(),
                    missing_fields: s.missing_fields,
                })
                .collect(),
        }),
    ))
}

/// List the principal's campaigns
pub async fn list_campaigns_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let campaigns: Vec<CampaignSummary> = state
        .campaigns
        .list(&principal)
        .await?
        .into_iter()
        .map(campaign_summary)
        .collect();
    let total = campaigns.len();
    Ok(Json(CampaignListResponse { campaigns, total }))
}

/// One campaign with record counts
pub async fn get_campaign_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let overview = state.campaigns.get(&principal, &id).await?;
    Ok(Json(campaign_summary(overview)))
}

/// Available templates
pub async fn list_templates_handler(
    State(state): State<Arc<ServerState>>,
    _principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let templates: Vec<TemplateSummary> = state
        .campaigns
        .templates()
        .await?
        .into_iter()
        .map(|t| TemplateSummary {
            id: t.id,
            name: t.name,
            required_fields: t.required_fields,
            strategy: t.strategy.as_str().to_string(),
        })
        .collect();
    let total = templates.len();
    Ok(Json(TemplateListResponse { templates, total }))
}

// =============================== DEPLOYMENTS ==================================== //

fn deployment_info(record: Deployment) -> DeploymentInfo {
    DeploymentInfo {
        status: record.status().to_string(),
        error: record.error().map(str::to_string),
        attempts: record.lifecycle.attempts(),
        id: record.id,
        campaign_id: record.campaign_id,
        product_name: record.product_name,
        slug: record.slug,
        platform: record.platform.to_string(),
        url: record.url,
        header_snippet: record.header_snippet,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// List the principal's deployment records
pub async fn list_deployments_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let deployments: Vec<DeploymentInfo> = state
        .deployments
        .list(&principal)
        .await?
        .into_iter()
        .map(deployment_info)
        .collect();
    let total = deployments.len();
    Ok(Json(DeploymentListResponse { deployments, total }))
}

pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.deployments.get(&principal, &id).await?;
    Ok(Json(deployment_info(record)))
}

pub async fn update_header_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<UpdateHeaderRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .deployments
        .update_header(&principal, &id, &request.header_snippet, request.redeploy)
        .await?;
    Ok(Json(deployment_info(record)))
}

pub async fn redeploy_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.deployments.request_redeploy(&principal, &id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DeploymentActionResponse {
            success: true,
            status: record.status().to_string(),
            deployment_id: record.id,
            message: Some("Redeploy queued".to_string()),
        }),
    ))
}

pub async fn delete_deployment_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.deployments.delete(&principal, &id).await?;
    Ok(Json(DeploymentActionResponse {
        success: true,
        deployment_id: id,
        status: "Deleted".to_string(),
        message: None,
    }))
}

/// Dashboard statistics
pub async fn dashboard_stats_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let stats = state.deployments.stats(&principal).await?;
    Ok(Json(DashboardStats {
        total_live: stats.live,
        total_failed: stats.failed,
        total_pending: stats.pending,
        total_deployments: stats.deployments,
        total_campaigns: stats.campaigns,
    }))
}

// =============================== CREDENTIALS ==================================== //

fn credential_summary(credential: Credential) -> CredentialSummary {
    CredentialSummary {
        id: credential.id,
        name: credential.name,
        platform: credential.platform.to_string(),
        region: credential.region,
        cdn_url: credential.cdn_url,
        created_at: credential.created_at,
    }
}

fn secret(value: Option<String>) -> Option<SecretString> {
    non_blank(value).map(SecretString::from)
}

pub async fn create_credential_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Json(request): Json<CreateCredentialRequest>,
) -> ApiResult<impl IntoResponse> {
    let input = CredentialInput {
        name: request.name,
        platform: request.platform.parse::<Platform>()?,
        region: non_blank(request.region),
        cdn_url: non_blank(request.cdn_url),
        site_id: non_blank(request.site_id),
        access_key: secret(request.access_key),
        secret_key: secret(request.secret_key),
        account_id: secret(request.account_id),
        access_token: secret(request.access_token),
    };
    let credential = state.credentials.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(credential_summary(credential))))
}

pub async fn list_credentials_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let credentials: Vec<CredentialSummary> = state
        .credentials
        .list(&principal)
        .await?
        .into_iter()
        .map(credential_summary)
        .collect();
    let total = credentials.len();
    Ok(Json(CredentialListResponse { credentials, total }))
}

pub async fn delete_credential_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.credentials.delete(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_buckets_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let items = state.credentials.buckets(&principal, &id).await?;
    let total = items.len();
    Ok(Json(ListingResponse { items, total }))
}

pub async fn list_prefixes_handler(
    State(state): State<Arc<ServerState>>,
    principal: Principal,
    Path(id): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = state
        .credentials
        .prefixes(
            &principal,
            &id,
            &query.bucket,
            query.prefix.as_deref().unwrap_or_default(),
        )
        .await?;
    let total = items.len();
    Ok(Json(ListingResponse { items, total }))
}
