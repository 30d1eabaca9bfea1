//! HTTP API tests driven through the router with `oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sitecast::server::serve::router;
use sitecast::server::state::ServerState;

use crate::support::{Harness, DOMAIN, USER};

fn app(h: &Harness) -> Router {
    router(Arc::new(ServerState::new(
        "0.0.0-test".to_string(),
        h.state.campaigns.clone(),
        h.state.deployments.clone(),
        h.state.credentials.clone(),
        h.keys.clone(),
    )))
}

fn bearer(h: &Harness, user: &str) -> String {
    format!(
        "Bearer {}",
        h.keys.issue(user, Duration::from_secs(3600)).unwrap()
    )
}

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn submission() -> Value {
    json!({
        "name": "Spring launch",
        "template_id": "landing",
        "platform": "custom_domain",
        "domain": DOMAIN,
        "rows": [
            {"name": "Widget", "price": 19.99, "sub_domain": "widget"},
            {"name": "Gadget"},
            {}
        ]
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let h = Harness::new().await;
    let (status, body) = send(app(&h), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "0.0.0-test");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_rejected() {
    let h = Harness::new().await;

    let (status, body) = send(app(&h), Method::GET, "/deployments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send(
        app(&h),
        Method::GET,
        "/deployments",
        Some("Bearer not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submit_then_list_deployments() {
    let h = Harness::new().await;
    let token = bearer(&h, USER);

    let (status, body) = send(
        app(&h),
        Method::POST,
        "/campaigns",
        Some(&token),
        Some(submission()),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["total"], 3);
    assert_eq!(body["queued"], 1);
    assert_eq!(body["skipped"].as_array().unwrap().len(), 2);
    assert_eq!(body["skipped"][0]["index"], 1);
    assert_eq!(body["skipped"][0]["reason"], "missing_fields");
    assert_eq!(body["skipped"][1]["reason"], "empty_row");

    assert_eq!(h.drain().await, 1);

    let (status, body) = send(app(&h), Method::GET, "/deployments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["deployments"][0]["status"], "Live");
    assert_eq!(body["deployments"][0]["slug"], "widget");

    let (_, stats) = send(app(&h), Method::GET, "/dashboard/stats", Some(&token), None).await;
    assert_eq!(stats["total_live"], 1);
    assert_eq!(stats["total_campaigns"], 1);
}

#[tokio::test]
async fn test_other_users_records_are_hidden() {
    let h = Harness::new().await;
    let owner = bearer(&h, USER);
    let stranger = bearer(&h, "user-2");

    let (_, body) = send(
        app(&h),
        Method::POST,
        "/campaigns",
        Some(&owner),
        Some(submission()),
    )
    .await;
    let campaign_id = body["campaign_id"].as_str().unwrap().to_string();
    h.drain().await;

    let (_, listed) = send(app(&h), Method::GET, "/deployments", Some(&owner), None).await;
    let deployment_id = listed["deployments"][0]["id"].as_str().unwrap().to_string();

    let (_, theirs) = send(app(&h), Method::GET, "/deployments", Some(&stranger), None).await;
    assert_eq!(theirs["total"], 0);

    let (status, _) = send(
        app(&h),
        Method::GET,
        &format!("/campaigns/{}", campaign_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        app(&h),
        Method::DELETE,
        &format!("/deployments/{}", deployment_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_platform_is_bad_request() {
    let h = Harness::new().await;
    let token = bearer(&h, USER);
    let mut body = submission();
    body["platform"] = json!("ftp");

    let (status, body) = send(app(&h), Method::POST, "/campaigns", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_credential_lifecycle_hides_secrets() {
    let h = Harness::new().await;
    let token = bearer(&h, USER);

    let (status, created) = send(
        app(&h),
        Method::POST,
        "/credentials",
        Some(&token),
        Some(json!({
            "name": "hosting",
            "platform": "netlify",
            "access_token": "nf-secret-token"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!created.to_string().contains("nf-secret-token"));
    let id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = send(app(&h), Method::GET, "/credentials", Some(&token), None).await;
    assert_eq!(listed["total"], 1);
    assert!(!listed.to_string().contains("nf-secret-token"));

    let (status, _) = send(
        app(&h),
        Method::DELETE,
        &format!("/credentials/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(app(&h), Method::GET, "/credentials", Some(&token), None).await;
    assert_eq!(listed["total"], 0);
}
