//! Shared fixtures

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;

use sitecast::app::options::AppOptions;
use sitecast::app::state::AppState;
use sitecast::authn::principal::Principal;
use sitecast::authn::session_token::SessionKeys;
use sitecast::errors::SitecastError;
use sitecast::generator::TextBackend;
use sitecast::models::campaign::Destination;
use sitecast::models::credential::{Credential, CredentialInput, Platform};
use sitecast::models::template::{PromptStrategy, Template};
use sitecast::models::RowData;
use sitecast::queue::memory::MemoryQueue;
use sitecast::queue::JobQueue;
use sitecast::services::campaigns::CampaignSubmission;
use sitecast::store::memory::MemoryStore;
use sitecast::store::Store;
use sitecast::vault::{SealedVault, Vault};
use sitecast::workers::deployer;

pub const USER: &str = "user-1";
pub const DOMAIN: &str = "example.com";

/// Text backend that wraps the prompt in a fenced HTML page.
/// Rows whose name contains "boom" fail while `failing` is set.
pub struct ScriptedBackend {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(true),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, SitecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) && user.contains("boom") {
            return Err(SitecastError::GenerationError("backend exploded".to_string()));
        }
        let title = user.lines().next().unwrap_or_default();
        Ok(format!(
            "```html\n<html><head><title>{}</title></head><body>ok</body></html>\n```",
            title
        ))
    }
}

pub fn row(pairs: &[(&str, &str)]) -> RowData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn product(name: &str, slug: &str) -> RowData {
    row(&[("name", name), ("price", "19.99"), ("sub_domain", slug)])
}

pub fn template() -> Template {
    Template {
        id: "landing".to_string(),
        name: "Landing".to_string(),
        prompt: "You write product landing pages.".to_string(),
        required_fields: vec!["name".to_string(), "price".to_string()],
        strategy: PromptStrategy::Structured,
        created_at: Utc::now(),
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
    pub vault: Arc<SealedVault>,
    pub backend: Arc<ScriptedBackend>,
    pub keys: Arc<SessionKeys>,
    pub options: AppOptions,
    pub state: AppState,
    pub principal: Principal,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_netlify("http://127.0.0.1:9").await
    }

    pub async fn with_netlify(netlify_api_url: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let mut options = AppOptions::default();
        options.providers.local_base_path = tmp.path().join("www");
        options.providers.netlify_api_url = netlify_api_url.to_string();
        options.providers.publish_timeout = Duration::from_secs(5);
        options.fsm_settings.publish_timeout = Duration::from_secs(5);
        options.fsm_settings.generation_timeout = Duration::from_secs(5);

        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let vault = Arc::new(SealedVault::new(&SecretString::from("test-vault".to_string())));
        let backend = Arc::new(ScriptedBackend::new());
        let keys = Arc::new(SessionKeys::new(&SecretString::from("test-jwt".to_string())));

        store.put_template(&template()).await.unwrap();

        let state = AppState::from_parts(
            store.clone(),
            queue.clone(),
            vault.clone(),
            backend.clone(),
            keys.clone(),
            &options,
        )
        .unwrap();

        Self {
            tmp,
            store,
            queue,
            vault,
            backend,
            keys,
            options,
            state,
            principal: Principal::new(USER),
        }
    }

    /// Run every queued job to completion on the calling task
    pub async fn drain(&self) -> usize {
        let mut handled = 0;
        while let Some(delivery) = self.queue.pop().await.unwrap() {
            deployer::handle(0, self.queue.as_ref(), &self.state.pipeline, delivery).await;
            handled += 1;
        }
        handled
    }

    pub fn published_file(&self, slug: &str) -> std::path::PathBuf {
        self.tmp
            .path()
            .join("www")
            .join(DOMAIN)
            .join(slug)
            .join("index.html")
    }

    pub fn custom_domain(&self, rows: Vec<RowData>) -> CampaignSubmission {
        CampaignSubmission {
            name: "Spring launch".to_string(),
            template_id: "landing".to_string(),
            platform: Platform::CustomDomain,
            credential_id: None,
            destination: Destination {
                domain: Some(DOMAIN.to_string()),
                ..Default::default()
            },
            rows,
        }
    }

    pub async fn netlify_credential(&self, owner: &str, site_id: Option<&str>) -> Credential {
        let credential = CredentialInput {
            name: "netlify".to_string(),
            platform: Platform::Netlify,
            region: None,
            cdn_url: None,
            site_id: site_id.map(str::to_string),
            access_key: None,
            secret_key: None,
            account_id: None,
            access_token: Some(SecretString::from("nf-token".to_string())),
        }
        .seal(owner, self.vault.as_ref() as &dyn Vault)
        .unwrap();
        self.store.put_credential(&credential).await.unwrap();
        credential
    }
}

/// Serve `app` on an ephemeral local port
pub async fn spawn_mock(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
