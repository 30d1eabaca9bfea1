//! Application state

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::session_token::SessionKeys;
use crate::errors::SitecastError;
use crate::generator::client::ChatCompletionsClient;
use crate::generator::{Generator, TextBackend};
use crate::providers::ProviderFactory;
use crate::queue::spool::SpoolQueue;
use crate::queue::JobQueue;
use crate::services::campaigns::CampaignService;
use crate::services::credentials::CredentialService;
use crate::services::deployments::DeploymentService;
use crate::storage::settings::secret_from_env;
use crate::store::file::FileStore;
use crate::store::Store;
use crate::vault::{SealedVault, Vault};
use crate::workers::pipeline::Pipeline;

/// Main application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn JobQueue>,
    pub pipeline: Arc<Pipeline>,
    pub session_keys: Arc<SessionKeys>,
    pub campaigns: Arc<CampaignService>,
    pub deployments: Arc<DeploymentService>,
    pub credentials: Arc<CredentialService>,
}

impl AppState {
    /// Initialize application state from the data directory and environment
    pub async fn init(options: &AppOptions) -> Result<Self, SitecastError> {
        info!("Initializing application state...");

        let vault_secret = secret_from_env(&options.secrets.vault_secret_env)?;
        let auth_secret = secret_from_env(&options.secrets.auth_secret_env)?;
        let api_key = secret_from_env(&options.secrets.generator_api_key_env)?;

        options.layout.setup().await?;
        let store: Arc<dyn Store> = Arc::new(FileStore::open(options.layout.store_dir()).await?);

        let spool = SpoolQueue::open(options.layout.queue_dir()).await?;
        spool.recover().await?;
        let queue: Arc<dyn JobQueue> = Arc::new(spool);

        let backend: Arc<dyn TextBackend> =
            Arc::new(ChatCompletionsClient::new(options.generator.clone(), api_key)?);

        Self::from_parts(
            store,
            queue,
            Arc::new(SealedVault::new(&vault_secret)),
            backend,
            Arc::new(SessionKeys::new(&auth_secret)),
            options,
        )
    }

    /// Wire services around already-built backends
    pub fn from_parts(
        store: Arc<dyn Store>,
        queue: Arc<dyn JobQueue>,
        vault: Arc<dyn Vault>,
        backend: Arc<dyn TextBackend>,
        session_keys: Arc<SessionKeys>,
        options: &AppOptions,
    ) -> Result<Self, SitecastError> {
        let providers = Arc::new(ProviderFactory::new(&options.providers)?);

        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            vault.clone(),
            Generator::new(backend),
            providers.clone(),
            options.fsm_settings.clone(),
        ));

        Ok(Self {
            campaigns: Arc::new(CampaignService::new(store.clone(), queue.clone())),
            deployments: Arc::new(DeploymentService::new(
                store.clone(),
                queue.clone(),
                vault.clone(),
                providers.clone(),
            )),
            credentials: Arc::new(CredentialService::new(store.clone(), vault, providers)),
            store,
            queue,
            pipeline,
            session_keys,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), SitecastError> {
        info!("Shutting down application state...");
        let pending = self.queue.pending_len().await?;
        if pending > 0 {
            info!("{} job(s) left pending for the next start", pending);
        }
        Ok(())
    }
}
