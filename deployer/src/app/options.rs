//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::fsm::FsmSettings;
use crate::generator::client::ChatOptions;
use crate::providers::ProviderOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Data directory layout
    pub layout: StorageLayout,

    /// Enable the HTTP API
    pub enable_server: bool,

    /// Enable the deployer worker pool
    pub enable_workers: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Worker pool configuration
    pub workers: WorkerPoolOptions,

    /// Text backend configuration
    pub generator: ChatOptions,

    /// Storage backend configuration
    pub providers: ProviderOptions,

    /// Pipeline timeouts
    pub fsm_settings: FsmSettings,

    /// Environment variables holding secrets
    pub secrets: SecretOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            enable_server: true,
            enable_workers: true,
            server: ServerOptions::default(),
            workers: WorkerPoolOptions::default(),
            generator: ChatOptions::default(),
            providers: ProviderOptions::default(),
            fsm_settings: FsmSettings::default(),
            secrets: SecretOptions::default(),
        }
    }
}

impl AppOptions {
    /// Runtime options from the settings file
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        let generation_timeout = Duration::from_secs(settings.generator.timeout_secs);
        let publish_timeout = Duration::from_secs(settings.hosting.publish_timeout_secs);

        Self {
            layout,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            workers: WorkerPoolOptions {
                concurrency: settings.workers.concurrency.max(1),
                poll_interval: settings.workers.poll_interval(),
            },
            generator: ChatOptions {
                base_url: settings.generator.base_url.clone(),
                model: settings.generator.model.clone(),
                timeout: generation_timeout,
            },
            providers: ProviderOptions {
                netlify_api_url: settings.hosting.netlify_api_url.clone(),
                local_base_path: PathBuf::from(&settings.hosting.local_base_path),
                publish_timeout,
            },
            fsm_settings: FsmSettings {
                generation_timeout,
                publish_timeout,
            },
            secrets: SecretOptions {
                vault_secret_env: settings.secrets.vault_secret_env.clone(),
                auth_secret_env: settings.secrets.auth_secret_env.clone(),
                generator_api_key_env: settings.generator.api_key_env.clone(),
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options for the service
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            // A running job is never cancelled, so leave room for one to finish
            max_shutdown_delay: Duration::from_secs(180),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Worker pool options
#[derive(Debug, Clone)]
pub struct WorkerPoolOptions {
    /// Number of workers
    pub concurrency: usize,

    /// Idle polling interval
    pub poll_interval: Duration,
}

impl Default for WorkerPoolOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Names of the environment variables holding secrets
#[derive(Debug, Clone)]
pub struct SecretOptions {
    pub vault_secret_env: String,
    pub auth_secret_env: String,
    pub generator_api_key_env: String,
}

impl Default for SecretOptions {
    fn default() -> Self {
        Self {
            vault_secret_env: "CRYPTO_SECRET".to_string(),
            auth_secret_env: "JWT_SECRET".to_string(),
            generator_api_key_env: "OPENROUTER_API_KEY".to_string(),
        }
    }
}
