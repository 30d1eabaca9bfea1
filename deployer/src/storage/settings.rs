//! Settings file management

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::SitecastError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rotated log files under the data directory
    #[serde(default)]
    pub log_to_file: bool,

    /// HTTP API configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Worker pool configuration
    #[serde(default)]
    pub workers: WorkerSettings,

    /// Text backend configuration
    #[serde(default)]
    pub generator: GeneratorSettings,

    /// Storage backend configuration
    #[serde(default)]
    pub hosting: HostingSettings,

    /// Names of the environment variables holding secrets
    #[serde(default)]
    pub secrets: SecretSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            server: ServerSettings::default(),
            workers: WorkerSettings::default(),
            generator: GeneratorSettings::default(),
            hosting: HostingSettings::default(),
            secrets: SecretSettings::default(),
        }
    }
}

impl Settings {
    /// Read the settings file, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, SitecastError> {
        match file.read_json_opt::<Settings>().await? {
            Some(settings) => Ok(settings),
            None => {
                info!(
                    "No settings file at {}, using defaults",
                    file.path().display()
                );
                Ok(Settings::default())
            }
        }
    }
}

/// Read a secret from the environment
pub fn secret_from_env(var: &str) -> Result<SecretString, SitecastError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(SitecastError::ConfigError(format!(
            "environment variable {} is not set",
            var
        ))),
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Number of concurrent workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Idle poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WorkerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Text backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_generator_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_generator_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: default_generator_url(),
            model: default_model(),
            timeout_secs: default_generation_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Storage backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingSettings {
    /// Netlify API base URL
    #[serde(default = "default_netlify_url")]
    pub netlify_api_url: String,

    /// Root directory for custom-domain hosting
    #[serde(default = "default_local_base_path")]
    pub local_base_path: String,

    /// Storage call timeout in seconds
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

fn default_netlify_url() -> String {
    crate::providers::netlify::DEFAULT_API_URL.to_string()
}

fn default_local_base_path() -> String {
    "/var/www/sitecast".to_string()
}

fn default_publish_timeout() -> u64 {
    60
}

impl Default for HostingSettings {
    fn default() -> Self {
        Self {
            netlify_api_url: default_netlify_url(),
            local_base_path: default_local_base_path(),
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

/// Secret environment variable names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Vault key material
    #[serde(default = "default_vault_secret_env")]
    pub vault_secret_env: String,

    /// HS256 key for principal tokens
    #[serde(default = "default_auth_secret_env")]
    pub auth_secret_env: String,
}

fn default_vault_secret_env() -> String {
    "CRYPTO_SECRET".to_string()
}

fn default_auth_secret_env() -> String {
    "JWT_SECRET".to_string()
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            vault_secret_env: default_vault_secret_env(),
            auth_secret_env: default_auth_secret_env(),
        }
    }
}
