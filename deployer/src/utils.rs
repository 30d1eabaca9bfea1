//! Utility functions

use std::path::Path;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Version information for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Calculate SHA256 hash of data
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex_encode(hasher.finalize())
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Lowercase hex encoding
pub fn hex_encode(data: impl AsRef<[u8]>) -> String {
    let data = data.as_ref();
    let mut result = String::with_capacity(data.len() * 2);
    for byte in data {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}

/// One diagnostic check outcome
#[derive(Debug)]
pub struct Check {
    pub name: String,
    pub result: anyhow::Result<String>,
}

/// Inspect the data directory, settings and secrets without starting anything
pub async fn diagnose(layout: &StorageLayout) -> Vec<Check> {
    let mut checks = Vec::new();

    let settings = Settings::load(&layout.settings_file())
        .await
        .map_err(anyhow::Error::from);
    checks.push(Check {
        name: "settings".to_string(),
        result: settings
            .as_ref()
            .map(|s| format!("server on {}:{}", s.server.host, s.server.port))
            .map_err(|e| anyhow::anyhow!("{}", e)),
    });

    checks.push(Check {
        name: "data directory".to_string(),
        result: check_writable(&layout.base_dir).await,
    });

    if let Ok(settings) = settings {
        for var in [
            &settings.secrets.vault_secret_env,
            &settings.secrets.auth_secret_env,
            &settings.generator.api_key_env,
        ] {
            checks.push(Check {
                name: format!("env {}", var),
                result: match std::env::var(var) {
                    Ok(v) if !v.trim().is_empty() => Ok("set".to_string()),
                    _ => Err(anyhow::anyhow!("not set")),
                },
            });
        }

        let hosting = Path::new(&settings.hosting.local_base_path);
        checks.push(Check {
            name: "custom-domain root".to_string(),
            result: if hosting.is_dir() {
                Ok(hosting.display().to_string())
            } else {
                Err(anyhow::anyhow!("{} does not exist", hosting.display()))
            },
        });
    }

    checks
}

async fn check_writable(dir: &Path) -> anyhow::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let probe = dir.join(format!(".probe-{}", generate_uuid()));
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(dir.display().to_string())
}

/// Print diagnostics to stdout
pub async fn run_diagnostic(layout: &StorageLayout) {
    let version = version_info();
    println!("{} {}", "sitecast".bold(), version.version);

    for check in diagnose(layout).await {
        match check.result {
            Ok(detail) => println!("  {} {:<20} {}", "ok".green(), check.name, detail),
            Err(e) => println!("  {} {:<20} {}", "!!".red(), check.name, e),
        }
    }
}
