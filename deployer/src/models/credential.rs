//! Credential models and the seal/open boundary

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::SitecastError;
use crate::vault::Vault;

/// Storage/hosting backend selectable per campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    AwsS3,
    DigitalOcean,
    Backblaze,
    CloudflareR2,
    Netlify,
    CustomDomain,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::AwsS3,
        Platform::DigitalOcean,
        Platform::Backblaze,
        Platform::CloudflareR2,
        Platform::Netlify,
        Platform::CustomDomain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::AwsS3 => "aws_s3",
            Platform::DigitalOcean => "digital_ocean",
            Platform::Backblaze => "backblaze",
            Platform::CloudflareR2 => "cloudflare_r2",
            Platform::Netlify => "netlify",
            Platform::CustomDomain => "custom_domain",
        }
    }

    /// Backed by an S3-compatible object store
    pub fn is_s3_compatible(&self) -> bool {
        matches!(
            self,
            Platform::AwsS3 | Platform::DigitalOcean | Platform::Backblaze | Platform::CloudflareR2
        )
    }

    /// Every platform except local custom-domain hosting needs a credential
    pub fn requires_credential(&self) -> bool {
        !matches!(self, Platform::CustomDomain)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SitecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| SitecastError::ValidationError(format!("Unsupported platform: {}", s)))
    }
}

/// A vault-sealed value. Never holds plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sealed(String);

impl Sealed {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sealed secret fields of a credential
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SealedSecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<Sealed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<Sealed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Sealed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Sealed>,
}

/// A stored provider credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub platform: Platform,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cdn_url: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub secrets: SealedSecrets,
    pub created_at: DateTime<Utc>,
}

/// Plaintext credential as submitted by its owner
#[derive(Debug)]
pub struct CredentialInput {
    pub name: String,
    pub platform: Platform,
    pub region: Option<String>,
    pub cdn_url: Option<String>,
    pub site_id: Option<String>,
    pub access_key: Option<SecretString>,
    pub secret_key: Option<SecretString>,
    pub account_id: Option<SecretString>,
    pub access_token: Option<SecretString>,
}

fn present(value: &Option<SecretString>) -> bool {
    value
        .as_ref()
        .map(|s| !s.expose_secret().trim().is_empty())
        .unwrap_or(false)
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

impl CredentialInput {
    /// Check the platform-specific required fields
    pub fn validate(&self) -> Result<(), SitecastError> {
        if self.name.trim().is_empty() {
            return Err(SitecastError::ValidationError(
                "credential name is required".to_string(),
            ));
        }

        let mut missing = Vec::new();
        match self.platform {
            Platform::AwsS3 | Platform::DigitalOcean | Platform::Backblaze => {
                if !present(&self.access_key) {
                    missing.push("access_key");
                }
                if !present(&self.secret_key) {
                    missing.push("secret_key");
                }
                if !non_blank(&self.region) {
                    missing.push("region");
                }
            }
            Platform::CloudflareR2 => {
                if !present(&self.access_key) {
                    missing.push("access_key");
                }
                if !present(&self.secret_key) {
                    missing.push("secret_key");
                }
                if !present(&self.account_id) {
                    missing.push("account_id");
                }
            }
            Platform::Netlify => {
                if !present(&self.access_token) {
                    missing.push("access_token");
                }
            }
            Platform::CustomDomain => {
                return Err(SitecastError::ValidationError(
                    "custom_domain hosting does not use credentials".to_string(),
                ));
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SitecastError::ValidationError(format!(
                "missing fields for {}: {}",
                self.platform,
                missing.join(", ")
            )))
        }
    }

    /// Encrypt-on-write: validate and seal every secret field
    pub fn seal(self, owner_id: &str, vault: &dyn Vault) -> Result<Credential, SitecastError> {
        self.validate()?;

        let seal = |value: &Option<SecretString>| -> Result<Option<Sealed>, SitecastError> {
            match value {
                Some(secret) if !secret.expose_secret().trim().is_empty() => Ok(Some(Sealed(
                    vault.encrypt(secret.expose_secret().trim())?,
                ))),
                _ => Ok(None),
            }
        };

        let secrets = SealedSecrets {
            access_key: seal(&self.access_key)?,
            secret_key: seal(&self.secret_key)?,
            account_id: seal(&self.account_id)?,
            access_token: seal(&self.access_token)?,
        };

        Ok(Credential {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: self.name.trim().to_string(),
            platform: self.platform,
            region: self.region.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            cdn_url: self
                .cdn_url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            site_id: self.site_id.filter(|s| !s.trim().is_empty()),
            secrets,
            created_at: Utc::now(),
        })
    }
}

/// Decrypted credential, only alive inside a job or discovery call
pub struct OpenedCredential {
    pub platform: Platform,
    pub region: Option<String>,
    pub cdn_url: Option<String>,
    pub site_id: Option<String>,
    access_key: SecretString,
    secret_key: SecretString,
    account_id: SecretString,
    access_token: SecretString,
}

impl fmt::Debug for OpenedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedCredential")
            .field("platform", &self.platform)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Decrypt-on-read. Undecryptable fields open as empty.
    pub fn open(&self, vault: &dyn Vault) -> OpenedCredential {
        let open = |value: &Option<Sealed>| -> SecretString {
            let plain = value
                .as_ref()
                .map(|sealed| vault.decrypt(sealed.as_str()))
                .unwrap_or_default();
            SecretString::from(plain)
        };

        OpenedCredential {
            platform: self.platform,
            region: self.region.clone(),
            cdn_url: self.cdn_url.clone(),
            site_id: self.site_id.clone(),
            access_key: open(&self.secrets.access_key),
            secret_key: open(&self.secrets.secret_key),
            account_id: open(&self.secrets.account_id),
            access_token: open(&self.secrets.access_token),
        }
    }
}

impl OpenedCredential {
    fn require<'a>(&self, secret: &'a SecretString, field: &str) -> Result<&'a str, SitecastError> {
        let value = secret.expose_secret();
        if value.is_empty() {
            return Err(SitecastError::CredentialError(format!(
                "{} credential is missing '{}' (absent or could not be decrypted)",
                self.platform, field
            )));
        }
        Ok(value)
    }

    pub fn access_key(&self) -> Result<&str, SitecastError> {
        self.require(&self.access_key, "access_key")
    }

    pub fn secret_key(&self) -> Result<&str, SitecastError> {
        self.require(&self.secret_key, "secret_key")
    }

    pub fn account_id(&self) -> Result<&str, SitecastError> {
        self.require(&self.account_id, "account_id")
    }

    pub fn access_token(&self) -> Result<&str, SitecastError> {
        self.require(&self.access_token, "access_token")
    }

    /// Region, required for most S3 variants
    pub fn region(&self) -> Result<&str, SitecastError> {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                SitecastError::CredentialError(format!("{} credential has no region", self.platform))
            })
    }
}
