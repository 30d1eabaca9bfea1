//! Credential management and bucket discovery

use std::sync::Arc;

use tracing::info;

use crate::authn::principal::Principal;
use crate::errors::SitecastError;
use crate::models::credential::{Credential, CredentialInput};
use crate::providers::{ProviderFactory, StorageProvider};
use crate::store::Store;
use crate::vault::Vault;

pub struct CredentialService {
    store: Arc<dyn Store>,
    vault: Arc<dyn Vault>,
    providers: Arc<ProviderFactory>,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn Store>,
        vault: Arc<dyn Vault>,
        providers: Arc<ProviderFactory>,
    ) -> Self {
        Self {
            store,
            vault,
            providers,
        }
    }

    /// Seal and store a credential
    pub async fn create(
        &self,
        principal: &Principal,
        input: CredentialInput,
    ) -> Result<Credential, SitecastError> {
        let credential = input.seal(&principal.user_id, self.vault.as_ref())?;
        self.store.put_credential(&credential).await?;
        info!(credential_id = %credential.id, platform = %credential.platform, "Credential stored");
        Ok(credential)
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Credential>, SitecastError> {
        self.store.list_credentials(&principal.user_id).await
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Credential, SitecastError> {
        let credential = self
            .store
            .get_credential(id)
            .await?
            .ok_or_else(|| SitecastError::NotFound(format!("credential {}", id)))?;
        principal.ensure_owner(&credential.owner_id, "credential")?;
        Ok(credential)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), SitecastError> {
        let credential = self.get(principal, id).await?;
        self.store.delete_credential(&credential.id).await?;
        info!(credential_id = %credential.id, "Credential deleted");
        Ok(())
    }

    /// Buckets (or sites) reachable with the credential
    pub async fn buckets(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Vec<String>, SitecastError> {
        let credential = self.get(principal, id).await?;
        let opened = credential.open(self.vault.as_ref());
        self.providers
            .for_platform(credential.platform)
            .list_buckets(Some(&opened))
            .await
    }

    /// Folder-like prefixes inside a bucket
    pub async fn prefixes(
        &self,
        principal: &Principal,
        id: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SitecastError> {
        if bucket.trim().is_empty() {
            return Err(SitecastError::ValidationError("bucket is required".to_string()));
        }
        let credential = self.get(principal, id).await?;
        let opened = credential.open(self.vault.as_ref());
        self.providers
            .for_platform(credential.platform)
            .list_prefixes(Some(&opened), bucket.trim(), prefix)
            .await
    }
}
