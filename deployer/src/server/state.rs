//! Server state

use std::sync::Arc;

use crate::authn::principal::HasSessionKeys;
use crate::authn::session_token::SessionKeys;
use crate::services::campaigns::CampaignService;
use crate::services::credentials::CredentialService;
use crate::services::deployments::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub version: String,
    pub campaigns: Arc<CampaignService>,
    pub deployments: Arc<DeploymentService>,
    pub credentials: Arc<CredentialService>,
    pub session_keys: Arc<SessionKeys>,
}

impl ServerState {
    pub fn new(
        version: String,
        campaigns: Arc<CampaignService>,
        deployments: Arc<DeploymentService>,
        credentials: Arc<CredentialService>,
        session_keys: Arc<SessionKeys>,
    ) -> Self {
        Self {
            version,
            campaigns,
            deployments,
            credentials,
            session_keys,
        }
    }
}

impl HasSessionKeys for Arc<ServerState> {
    fn session_keys(&self) -> &SessionKeys {
        &self.session_keys
    }
}
