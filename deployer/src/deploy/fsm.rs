//! Finite State Machine for a deployment record's lifecycle

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pipeline timing settings
#[derive(Debug, Clone)]
pub struct FsmSettings {
    /// Timeout for calls to the text-generation backend
    pub generation_timeout: Duration,

    /// Timeout for calls to storage backends
    pub publish_timeout: Duration,
}

impl Default for FsmSettings {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(120),
            publish_timeout: Duration::from_secs(60),
        }
    }
}

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentStatus {
    /// Job started (or redeploy requested), no outcome yet
    Pending,

    /// Artifact published and reachable
    Live,

    /// Generation or publish failed
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "Pending",
            DeploymentStatus::Live => "Live",
            DeploymentStatus::Failed => "Failed",
        }
    }

    /// Live and Failed are terminal until an explicit redeploy
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Live | DeploymentStatus::Failed)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Provider publish succeeded
    Published,

    /// Any pipeline step failed
    PublishFailed(String),

    /// Explicit re-entry into the pipeline
    Redeploy,
}

/// Deployment FSM, persisted inline with the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFsm {
    status: DeploymentStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    attempts: u32,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            status: DeploymentStatus::Pending,
            error: None,
            attempts: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> DeploymentStatus {
        self.status
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of finished publish attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.status, &event) {
            // From Pending
            (DeploymentStatus::Pending, DeploymentEvent::Published) => {
                self.error = None;
                self.attempts += 1;
                DeploymentStatus::Live
            }
            (DeploymentStatus::Pending, DeploymentEvent::PublishFailed(err)) => {
                self.error = Some(err.clone());
                self.attempts += 1;
                DeploymentStatus::Failed
            }
            // A redelivered redeploy job finds the record still pending
            (DeploymentStatus::Pending, DeploymentEvent::Redeploy) => DeploymentStatus::Pending,

            // From a terminal state
            (DeploymentStatus::Live, DeploymentEvent::Redeploy)
            | (DeploymentStatus::Failed, DeploymentEvent::Redeploy) => {
                self.error = None;
                DeploymentStatus::Pending
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.status = new_state;
        Ok(())
    }

    /// Whether a user may request a redeploy now
    pub fn can_redeploy(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
