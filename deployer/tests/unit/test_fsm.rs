//! FSM unit tests

use sitecast::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentStatus};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), DeploymentStatus::Pending);
    assert!(fsm.error().is_none());
    assert_eq!(fsm.attempts(), 0);
    assert!(!fsm.can_redeploy());
}

#[test]
fn test_fsm_failure_records_error() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::PublishFailed("bucket missing".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), DeploymentStatus::Failed);
    assert_eq!(fsm.error(), Some("bucket missing"));
    assert_eq!(fsm.attempts(), 1);
    assert!(fsm.can_redeploy());
}

#[test]
fn test_fsm_redeploy_clears_error() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::PublishFailed("timeout".to_string()))
        .unwrap();

    // Failed -> Pending
    fsm.process(DeploymentEvent::Redeploy).unwrap();
    assert_eq!(fsm.state(), DeploymentStatus::Pending);
    assert!(fsm.error().is_none());
    assert!(!fsm.can_redeploy());

    // Pending -> Live
    fsm.process(DeploymentEvent::Published).unwrap();
    assert_eq!(fsm.state(), DeploymentStatus::Live);
    assert_eq!(fsm.attempts(), 2);
}

#[test]
fn test_fsm_pending_redeploy_is_idempotent() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Redeploy).unwrap();
    fsm.process(DeploymentEvent::Redeploy).unwrap();
    assert_eq!(fsm.state(), DeploymentStatus::Pending);
    assert_eq!(fsm.attempts(), 0);
}

#[test]
fn test_fsm_failed_rejects_outcomes() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::PublishFailed("first".to_string()))
        .unwrap();

    assert!(fsm.process(DeploymentEvent::Published).is_err());
    assert!(fsm
        .process(DeploymentEvent::PublishFailed("second".to_string()))
        .is_err());
    assert_eq!(fsm.error(), Some("first"));
}

#[test]
fn test_fsm_serialization() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Published).unwrap();

    let json = serde_json::to_string(&fsm).unwrap();
    let restored: DeploymentFsm = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, fsm);
    assert!(json.contains("\"Live\""));
}
