//! Deployment lifecycle

pub mod fsm;
