//! Sitecast Library
//!
//! Core modules for the Sitecast batch site deployment service.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod generator;
pub mod logs;
pub mod models;
pub mod providers;
pub mod queue;
pub mod server;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
pub mod vault;
pub mod workers;

