//! Wire models for consumed third-party APIs

pub mod models;

pub use models::*;
