//! Data directory and settings

pub mod layout;
pub mod settings;
