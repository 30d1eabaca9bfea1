//! Application services behind the HTTP API

pub mod campaigns;
pub mod credentials;
pub mod deployments;
