//! HTTP API

pub mod handlers;
pub mod response;
pub mod serve;
pub mod state;
