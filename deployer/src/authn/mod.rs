//! Request authentication

pub mod principal;
pub mod session_token;
