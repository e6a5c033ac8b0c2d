//! Integration tests with mock HTTP server

pub mod auth;
pub mod packages;
pub mod resilience;
