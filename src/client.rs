//! Authenticated client for the booking API.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`ClientConfig`] from environment or builder |
//! | [`token`] | Bearer-token cache with single-flight refresh |
//! | [`core`] | [`BookingClient`], login and authenticated requests |
//! | [`builder`] | [`BookingClientBuilder`] for injecting logger, cache and retry options |
//!
//! Package operations (`get_packages`, `get_package_by_id`, `search_packages`)
//! are methods on [`BookingClient`].

pub mod builder;
pub mod config;
pub mod core;
mod packages;
pub mod token;

pub use builder::BookingClientBuilder;
pub use config::ClientConfig;
pub use core::{BookingClient, RequestOptions};
pub use token::{TokenCache, TokenState};
