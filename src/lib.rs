//! # travel-assist
//!
//! Resilient access layer for a travel-booking API, used by a conversational
//! travel assistant to look up holiday packages.
//!
//! ## Overview
//!
//! Every call to the booking API goes through three pieces:
//!
//! - **Retry engine**: bounded exponential backoff around any async operation,
//!   with a pluggable retry predicate and optional cancellation.
//! - **Authenticated client**: caches the bearer token for an hour, refreshes it
//!   once for all concurrent callers, clears it on a 401, and paginates the
//!   package list.
//! - **Error model**: a closed set of error codes, typed [`AppError`]s with
//!   context, and a classifier that turns any failure into one of them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use travel_assist::{create_user_friendly_message, BookingClient, PackageFilter};
//!
//! #[tokio::main]
//! async fn main() -> travel_assist::Result<()> {
//!     travel_assist::init_tracing("travel_assist=info");
//!     let client = BookingClient::from_env()?;
//!
//!     let filter = PackageFilter::new().with_destination("Kerala").with_days(5);
//!     match client.search_packages(&filter).await {
//!         Ok(packages) => println!("{} packages", packages.len()),
//!         Err(e) => {
//!             let app = travel_assist::classify(e, Default::default());
//!             println!("{}", create_user_friendly_message(&app));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Booking API client, configuration and token cache |
//! | [`resilience`] | Retry with exponential backoff |
//! | [`error`] | Crate error type, [`AppError`] and [`ErrorContext`] |
//! | [`error_code`] | Closed set of [`ErrorCode`]s |
//! | [`classify`] | Error classification and user-facing messages |
//! | [`telemetry`] | Structured logger over `tracing` with pluggable sinks |
//! | [`transport`] | HTTP transport over `reqwest` |
//! | [`types`] | [`Package`] and [`PackageFilter`] |

pub mod classify;
pub mod client;
pub mod error;
pub mod error_code;
pub mod resilience;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use classify::{
    classify, create_user_friendly_message, handle_error, looks_like_network_failure,
    user_message_for_code,
};
pub use client::{
    BookingClient, BookingClientBuilder, ClientConfig, RequestOptions, TokenCache, TokenState,
};
pub use error::{AppError, AppErrorKind, Error, ErrorContext};
pub use error_code::ErrorCode;
pub use resilience::{with_retry, RetryError, RetryOptions};
pub use telemetry::{init_tracing, InMemoryLogSink, LogLevel, LogSink, Logger, Metadata};
pub use types::{Package, PackageFilter};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
