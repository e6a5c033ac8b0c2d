//! # Resilience Primitives Module
//!
//! Retry with exponential backoff for fallible asynchronous operations.
//!
//! ```rust,no_run
//! use travel_assist::resilience::retry::{with_retry, RetryOptions};
//! use travel_assist::{Error, ErrorContext};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), travel_assist::resilience::retry::RetryError> {
//! let options = RetryOptions::new()
//!     .with_max_attempts(4)
//!     .with_base_delay(Duration::from_millis(250));
//!
//! let value = with_retry(
//!     || async { Ok::<_, Error>(42) },
//!     &options,
//!     &ErrorContext::new().with_operation("answer"),
//! )
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod retry;

pub use retry::{with_retry, RetryError, RetryOptions};
