//! Retry Engine
//!
//! Runs a zero-argument async operation up to `max_attempts` times with
//! exponential backoff between attempts. Attempts are strictly sequential: the
//! next attempt starts only after the previous failure was observed and the
//! backoff delay elapsed.

use crate::classify::looks_like_network_failure;
use crate::error_code::ErrorCode;
use crate::telemetry::{Logger, Metadata};
use crate::{Error, ErrorContext};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Predicate deciding whether a failed attempt may be retried.
pub type RetryCondition = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Terminal failure after the retry loop gave up.
#[derive(Debug, Error)]
#[error("Operation failed after {attempts} attempt(s): {last_error}")]
pub struct RetryError {
    /// Number of attempts actually made.
    pub attempts: u32,
    #[source]
    pub last_error: Box<Error>,
}

impl RetryError {
    pub fn into_last_error(self) -> Error {
        *self.last_error
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(*self.last_error, Error::Cancelled)
    }
}

/// Per-call retry configuration.
#[derive(Clone)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub retry_condition: RetryCondition,
    pub cancel: Option<CancellationToken>,
    pub logger: Logger,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            retry_condition: Arc::new(is_network_failure),
            cancel: None,
            logger: Logger::default(),
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl RetryOptions {
    /// Defaults: 3 attempts, 1s base delay, 10s cap, multiplier 2, network predicate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the network predicate (alias of [`RetryOptions::new`]).
    pub fn network() -> Self {
        Self::default()
    }

    /// Defaults for booking-API calls: network failures only, never 401/403/429.
    pub fn api() -> Self {
        Self::default().with_retry_condition(is_retryable_api_failure)
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Multipliers that are not finite or not greater than 1 are ignored.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        if multiplier.is_finite() && multiplier > 1.0 {
            self.backoff_multiplier = multiplier;
        }
        self
    }

    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Arc::new(condition);
        self
    }

    /// Abort in-flight attempts and pending backoff waits when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// `min(base_delay * multiplier^(attempt - 1), max_delay)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_secs_f64() * 1000.0;
        let raw_ms = base_ms * self.backoff_multiplier.powi(exponent);
        let cap_ms = self.max_delay.as_secs_f64() * 1000.0;
        let chosen = if raw_ms.is_finite() { raw_ms.min(cap_ms) } else { cap_ms };
        Duration::from_millis(chosen.max(0.0).round() as u64)
    }
}

/// Default predicate: transport failures, 5xx responses, and error text that
/// reads like a network fault (connection reset, host not found, fetch or
/// timeout wording, an embedded 5xx status).
pub fn is_network_failure(error: &Error) -> bool {
    match error {
        Error::Cancelled | Error::Retry(_) => false,
        Error::Remote { status, .. } => (500..600).contains(status),
        Error::Transport(t) => {
            t.is_timeout() || t.is_connect() || looks_like_network_failure(&t.to_string())
        }
        Error::App(app) => {
            matches!(app.code, ErrorCode::RequestFailed | ErrorCode::Timeout)
                || looks_like_network_failure(&app.message)
        }
        other => looks_like_network_failure(&other.to_string()),
    }
}

/// [`is_network_failure`] minus authentication, authorization and rate-limit failures.
pub fn is_retryable_api_failure(error: &Error) -> bool {
    if let Some(app) = error.as_app() {
        if app.is_auth_failure() || app.code == ErrorCode::RateLimitExceeded {
            return false;
        }
    }
    if matches!(error.http_status(), Some(401 | 403 | 429)) {
        return false;
    }
    is_network_failure(error)
}

/// Run `operation` until it succeeds, the predicate rejects a failure, or
/// `max_attempts` is reached. The only error returned is [`RetryError`].
pub async fn with_retry<T, F, Fut>(
    mut operation: F,
    options: &RetryOptions,
    context: &ErrorContext,
) -> std::result::Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let logger = &options.logger;
    let operation_name = context.operation.as_deref().unwrap_or("operation");
    let max_attempts = options.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        let outcome = match &options.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = operation() => result,
                }
            }
            None => operation().await,
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    logger.info(
                        format!("{} succeeded after {} attempts", operation_name, attempt),
                        &attempt_metadata(context, attempt, max_attempts),
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        logger.warn(
            format!(
                "{} attempt {}/{} failed: {}",
                operation_name, attempt, max_attempts, err
            ),
            &attempt_metadata(context, attempt, max_attempts).with("error", err.to_string()),
        );

        let give_up = matches!(err, Error::Cancelled)
            || attempt >= max_attempts
            || !(options.retry_condition)(&err);
        if give_up {
            logger.error(
                format!("{} giving up after {} attempt(s)", operation_name, attempt),
                &attempt_metadata(context, attempt, max_attempts).with("error", err.to_string()),
            );
            return Err(RetryError {
                attempts: attempt,
                last_error: Box::new(err),
            });
        }

        let delay = options.backoff_delay(attempt);
        logger.debug(
            format!("retrying {} in {}ms", operation_name, delay.as_millis()),
            &attempt_metadata(context, attempt, max_attempts)
                .with("delay_ms", delay.as_millis() as u64),
        );

        match &options.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(RetryError {
                            attempts: attempt,
                            last_error: Box::new(Error::Cancelled),
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        attempt += 1;
    }
}

fn attempt_metadata(context: &ErrorContext, attempt: u32, max_attempts: u32) -> Metadata {
    let mut meta = Metadata::new()
        .with("attempt", attempt)
        .with("max_attempts", max_attempts);
    if let Some(ref op) = context.operation {
        meta.insert("operation", op.as_str());
    }
    if let Some(ref id) = context.correlation_id {
        meta.insert("correlation_id", id.as_str());
    }
    for (k, v) in &context.details {
        meta.insert(k.as_str(), v.as_str());
    }
    meta
}
