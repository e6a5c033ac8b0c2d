use crate::classify::classify;
use crate::client::config::ClientConfig;
use crate::client::token::TokenCache;
use crate::error_code::ErrorCode;
use crate::resilience::retry::{with_retry, RetryOptions};
use crate::telemetry::{Logger, Metadata};
use crate::transport::HttpTransport;
use crate::{AppError, Error, ErrorContext, Result};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Method, query and body of an authenticated call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// Authenticated client for the booking API.
///
/// Owns its token cache; share one client (or one `Arc<TokenCache>`) per process
/// to reuse tokens across requests.
pub struct BookingClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) transport: HttpTransport,
    pub(crate) tokens: Arc<TokenCache>,
    pub(crate) logger: Logger,
    pub(crate) retry: RetryOptions,
}

impl BookingClient {
    /// Build a client with default logger, retry options and a fresh token cache.
    pub fn new(config: ClientConfig) -> Result<Self> {
        crate::client::BookingClientBuilder::new(config).build()
    }

    /// Build a client from `BOOKING_API_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(crate) fn operation_context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new()
            .with_operation(operation)
            .with_correlation_id(Uuid::new_v4().to_string())
    }

    /// Let `App` and `Retry` errors through; classify everything else.
    ///
    /// Retry failures were already logged by the retry loop and are returned
    /// without another record.
    pub(crate) fn surface(&self, error: Error, context: &ErrorContext) -> Error {
        let error = match error {
            Error::Retry(_) => return error,
            Error::App(_) => error,
            other => Error::App(classify(other, context.clone())),
        };
        let mut meta = Metadata::new().with("error", error.to_string());
        if let Some(ref id) = context.correlation_id {
            meta.insert("correlation_id", id.as_str());
        }
        let operation = context.operation.as_deref().unwrap_or("booking_api");
        if error.as_app().map(|a| a.code) == Some(ErrorCode::ConfigurationError) {
            self.logger.error(format!("{} failed: configuration", operation), &meta);
        } else {
            self.logger.warn(format!("{} failed", operation), &meta);
        }
        error
    }

    /// Return a valid bearer token, logging in when the cache is absent or expired.
    pub async fn get_access_token(&self) -> Result<String> {
        let context = self.operation_context("get_access_token");
        self.access_token(&context)
            .await
            .map_err(|e| self.surface(e, &context))
    }

    pub(crate) async fn access_token(&self, context: &ErrorContext) -> Result<String> {
        if let Some(token) = self.tokens.current() {
            self.logger
                .debug("using cached access token", &Metadata::new());
            return Ok(token);
        }

        let (account_id, secret) = self.config.credentials()?;
        let body = serde_json::json!({ "accountId": account_id, "secret": secret });
        let transport = self.transport.clone();
        let login_path = self.config.login_path.clone();
        let options = self.retry.clone();
        let logger = self.logger.clone();
        let context = context.clone().with_detail("step", "login");

        self.tokens
            .get_or_refresh(move || async move {
                let label = format!(
                    "booking_api.login:{}",
                    context.correlation_id.as_deref().unwrap_or("-")
                );
                logger.time(label.as_str());
                let result = with_retry(
                    || login_once(&transport, &login_path, &body, &context),
                    &options,
                    &context,
                )
                .await;
                logger.time_end(&label);
                let token = result?;
                logger.info("obtained booking API access token", &Metadata::new());
                Ok::<_, Error>(token)
            })
            .await
    }

    /// Perform an authenticated call and return the decoded JSON body.
    ///
    /// A 401 clears the cached token so the next call logs in again; it is not
    /// retried within this call. 429 is not retried either. Other non-2xx
    /// statuses are retried when they are 5xx.
    pub async fn authenticated_request(&self, path: &str, options: RequestOptions) -> Result<Value> {
        let context = self
            .operation_context("authenticated_request")
            .with_detail("path", path);
        self.send_authenticated(path, &options, &context)
            .await
            .map_err(|e| self.surface(e, &context))
    }

    pub(crate) async fn send_authenticated(
        &self,
        path: &str,
        options: &RequestOptions,
        context: &ErrorContext,
    ) -> Result<Value> {
        with_retry(
            || self.attempt_authenticated(path, options, context),
            &self.retry,
            context,
        )
        .await
        .map_err(Error::from)
    }

    async fn attempt_authenticated(
        &self,
        path: &str,
        options: &RequestOptions,
        context: &ErrorContext,
    ) -> Result<Value> {
        let token = self.access_token(context).await?;
        let response = self
            .transport
            .execute(
                options.method.clone(),
                path,
                &options.query,
                options.body.as_ref(),
                Some(&token),
                context.correlation_id.as_deref(),
            )
            .await?;

        let status = response.status().as_u16();
        match status {
            401 => {
                self.tokens.invalidate_token(&token);
                self.logger.warn(
                    "booking API rejected access token; cleared cached token",
                    &Metadata::new().with("path", path),
                );
                Err(AppError::api(
                    ErrorCode::AuthenticationFailed,
                    "Booking API rejected the access token",
                    401,
                )
                .with_context(context.clone())
                .into())
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let mut err = AppError::api(
                    ErrorCode::RateLimitExceeded,
                    "Booking API rate limit exceeded",
                    429,
                )
                .with_context(context.clone());
                if let Some(after) = retry_after {
                    err = err.with_detail("retry_after", after);
                }
                Err(err.into())
            }
            s if !(200..300).contains(&s) => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Remote { status, body })
            }
            _ => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| Error::Transport(e.into()))?;
                if text.trim().is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::from_str(&text)?)
                }
            }
        }
    }
}

/// One login attempt. Rejected credentials and a missing token are
/// authentication failures; other non-2xx statuses surface as `Remote`.
async fn login_once(
    transport: &HttpTransport,
    login_path: &str,
    body: &Value,
    context: &ErrorContext,
) -> Result<String> {
    let response = transport
        .execute(
            Method::POST,
            login_path,
            &[],
            Some(body),
            None,
            context.correlation_id.as_deref(),
        )
        .await?;

    let status = response.status().as_u16();
    if matches!(status, 401 | 403) {
        return Err(AppError::api(
            ErrorCode::AuthenticationFailed,
            format!("Booking API login rejected with status {}", status),
            status,
        )
        .with_context(context.clone())
        .into());
    }
    if status == 429 {
        return Err(AppError::api(
            ErrorCode::RateLimitExceeded,
            "Booking API login rate limited",
            429,
        )
        .with_context(context.clone())
        .into());
    }
    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Remote { status, body });
    }

    let text = response
        .text()
        .await
        .map_err(|e| Error::Transport(e.into()))?;
    let payload: Value = serde_json::from_str(&text)?;
    extract_token(&payload).ok_or_else(|| {
        AppError::api(
            ErrorCode::AuthenticationFailed,
            "Booking API login response did not include an access token",
            401,
        )
        .with_context(context.clone())
        .into()
    })
}

fn extract_token(payload: &Value) -> Option<String> {
    let candidates = [
        payload.get("token"),
        payload.get("accessToken"),
        payload.get("result").and_then(|r| r.get("token")),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}
