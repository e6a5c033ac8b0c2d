//! Client configuration, read from the environment or built in code.

use crate::{AppError, Result};
use std::fmt;
use std::time::Duration;

/// Items per page requested from the package list endpoint.
pub const DEFAULT_PAGE_SIZE: usize = 270;
/// Per-call network deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Cached tokens are reused for at most this long after issuance.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

const DEFAULT_USER_AGENT: &str = concat!("travel-assist/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub account_id: Option<String>,
    pub secret: Option<String>,
    pub timeout: Duration,
    pub page_size: usize,
    /// Sent as `Origin`, and with a trailing slash as `Referer`.
    pub origin: Option<String>,
    pub user_agent: String,
    pub login_path: String,
    pub packages_path: String,
    pub token_lifetime: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .field("origin", &self.origin)
            .field("user_agent", &self.user_agent)
            .field("login_path", &self.login_path)
            .field("packages_path", &self.packages_path)
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            account_id: None,
            secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            origin: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            login_path: "/auth/login".to_string(),
            packages_path: "/packages".to_string(),
            token_lifetime: TOKEN_LIFETIME,
        }
    }

    /// Read configuration from process environment variables.
    ///
    /// - `BOOKING_API_BASE_URL` (required)
    /// - `BOOKING_API_ACCOUNT_ID`, `BOOKING_API_SECRET` (checked at login time)
    /// - `BOOKING_API_TIMEOUT_SECS` (default 30)
    /// - `BOOKING_API_PAGE_SIZE` (default 270)
    /// - `BOOKING_API_ORIGIN`, `BOOKING_API_USER_AGENT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("BOOKING_API_BASE_URL").ok_or_else(|| {
            AppError::configuration("BOOKING_API_BASE_URL is not set").with_detail("variable", "BOOKING_API_BASE_URL")
        })?;

        let mut config = Self::new(base_url);
        config.account_id = non_empty("BOOKING_API_ACCOUNT_ID");
        config.secret = non_empty("BOOKING_API_SECRET");
        config.timeout = Duration::from_secs(
            non_empty("BOOKING_API_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );
        config.page_size = non_empty("BOOKING_API_PAGE_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        config.origin = non_empty("BOOKING_API_ORIGIN");
        if let Some(agent) = non_empty("BOOKING_API_USER_AGENT") {
            config.user_agent = agent;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_credentials(mut self, account_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_paths(mut self, login_path: impl Into<String>, packages_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self.packages_path = packages_path.into();
        self
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Checks the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            AppError::configuration(format!("invalid booking API base URL: {}", e))
                .with_detail("base_url", &self.base_url)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::configuration(format!(
                "unsupported scheme '{}' for booking API base URL",
                parsed.scheme()
            ))
            .with_detail("base_url", &self.base_url)
            .into());
        }
        Ok(())
    }

    /// Account id and secret, or a configuration error naming what is missing.
    pub(crate) fn credentials(&self) -> Result<(&str, &str)> {
        match (self.account_id.as_deref(), self.secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            (id, _) => {
                let missing = if id.map_or(true, str::is_empty) {
                    "BOOKING_API_ACCOUNT_ID"
                } else {
                    "BOOKING_API_SECRET"
                };
                Err(AppError::configuration("booking API credentials are not configured")
                    .with_detail("variable", missing)
                    .into())
            }
        }
    }
}
