use crate::client::config::ClientConfig;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Method, Proxy, Response};
use std::env;
use std::time::Duration;

/// Thin wrapper over a pooled `reqwest::Client` bound to one base URL.
///
/// Every call is a single attempt. Retry, token handling and status
/// classification live in the client layer.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    fixed_headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(
                env::var("BOOKING_API_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(16),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("BOOKING_API_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fixed_headers: Self::fixed_headers(config)?,
        })
    }

    fn fixed_headers(config: &ClientConfig) -> Result<HeaderMap> {
        let value = |v: &str| {
            HeaderValue::from_str(v).map_err(|e| {
                Error::Transport(TransportError::Other(format!("invalid header value {:?}: {}", v, e)))
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(USER_AGENT, value(&config.user_agent)?);
        if let Some(origin) = config.origin.as_deref() {
            headers.insert(ORIGIN, value(origin)?);
            headers.insert(REFERER, value(&format!("{}/", origin.trim_end_matches('/')))?);
        }
        Ok(headers)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send one request. Non-2xx responses are returned, not turned into errors.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
        bearer: Option<&str>,
        correlation_id: Option<&str>,
    ) -> Result<Response> {
        let url = self.resolve(path);
        let mut request = self
            .client
            .request(method, &url)
            .headers(self.fixed_headers.clone());

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(id) = correlation_id {
            request = request.header("x-correlation-id", id);
        }

        request
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_connect())
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_decode() || e.is_body())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            TransportError::Other(_) => None,
        }
    }
}
