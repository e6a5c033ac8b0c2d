use crate::client::config::ClientConfig;
use crate::client::core::BookingClient;
use crate::client::token::TokenCache;
use crate::resilience::retry::RetryOptions;
use crate::telemetry::Logger;
use crate::transport::HttpTransport;
use crate::Result;
use std::sync::Arc;

/// Builder for [`BookingClient`] with injectable collaborators.
///
/// Keep this surface area small: configuration is required, everything else
/// has a production default.
pub struct BookingClientBuilder {
    config: ClientConfig,
    logger: Option<Logger>,
    tokens: Option<Arc<TokenCache>>,
    retry: Option<RetryOptions>,
}

impl BookingClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            logger: None,
            tokens: None,
            retry: None,
        }
    }

    /// Inject a logger. Default writes through `tracing`.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Share a token cache between clients. Default is a fresh cache using the
    /// configured token lifetime.
    pub fn token_cache(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Override retry behaviour for the login and data calls.
    ///
    /// Default is [`RetryOptions::api`]. A custom predicate is used as given.
    pub fn retry_options(mut self, options: RetryOptions) -> Self {
        self.retry = Some(options);
        self
    }

    pub fn build(self) -> Result<BookingClient> {
        self.config.validate()?;

        let logger = self.logger.unwrap_or_default();
        let transport = HttpTransport::new(&self.config)?;
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(TokenCache::new(self.config.token_lifetime)));
        let retry = self
            .retry
            .unwrap_or_else(RetryOptions::api)
            .with_logger(logger.clone());

        Ok(BookingClient {
            config: Arc::new(self.config),
            transport,
            tokens,
            logger,
            retry,
        })
    }
}
