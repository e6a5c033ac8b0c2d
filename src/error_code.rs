//! Application error codes.
//!
//! This module defines the closed set of machine-readable codes every surfaced
//! failure is reduced to. Each code carries a stable string form, the HTTP status
//! it maps to, and whether it describes a fault the operator expects to see
//! during normal operation.
//!
//! ## Code Groups
//!
//! | Group     | Codes                                                        |
//! |-----------|--------------------------------------------------------------|
//! | upstream  | authentication, rate limit, request failed, timeout          |
//! | model     | model error, prompt error, response parsing                  |
//! | request   | validation, invalid input, unauthorized, not found           |
//! | internal  | processing, configuration, resource                          |
//!
//! ## Example
//!
//! ```rust
//! use travel_assist::error_code::ErrorCode;
//!
//! let code = ErrorCode::from_http_status(429);
//! assert_eq!(code, ErrorCode::RateLimitExceeded);
//! assert_eq!(code.as_str(), "RATE_LIMIT_EXCEEDED");
//! assert_eq!(code.status_code(), 429);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Upstream rejected the credentials or the bearer token.
    AuthenticationFailed,
    /// Upstream throttled the caller.
    RateLimitExceeded,
    /// Transport-level failure or an unsuccessful upstream response.
    RequestFailed,
    /// The call did not complete within its deadline.
    Timeout,
    /// The language-model provider returned an error.
    ModelError,
    /// A prompt could not be built from the conversation.
    PromptError,
    /// A response body could not be decoded.
    ResponseParsingError,
    /// Input failed a validation rule.
    ValidationError,
    /// The requested record does not exist.
    NotFound,
    /// Internal processing failed after the data was fetched.
    ProcessingError,
    /// Required configuration is missing or malformed.
    ConfigurationError,
    /// Generic failure of a downstream resource.
    ResourceError,
    /// Caller supplied unusable input.
    InvalidInput,
    /// Caller is not allowed to perform the operation.
    Unauthorized,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [ErrorCode; 14] = [
        Self::AuthenticationFailed,
        Self::RateLimitExceeded,
        Self::RequestFailed,
        Self::Timeout,
        Self::ModelError,
        Self::PromptError,
        Self::ResponseParsingError,
        Self::ValidationError,
        Self::NotFound,
        Self::ProcessingError,
        Self::ConfigurationError,
        Self::ResourceError,
        Self::InvalidInput,
        Self::Unauthorized,
    ];

    /// Returns the stable code string (e.g., `"AUTHENTICATION_FAILED"`).
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::ModelError => "MODEL_ERROR",
            Self::PromptError => "PROMPT_ERROR",
            Self::ResponseParsingError => "RESPONSE_PARSING_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ProcessingError => "PROCESSING_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::ResourceError => "RESOURCE_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// Returns the HTTP-equivalent status for this code.
    #[inline]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AuthenticationFailed => 401,
            Self::Unauthorized => 403,
            Self::RateLimitExceeded => 429,
            Self::RequestFailed => 503,
            Self::Timeout => 408,
            Self::ValidationError | Self::InvalidInput => 400,
            Self::NotFound => 404,
            Self::ModelError
            | Self::PromptError
            | Self::ResponseParsingError
            | Self::ProcessingError
            | Self::ConfigurationError
            | Self::ResourceError => 500,
        }
    }

    /// Parses a code string produced by [`ErrorCode::as_str`].
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    /// Maps an HTTP status code to the most likely `ErrorCode`.
    ///
    /// Statuses without a dedicated mapping fall back to `RequestFailed` for 5xx
    /// and `ResourceError` for everything else.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidInput,
            401 => Self::AuthenticationFailed,
            403 => Self::Unauthorized,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            422 => Self::ValidationError,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::RequestFailed,
            _ => Self::ResourceError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
