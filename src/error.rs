use crate::error_code::ErrorCode;
use crate::resilience::retry::RetryError;
use crate::transport::TransportError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Structured error context captured at the failure site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    /// Operation that failed (e.g., "get_packages", "login").
    pub operation: Option<String>,
    /// Correlation id of the logical request the failure belongs to.
    pub correlation_id: Option<String>,
    /// Domain parameters present at the failure site (destination, duration, ...).
    pub details: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    /// Fill fields missing here from `other`. Existing values win.
    pub fn merge(mut self, other: &ErrorContext) -> Self {
        if self.operation.is_none() {
            self.operation = other.operation.clone();
        }
        if self.correlation_id.is_none() {
            self.correlation_id = other.correlation_id.clone();
        }
        for (k, v) in &other.details {
            self.details.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operation.is_none() && self.correlation_id.is_none() && self.details.is_empty()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation: {}", op));
        }
        if let Some(ref id) = self.correlation_id {
            parts.push(format!("correlation_id: {}", id));
        }
        for (k, v) in &self.details {
            parts.push(format!("{}: {}", k, v));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Which flavour of application error this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppErrorKind {
    General,
    /// Input was rejected before any upstream call.
    Validation,
    /// An upstream API reported or caused the failure.
    Api,
}

/// Typed application error surfaced by every public operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub status_code: u16,
    /// `false` for programmer errors and failures with no error semantics.
    pub is_operational: bool,
    pub kind: AppErrorKind,
    pub context: ErrorContext,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: code.status_code(),
            is_operational: true,
            kind: AppErrorKind::General,
            context: ErrorContext::new(),
        }
    }

    /// Input failed validation; `field` names the offending input.
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        let field: String = field.into();
        let mut err = Self::new(ErrorCode::ValidationError, message);
        err.kind = AppErrorKind::Validation;
        err.context = err.context.with_detail("field", field);
        err
    }

    /// Failure reported by an upstream API.
    pub fn api(code: ErrorCode, message: impl Into<String>, status_code: u16) -> Self {
        let mut err = Self::new(code, message);
        err.kind = AppErrorKind::Api;
        err.status_code = status_code;
        err
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context.merge(&self.context);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context = self.context.with_detail(key, value);
        self
    }

    pub fn non_operational(mut self) -> Self {
        self.is_operational = false;
        self
    }

    /// Authentication and authorization failures are never transient.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::AuthenticationFailed | ErrorCode::Unauthorized
        ) || matches!(self.status_code, 401 | 403)
    }
}

/// Unified error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    /// The upstream answered with a non-success status.
    #[error("Request failed with status {status}")]
    Remote { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,

    /// A failure payload with no error semantics, such as a panic message.
    #[error("Non-error failure: {value}")]
    Opaque { value: String },
}

impl Error {
    /// Build an `Opaque` error from a panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let value = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Error::Opaque { value }
    }

    /// HTTP status associated with this failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            Error::App(app) => Some(app.status_code),
            Error::Transport(t) => t.status(),
            Error::Retry(r) => r.last_error.http_status(),
            _ => None,
        }
    }

    pub fn as_app(&self) -> Option<&AppError> {
        match self {
            Error::App(app) => Some(app),
            Error::Retry(r) => r.last_error.as_app(),
            _ => None,
        }
    }

    /// Messages of this error and every underlying source, outermost first.
    pub fn source_chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(src) = current {
            chain.push(src.to_string());
            current = src.source();
        }
        chain
    }
}
