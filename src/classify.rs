//! Error classification and user-facing messages.
//!
//! [`classify`] reduces any crate [`Error`] to one [`AppError`]. Structured
//! information wins (an existing `AppError`, an HTTP status, transport flags);
//! only when none is available does it fall back to matching the error text.

use crate::error_code::ErrorCode;
use crate::telemetry::{Logger, Metadata};
use crate::{AppError, Error, ErrorContext};
use once_cell::sync::Lazy;
use regex::Regex;

static SERVER_STATUS_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b5\d{2}\b").unwrap());

const MAX_BODY_IN_CONTEXT: usize = 512;

const GENERIC_UNAVAILABLE: &str =
    "Our travel service is temporarily unavailable. Please try again in a little while.";

/// Whether error text reads like a transient network fault.
///
/// Matches connection reset, host not found, fetch or timeout wording, and any
/// standalone 5xx status token.
pub fn looks_like_network_failure(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("econnreset")
        || m.contains("connection reset")
        || m.contains("enotfound")
        || m.contains("econnrefused")
        || m.contains("fetch")
        || m.contains("timeout")
        || m.contains("timed out")
        || m.contains("etimedout")
        || SERVER_STATUS_TOKEN.is_match(&m)
}

/// Text-only classification used when no structured signal exists.
pub fn classify_message(message: &str) -> ErrorCode {
    let m = message.to_lowercase();
    if m.contains("fetch")
        || m.contains("econnreset")
        || m.contains("enotfound")
        || m.contains("econnrefused")
    {
        ErrorCode::RequestFailed
    } else if m.contains("timeout") || m.contains("etimedout") || m.contains("timed out") {
        ErrorCode::Timeout
    } else if m.contains("401") || m.contains("unauthorized") {
        ErrorCode::AuthenticationFailed
    } else if m.contains("429") || m.contains("rate limit") {
        ErrorCode::RateLimitExceeded
    } else {
        ErrorCode::ResourceError
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn with_origin(context: ErrorContext, error: &Error) -> ErrorContext {
    let chain = error.source_chain();
    let mut context = context.with_detail("original_message", &chain[0]);
    if chain.len() > 1 {
        context = context.with_detail("source_chain", chain[1..].join(" <- "));
    }
    context
}

/// Reduce any failure to an [`AppError`].
///
/// An `AppError` is returned unchanged. A `RetryError` is classified by its last
/// error, with the attempt count recorded in the context.
pub fn classify(error: Error, context: ErrorContext) -> AppError {
    match error {
        Error::App(app) => app,
        Error::Retry(retry) => {
            let attempts = retry.attempts;
            classify(*retry.last_error, context.with_detail("attempts", attempts))
        }
        Error::Remote { status, ref body } => {
            let code = ErrorCode::from_http_status(status);
            let context = context
                .with_detail("upstream_status", status)
                .with_detail("response_body", truncate(body, MAX_BODY_IN_CONTEXT));
            AppError::api(code, error.to_string(), code.status_code()).with_context(context)
        }
        Error::Transport(ref t) => {
            let code = if t.is_timeout() {
                ErrorCode::Timeout
            } else if t.is_connect() {
                ErrorCode::RequestFailed
            } else if t.is_decode() {
                ErrorCode::ResponseParsingError
            } else {
                classify_message(&t.to_string())
            };
            let context = with_origin(context, &error);
            AppError::api(code, t.to_string(), code.status_code()).with_context(context)
        }
        Error::Serialization(ref e) => {
            let context = with_origin(context, &error);
            AppError::new(ErrorCode::ResponseParsingError, e.to_string()).with_context(context)
        }
        Error::Cancelled => AppError::new(ErrorCode::ProcessingError, "Operation cancelled")
            .with_context(context.with_detail("cancelled", true)),
        Error::Opaque { ref value } => {
            AppError::new(ErrorCode::ResourceError, "An unexpected failure occurred")
                .non_operational()
                .with_context(context.with_detail("raw_value", value))
        }
    }
}

/// Classify `error` and log it. Configuration failures log at error level so an
/// operator notices them; everything else logs as a warning.
pub fn handle_error(error: Error, context: ErrorContext, logger: &Logger) -> AppError {
    let app = classify(error, context);

    let mut meta = Metadata::new()
        .with("code", app.code.as_str())
        .with("status_code", app.status_code)
        .with("operational", app.is_operational);
    if let Some(ref op) = app.context.operation {
        meta.insert("operation", op.as_str());
    }
    if let Some(ref id) = app.context.correlation_id {
        meta.insert("correlation_id", id.as_str());
    }
    for (k, v) in &app.context.details {
        meta.insert(k.as_str(), v.as_str());
    }

    if app.code == ErrorCode::ConfigurationError || !app.is_operational {
        logger.error(format!("{}", app), &meta);
    } else {
        logger.warn(format!("{}", app), &meta);
    }
    app
}

/// Pre-written, non-technical message for an error. Never empty.
pub fn create_user_friendly_message(error: &AppError) -> String {
    message_for_code(error.code).to_string()
}

/// Same as [`create_user_friendly_message`] for a code string; unknown codes
/// get the generic message.
pub fn user_message_for_code(code: &str) -> String {
    ErrorCode::parse(code)
        .map(message_for_code)
        .unwrap_or(GENERIC_UNAVAILABLE)
        .to_string()
}

fn message_for_code(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::AuthenticationFailed => {
            "I'm having trouble connecting to our booking system right now. Please try again in a few minutes."
        }
        ErrorCode::RateLimitExceeded => {
            "We're handling a lot of requests at the moment. Please wait a few seconds and try again."
        }
        ErrorCode::RequestFailed => {
            "I couldn't reach our travel packages service. Please try again shortly."
        }
        ErrorCode::Timeout => {
            "The search is taking longer than expected. Please try again, or narrow it down to a specific destination."
        }
        ErrorCode::ModelError | ErrorCode::PromptError => {
            "I had trouble understanding that. Could you rephrase your request?"
        }
        ErrorCode::ResponseParsingError => {
            "I received an unexpected response while looking up packages. Please try again."
        }
        ErrorCode::ValidationError | ErrorCode::InvalidInput => {
            "Some of those details don't look right. Please check the destination and trip length and try again."
        }
        ErrorCode::NotFound => {
            "I couldn't find any packages matching that. Try a different destination or trip length."
        }
        ErrorCode::Unauthorized => "Sorry, I'm not able to access that information.",
        _ => GENERIC_UNAVAILABLE,
    }
}
