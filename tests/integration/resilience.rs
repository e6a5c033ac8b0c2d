//! Retry and rate-limit behaviour of authenticated calls

use crate::integration::mock_server::MockServerFixture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use travel_assist::{
    create_user_friendly_message, handle_error, BookingClientBuilder, Error, ErrorCode,
    ErrorContext, LogLevel, Logger, RetryOptions,
};

#[tokio::test]
async fn test_server_errors_are_retried_up_to_limit() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let failing = fixture
        .mock_status("GET", "/packages", 502, r#"{"message":"bad gateway"}"#, 3)
        .await;

    let err = fixture.client().get_packages(None).await.unwrap_err();
    match &err {
        Error::Retry(retry) => {
            assert_eq!(retry.attempts, 3);
            assert_eq!(retry.last_error.http_status(), Some(502));
        }
        other => panic!("expected retry error, got {:?}", other),
    }
    assert!(fixture.logs.records_at(LogLevel::Warn).len() >= 3);
    assert!(fixture.logs.contains("giving up after 3 attempt(s)"));
    assert_eq!(fixture.logs.records_at(LogLevel::Error).len(), 1);
    assert!(!fixture.logs.contains("get_packages failed"));

    failing.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let limited = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/packages")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "60")
            .with_body(r#"{"message":"slow down"}"#)
            .expect(1)
            .create_async()
            .await
    };

    let err = fixture.client().get_packages(Some("Bali")).await.unwrap_err();
    let app = err.as_app().unwrap();
    assert_eq!(app.code, ErrorCode::RateLimitExceeded);
    assert_eq!(app.status_code, 429);
    assert_eq!(app.context.detail("retry_after"), Some("60"));
    assert_eq!(app.context.detail("search"), Some("Bali"));

    limited.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let bad_request = fixture
        .mock_status("GET", "/packages", 400, r#"{"message":"bad limit"}"#, 1)
        .await;

    let err = fixture.client().get_packages(None).await.unwrap_err();
    let app = handle_error(err, ErrorContext::new(), &Logger::default());
    assert_eq!(app.code, ErrorCode::InvalidInput);
    assert_eq!(app.context.detail("attempts"), Some("1"));
    assert_eq!(app.context.detail("response_body"), Some(r#"{"message":"bad limit"}"#));
    assert!(!create_user_friendly_message(&app).is_empty());

    bad_request.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_host_is_retried_and_classified() {
    // Port 9 (discard) on localhost is not expected to accept connections.
    let config = travel_assist::ClientConfig::new("http://127.0.0.1:9")
        .with_credentials("agency", "secret")
        .with_timeout(Duration::from_secs(2));
    let client = BookingClientBuilder::new(config)
        .retry_options(MockServerFixture::fast_retry())
        .build()
        .unwrap();

    let err = client.get_access_token().await.unwrap_err();
    let retry = match err {
        Error::Retry(retry) => retry,
        other => panic!("expected retry error, got {:?}", other),
    };
    assert_eq!(retry.attempts, 3);

    let app = travel_assist::classify(Error::Retry(retry), ErrorContext::new());
    assert!(matches!(app.code, ErrorCode::RequestFailed | ErrorCode::Timeout));
}

#[tokio::test]
async fn test_cancellation_stops_backoff() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let _failing = fixture
        .mock_status("GET", "/packages", 503, "{}", 1)
        .await;

    let token = CancellationToken::new();
    let client = BookingClientBuilder::new(fixture.config())
        .retry_options(
            RetryOptions::api()
                .with_base_delay(Duration::from_secs(30))
                .with_max_delay(Duration::from_secs(30))
                .with_cancellation(token.clone()),
        )
        .build()
        .unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.get_packages(None).await.unwrap_err();
    canceller.await.unwrap();

    match err {
        Error::Retry(retry) => assert!(retry.was_cancelled()),
        other => panic!("expected cancelled retry, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}
