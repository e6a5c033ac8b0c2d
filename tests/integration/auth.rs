//! Token lifecycle against a mock booking API

use crate::integration::mock_server::{MockServerFixture, ORIGIN};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use travel_assist::{
    BookingClientBuilder, ClientConfig, ErrorCode, RequestOptions, TokenCache, TokenState,
};

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-1", 1).await;
    let client = fixture.client();

    assert_eq!(client.get_access_token().await.unwrap(), "tok-1");
    assert_eq!(client.get_access_token().await.unwrap(), "tok-1");
    assert_eq!(client.token_cache().state(), TokenState::Valid);

    login.assert_async().await;
}

#[tokio::test]
async fn test_result_wrapped_token_is_accepted() {
    let fixture = MockServerFixture::new().await;
    let login = fixture
        .mock_login(200, json!({ "result": { "token": "wrapped" } }), 1)
        .await;

    assert_eq!(fixture.client().get_access_token().await.unwrap(), "wrapped");
    login.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_login() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-shared", 1).await;
    let client = fixture.client();

    let (a, b, c, d, e) = tokio::join!(
        client.get_access_token(),
        client.get_access_token(),
        client.get_access_token(),
        client.get_access_token(),
        client.get_access_token(),
    );
    for token in [a, b, c, d, e] {
        assert_eq!(token.unwrap(), "tok-shared");
    }

    login.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_triggers_new_login() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("short-lived", 2).await;
    let client = fixture.client_with(fixture.config().with_token_lifetime(Duration::ZERO));

    client.get_access_token().await.unwrap();
    assert_eq!(client.token_cache().state(), TokenState::Expired);
    client.get_access_token().await.unwrap();

    login.assert_async().await;
}

#[tokio::test]
async fn test_missing_token_field_is_authentication_error() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_login(200, json!({ "status": "ok" }), 1).await;
    let client = fixture.client();

    let err = client.get_access_token().await.unwrap_err();
    assert_eq!(err.as_app().map(|a| a.code), Some(ErrorCode::AuthenticationFailed));
    assert_eq!(client.token_cache().state(), TokenState::Absent);

    login.assert_async().await;
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let fixture = MockServerFixture::new().await;
    let login = fixture
        .mock_login(401, json!({ "message": "invalid credentials" }), 1)
        .await;

    let err = fixture.client().get_access_token().await.unwrap_err();
    assert_eq!(err.http_status(), Some(401));
    assert!(err.as_app().unwrap().is_auth_failure());

    login.assert_async().await;
}

#[tokio::test]
async fn test_login_server_errors_are_retried() {
    let fixture = MockServerFixture::new().await;
    let login = fixture
        .mock_login(503, json!({ "message": "maintenance" }), 3)
        .await;

    let err = fixture.client().get_access_token().await.unwrap_err();
    match err {
        travel_assist::Error::Retry(retry) => {
            assert_eq!(retry.attempts, 3);
            assert_eq!(retry.last_error.http_status(), Some(503));
        }
        other => panic!("expected retry error, got {:?}", other),
    }

    login.assert_async().await;
}

#[tokio::test]
async fn test_missing_credentials_is_configuration_error() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("never", 0).await;
    let client = fixture.client_with(ClientConfig::new(&fixture.base_url));

    let err = client.get_access_token().await.unwrap_err();
    let app = err.as_app().expect("app error");
    assert_eq!(app.code, ErrorCode::ConfigurationError);
    assert_eq!(app.context.detail("variable"), Some("BOOKING_API_ACCOUNT_ID"));
    assert!(fixture.logs.contains("get_access_token failed: configuration"));

    login.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_response_clears_token_without_retry() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-stale", 2).await;
    let packages = fixture
        .mock_status("GET", "/packages", 401, r#"{"message":"token expired"}"#, 2)
        .await;
    let client = fixture.client();

    let err = client.get_packages(None).await.unwrap_err();
    assert_eq!(err.as_app().map(|a| a.code), Some(ErrorCode::AuthenticationFailed));
    assert_eq!(client.token_cache().state(), TokenState::Absent);

    // The next call logs in again instead of reusing the rejected token.
    client.get_packages(None).await.unwrap_err();

    login.assert_async().await;
    packages.assert_async().await;
}

#[tokio::test]
async fn test_fixed_headers_and_bearer_are_sent() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-h", 1).await;
    let echo = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/bookings/quote")
            .match_header("authorization", "Bearer tok-h")
            .match_header("content-type", "application/json")
            .match_header("cache-control", "no-cache")
            .match_header("origin", ORIGIN)
            .match_header("referer", format!("{}/", ORIGIN).as_str())
            .match_header("user-agent", mockito::Matcher::Regex("^travel-assist/".into()))
            .match_header("x-correlation-id", mockito::Matcher::Any)
            .match_body(mockito::Matcher::Json(json!({ "packageId": "PKG-1" })))
            .with_status(200)
            .with_body(r#"{"result":{"price":18500}}"#)
            .expect(1)
            .create_async()
            .await
    };

    let value = fixture
        .client()
        .authenticated_request(
            "/bookings/quote",
            RequestOptions::post(json!({ "packageId": "PKG-1" })),
        )
        .await
        .unwrap();
    assert_eq!(value["result"]["price"], 18500);

    echo.assert_async().await;
}

#[tokio::test]
async fn test_clients_can_share_a_token_cache() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-pooled", 1).await;
    let cache = Arc::new(TokenCache::new(Duration::from_secs(3600)));

    let first = BookingClientBuilder::new(fixture.config())
        .token_cache(cache.clone())
        .build()
        .unwrap();
    let second = BookingClientBuilder::new(fixture.config())
        .token_cache(cache.clone())
        .build()
        .unwrap();

    assert_eq!(first.get_access_token().await.unwrap(), "tok-pooled");
    assert_eq!(second.get_access_token().await.unwrap(), "tok-pooled");

    login.assert_async().await;
}
