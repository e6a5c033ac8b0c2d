//! Package list pagination, detail lookup and filtering

use crate::integration::mock_server::MockServerFixture;
use mockito::Matcher;
use serde_json::json;
use travel_assist::{classify, AppErrorKind, Error, ErrorCode, ErrorContext, PackageFilter};

#[tokio::test]
async fn test_pagination_stops_on_short_page() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-1", 1).await;
    let first = fixture.mock_page("tok-1", 0, 270).await;
    let second = fixture.mock_page("tok-1", 270, 270).await;
    let third = fixture.mock_page("tok-1", 540, 40).await;

    let packages = fixture.client().get_packages(None).await.unwrap();
    assert_eq!(packages.len(), 580);
    assert_eq!(packages[0].package_id().as_deref(), Some("PKG-0"));
    assert_eq!(packages[579].package_id().as_deref(), Some("PKG-579"));

    login.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
}

#[tokio::test]
async fn test_empty_first_page_makes_one_call() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let only = fixture.mock_page("tok-1", 0, 0).await;

    let packages = fixture.client().get_packages(None).await.unwrap();
    assert!(packages.is_empty());

    only.assert_async().await;
}

#[tokio::test]
async fn test_search_term_is_forwarded() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let search = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/packages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "Kerala".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({ "result": { "docs": [
                    { "packageId": "K-1", "destinationName": "Kerala", "noOfDays": 5, "startFrom": 18500 },
                    { "packageId": "K-2", "destinationName": "Kerala", "noOfDays": 3, "startFrom": 9000 }
                ] } })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await
    };

    let packages = fixture
        .client()
        .get_packages(Some("  Kerala "))
        .await
        .unwrap();
    assert_eq!(packages.len(), 2);

    search.assert_async().await;
}

#[tokio::test]
async fn test_search_packages_filters_client_side() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let _list = fixture
        .mock_status(
            "GET",
            "/packages",
            200,
            &json!({ "result": { "docs": [
                { "packageId": "G-1", "destinationName": "Goa", "noOfDays": 5, "startFrom": "14,999" },
                { "packageId": "G-2", "destinationName": "North Goa", "noOfDays": 5, "startFrom": 32000 },
                { "packageId": "G-3", "destinationName": "Goa", "noOfDays": 3, "startFrom": 8000 }
            ] } })
            .to_string(),
            1,
        )
        .await;

    let filter = PackageFilter::new()
        .with_destination("goa")
        .with_days(5)
        .with_max_price(20000.0);
    let packages = fixture.client().search_packages(&filter).await.unwrap();
    let ids: Vec<_> = packages.iter().filter_map(|p| p.package_id()).collect();
    assert_eq!(ids, vec!["G-1"]);
}

#[tokio::test]
async fn test_search_packages_rejects_zero_days() {
    let fixture = MockServerFixture::new().await;
    let login = fixture.mock_token("tok-1", 0).await;

    let err = fixture
        .client()
        .search_packages(&PackageFilter::new().with_days(0))
        .await
        .unwrap_err();
    let app = err.as_app().unwrap();
    assert_eq!(app.kind, AppErrorKind::Validation);
    assert_eq!(app.context.detail("field"), Some("days"));

    login.assert_async().await;
}

#[tokio::test]
async fn test_get_package_by_id_found() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let detail = fixture
        .mock_status(
            "GET",
            "/packages/PKG-42",
            200,
            r#"{"result":{"packageId":"PKG-42","packageName":"Bali Bliss","itinerary":[{"day":1}]}}"#,
            1,
        )
        .await;

    let package = fixture
        .client()
        .get_package_by_id("PKG-42")
        .await
        .unwrap()
        .expect("package present");
    assert_eq!(package.package_name(), Some("Bali Bliss"));
    assert_eq!(package.get("itinerary"), Some(&json!([{ "day": 1 }])));

    detail.assert_async().await;
}

#[tokio::test]
async fn test_get_package_by_id_absent() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let null_result = fixture
        .mock_status("GET", "/packages/missing", 200, r#"{"result":null}"#, 1)
        .await;
    let not_found = fixture
        .mock_status("GET", "/packages/gone", 404, r#"{"message":"not found"}"#, 1)
        .await;
    let client = fixture.client();

    assert!(client.get_package_by_id("missing").await.unwrap().is_none());
    assert!(client.get_package_by_id("gone").await.unwrap().is_none());

    null_result.assert_async().await;
    not_found.assert_async().await;
}

#[tokio::test]
async fn test_get_package_by_id_escapes_path_segment() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let detail = fixture
        .mock_status(
            "GET",
            "/packages/Goa%202024%2F5N",
            200,
            r#"{"result":{"packageId":"Goa 2024/5N"}}"#,
            1,
        )
        .await;

    let package = fixture
        .client()
        .get_package_by_id("Goa 2024/5N")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(package.package_id().as_deref(), Some("Goa 2024/5N"));

    detail.assert_async().await;
}

#[tokio::test]
async fn test_empty_id_is_validation_error() {
    let fixture = MockServerFixture::new().await;
    let err = fixture.client().get_package_by_id("  ").await.unwrap_err();
    assert_eq!(err.as_app().map(|a| a.code), Some(ErrorCode::ValidationError));
}

#[tokio::test]
async fn test_malformed_list_is_parsing_error() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let _list = fixture
        .mock_status("GET", "/packages", 200, "<html>maintenance</html>", 1)
        .await;

    let err = fixture.client().get_packages(None).await.unwrap_err();
    assert!(
        matches!(err, Error::Retry(ref r) if r.attempts == 1 && matches!(*r.last_error, Error::Serialization(_)))
    );

    let app = classify(err, ErrorContext::new().with_operation("get_packages"));
    assert_eq!(app.code, ErrorCode::ResponseParsingError);
    assert_eq!(app.context.detail("attempts"), Some("1"));
    assert_eq!(app.context.operation.as_deref(), Some("get_packages"));
}

#[tokio::test]
async fn test_failed_listing_releases_its_timer() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let client = fixture.client();

    let rejected = fixture
        .mock_status("GET", "/packages", 400, r#"{"message":"bad limit"}"#, 3)
        .await;
    for _ in 0..3 {
        assert!(client.get_packages(Some("Goa")).await.is_err());
    }
    assert_eq!(client.logger().active_timers(), 0);
    assert!(!fixture.logs.contains("does not exist"));
    rejected.assert_async().await;

    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let _wrong_shape = fixture
        .mock_status("GET", "/packages", 200, r#"{"result":{"docs":"nope"}}"#, 1)
        .await;
    let client = fixture.client();
    let err = client.get_packages(None).await.unwrap_err();
    assert_eq!(err.as_app().map(|a| a.code), Some(ErrorCode::ResponseParsingError));
    assert_eq!(client.logger().active_timers(), 0);
}

#[tokio::test]
async fn test_listing_preserves_raw_package_fields() {
    let fixture = MockServerFixture::new().await;
    let _login = fixture.mock_token("tok-1", 1).await;
    let _list = fixture
        .mock_status(
            "GET",
            "/packages",
            200,
            r#"{"result":{"docs":[{"packageId":"b","noOfDays":"5 Days"},{"packageName":"No Id","noOfDays":"5"}]}}"#,
            1,
        )
        .await;

    let packages = fixture.client().get_packages(None).await.unwrap();
    assert_eq!(packages.len(), 2);
    assert_eq!(
        serde_json::to_value(&packages[0]).unwrap(),
        json!({"packageId": "b", "noOfDays": "5 Days"})
    );
    assert_eq!(packages[1].package_id(), None);
    assert_eq!(packages[1].get("noOfDays"), Some(&json!("5")));

    let five_days = PackageFilter::new().with_days(5).apply(packages);
    assert_eq!(five_days.len(), 2);
}
