mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use techdetect::{
    ConfigManager, GlobalConfig, HttpFetcher, PageFetcher, RequestConfig, RetryPolicy, TechDetectError,
    fetch_with_retry,
};

use common::{MockServer, Route, closed_port};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&GlobalConfig::default()).unwrap()
}

#[tokio::test]
async fn test_redirect_chain_accumulates_bodies_and_first_seen_headers() {
    let server = MockServer::start().await;
    server
        .route("/a", Route::redirect(302, "/b", "A").header("Server", "edge").header("X-Hop", "a"))
        .route("/b", Route::redirect(301, "c", "B").header("Server", "origin").header("X-B", "b"))
        .route("/c", Route::ok("C").header("X-Hop", "c"));

    let ctx = fetcher().fetch(&server.url("/a"), &RequestConfig::default()).await.unwrap();

    assert_eq!(ctx.body, "A\nB\nC");
    assert_eq!(ctx.header("server"), Some("edge"));
    assert_eq!(ctx.header("x-hop"), Some("a"));
    assert_eq!(ctx.header("X-B"), Some("b"));
    assert_eq!(ctx.status, 200);
    assert_eq!(server.hits(), vec!["GET /a", "GET /b", "GET /c"]);
}

#[tokio::test]
async fn test_cross_host_redirect_is_not_followed() {
    let server = MockServer::start().await;
    let elsewhere = format!("http://localhost:{}/other", server.port());
    server
        .route("/start", Route::redirect(302, &elsewhere, "start"))
        .route("/other", Route::ok("other"));

    let ctx = fetcher().fetch(&server.url("/start"), &RequestConfig::default()).await.unwrap();

    assert_eq!(ctx.body, "start");
    assert_eq!(ctx.status, 302);
    assert_eq!(server.hits(), vec!["GET /start"]);
}

#[tokio::test]
async fn test_scheme_relative_same_host_redirect_is_followed() {
    let server = MockServer::start().await;
    let target = format!("//127.0.0.1:{}/d", server.port());
    server
        .route("/start", Route::redirect(307, &target, ""))
        .route("/d", Route::ok("landed"));

    let ctx = fetcher().fetch(&server.url("/start"), &RequestConfig::default()).await.unwrap();

    // 空响应体不参与拼接
    assert_eq!(ctx.body, "landed");
    assert_eq!(ctx.status, 200);
}

#[tokio::test]
async fn test_at_most_three_hops_are_followed() {
    let server = MockServer::start().await;
    for i in 0..4 {
        server.route(&format!("/r{}", i), Route::redirect(302, &format!("/r{}", i + 1), &format!("r{}", i)));
    }
    server.route("/r4", Route::ok("r4"));

    let ctx = fetcher().fetch(&server.url("/r0"), &RequestConfig::default()).await.unwrap();

    assert_eq!(ctx.body, "r0\nr1\nr2\nr3");
    assert_eq!(ctx.status, 302);
    assert_eq!(server.hits(), vec!["GET /r0", "GET /r1", "GET /r2", "GET /r3"]);
}

#[tokio::test]
async fn test_missing_location_halts() {
    let server = MockServer::start().await;
    server.route("/moved", Route::ok("moved").status(301));

    let ctx = fetcher().fetch(&server.url("/moved"), &RequestConfig::default()).await.unwrap();

    assert_eq!(ctx.body, "moved");
    assert_eq!(ctx.status, 301);
    assert_eq!(server.hits().len(), 1);
}

#[tokio::test]
async fn test_request_override_is_sent() {
    let server = MockServer::start().await;
    server.route("/graphql", Route::ok(r#"{"data":{"__typename":"Query"}}"#));

    let request = RequestConfig {
        method: Some("post".to_string()),
        headers: BTreeMap::from([("X-Probe".to_string(), "1".to_string())]),
        body: Some(json!({ "query": "{__typename}" })),
    };
    let ctx = fetcher().fetch(&server.url("/graphql"), &request).await.unwrap();

    assert!(ctx.body.contains("__typename"));
    assert_eq!(server.hits(), vec!["POST /graphql"]);
}

#[tokio::test]
async fn test_retry_exhaustion_wraps_last_error() {
    let port = closed_port().await;
    let policy = RetryPolicy {
        max_retries: 1,
        initial_backoff: Duration::from_millis(10),
    };
    let fetcher = HttpFetcher::new(&ConfigManager::custom().retry(policy).build()).unwrap();

    let err = fetch_with_retry(
        &fetcher,
        &format!("http://127.0.0.1:{}/", port),
        &RequestConfig::default(),
        &policy,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TechDetectError::RetryExhausted { retries: 1, .. }));
    assert!(!err.is_fatal_network());
    assert!(err.to_string().starts_with("Failed after 1 retries"));
}
