//! HTTP integration tests using TestAppBuilder.
//!
//! These tests drive the full router (index page, static files, the `/_api`
//! sub-router) and check the security headers on every kind of response.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, EXPIRES, PRAGMA,
            STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri,
    },
    response::IntoResponse,
    routing::any,
    Router,
};
use common::app_builder::{TestAppBuilder, INDEX_FILE, PUBLIC_DIR};
use secure_site::{
    app::AppBuilder,
    config::{Config, SecurityHeadersConfig},
    http::security::{SURROGATE_CONTROL, X_DOWNLOAD_OPTIONS, X_POWERED_BY},
};
use tower::ServiceExt;

async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("response")
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn header<'a>(response: &'a Response<Body>, name: &HeaderName) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .map(|v| v.to_str().expect("ascii header"))
}

/// Headers every response must carry under the default configuration.
fn assert_default_security_headers(response: &Response<Body>) {
    let frame = header(response, &X_FRAME_OPTIONS).expect("X-Frame-Options");
    assert!(frame.eq_ignore_ascii_case("deny"), "got {frame}");
    assert_eq!(header(response, &X_XSS_PROTECTION), Some("0"));
    assert_eq!(header(response, &X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
    assert_eq!(header(response, &X_DOWNLOAD_OPTIONS), Some("noopen"));
    assert_eq!(header(response, &X_DNS_PREFETCH_CONTROL), Some("off"));
    assert_eq!(header(response, &SURROGATE_CONTROL), Some("no-store"));
    assert_eq!(
        header(response, &CACHE_CONTROL),
        Some("no-store, no-cache, must-revalidate, proxy-revalidate")
    );
    assert_eq!(header(response, &PRAGMA), Some("no-cache"));
    assert_eq!(header(response, &EXPIRES), Some("0"));

    let csp = header(response, &CONTENT_SECURITY_POLICY).expect("Content-Security-Policy");
    assert!(csp.contains("default-src 'self'"), "got {csp}");
    assert!(csp.contains("script-src 'self' trusted-cdn.com"), "got {csp}");

    assert!(response.headers().get(STRICT_TRANSPORT_SECURITY).is_none());
    assert!(response.headers().get(X_POWERED_BY).is_none());
}

// =============================================================================
// Index Page Tests
// =============================================================================

#[tokio::test]
async fn test_index_served_with_security_headers() {
    let app = TestAppBuilder::new().build();

    let response = get(app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_default_security_headers(&response);
    assert!(header(&response, &CONTENT_TYPE)
        .expect("content type")
        .starts_with("text/html"));
    assert!(body_string(response).await.contains("<h1>Secure Site</h1>"));
}

#[tokio::test]
async fn test_index_only_answers_get() {
    let app = TestAppBuilder::new().build();

    let response = send(app, Method::POST, "/").await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_default_security_headers(&response);
}

// =============================================================================
// Static File Tests
// =============================================================================

#[tokio::test]
async fn test_static_asset_served_from_public_dir() {
    let app = TestAppBuilder::new().build();

    let response = get(app, "/style.css").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_default_security_headers(&response);
    assert!(header(&response, &CONTENT_TYPE)
        .expect("content type")
        .starts_with("text/css"));
    assert!(body_string(response).await.contains("font-family"));
}

#[tokio::test]
async fn test_missing_static_asset_is_not_found() {
    let app = TestAppBuilder::new().build();

    let response = get(app, "/does-not-exist.js").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_default_security_headers(&response);
}

// =============================================================================
// API Sub-router Tests
// =============================================================================

#[tokio::test]
async fn test_default_api_serves_build_info() {
    let app = TestAppBuilder::new().build();

    let response = get(app, "/_api/build-info").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_default_security_headers(&response);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json body");
    assert_eq!(json["version"], "1.2.3");
    assert_eq!(json["gitSha"], "abc123");
    assert_eq!(json["buildTime"], "2024-01-02T03:04:05+00:00");
}

#[tokio::test]
async fn test_default_api_unknown_path_returns_problem_details() {
    let app = TestAppBuilder::new().build();

    let response = get(app, "/_api/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_default_security_headers(&response);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json body");
    assert_eq!(json["status"], 404);
    assert_eq!(json["title"], "Not Found");
}

#[tokio::test]
async fn test_api_from_builder_default() {
    let mut config = Config::default();
    config.static_files.public_dir = PUBLIC_DIR.to_string();
    config.static_files.index_file = INDEX_FILE.to_string();
    let app = AppBuilder::new(config).build().expect("app");

    let response = get(app, "/_api/build-info").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json body");
    assert!(json["version"].is_string());
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let tag = headers
        .get("x-test")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        [
            (X_POWERED_BY, "PHP/8.3"),
            (STRICT_TRANSPORT_SECURITY, "max-age=7776000"),
        ],
        format!("{method} {uri} {tag}"),
    )
}

#[tokio::test]
async fn test_api_requests_forwarded_to_sub_router() {
    let api = Router::new().route("/echo/{id}", any(echo));
    let app = TestAppBuilder::new().with_api(api).build();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/_api/echo/42?x=1")
                .header("x-test", "passed-through")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    // Sub-router headers that conflict with the chain are stripped
    assert_default_security_headers(&response);
    assert_eq!(
        body_string(response).await,
        "PUT /echo/42?x=1 passed-through"
    );
}

// =============================================================================
// Security Header Configuration Tests
// =============================================================================

#[tokio::test]
async fn test_hsts_enabled_by_config() {
    let mut config = SecurityHeadersConfig::default();
    config.hsts.enabled = true;
    config.hsts.preload = true;

    let app = TestAppBuilder::new().with_security_headers(config).build();
    let response = get(app, "/").await;

    assert_eq!(
        header(&response, &STRICT_TRANSPORT_SECURITY),
        Some("max-age=7776000; includeSubDomains; preload")
    );
}

#[tokio::test]
async fn test_custom_frame_options_and_csp() {
    let mut config = SecurityHeadersConfig::default();
    config.frame_options = "SAMEORIGIN".to_string();
    config.csp.use_defaults = false;

    let app = TestAppBuilder::new().with_security_headers(config).build();
    let response = get(app, "/").await;

    assert_eq!(
        response.headers().get(X_FRAME_OPTIONS),
        Some(&HeaderValue::from_static("SAMEORIGIN"))
    );
    assert_eq!(
        header(&response, &CONTENT_SECURITY_POLICY),
        Some("default-src 'self';script-src 'self' trusted-cdn.com")
    );
}

#[tokio::test]
async fn test_security_headers_disabled() {
    let mut config = SecurityHeadersConfig::default();
    config.enabled = false;

    let api = Router::new().route("/echo/{id}", any(echo));
    let app = TestAppBuilder::new()
        .with_security_headers(config)
        .with_api(api)
        .build();

    let response = get(app, "/_api/echo/1").await;

    assert_eq!(response.status(), StatusCode::OK);
    for name in [
        X_FRAME_OPTIONS,
        X_CONTENT_TYPE_OPTIONS,
        X_XSS_PROTECTION,
        CONTENT_SECURITY_POLICY,
        CACHE_CONTROL,
    ] {
        assert!(response.headers().get(&name).is_none(), "{name} present");
    }
    // Nothing strips sub-router headers when the chain is off
    assert_eq!(header(&response, &X_POWERED_BY), Some("PHP/8.3"));
}

#[test]
fn test_invalid_security_config_fails_build() {
    let mut config = Config::default();
    config.security_headers.frame_options = "ALLOW-FROM".to_string();

    let result = AppBuilder::new(config).with_api(Router::new()).build();

    assert!(result.is_err());
}
