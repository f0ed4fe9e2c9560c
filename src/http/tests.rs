//! Tests for the HTTP module

use super::*;
use crate::engine::FailureCause;
use crate::error::Error;
use crate::pagination::FilterRequest;
use crate::session::SessionTokens;
use crate::types::BackoffType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .endpoint(format!("{}/wp-json/contracts/v1/filter", server.uri()))
        .timeout(Duration::from_secs(5))
        .probe_timeout(Duration::from_secs(5))
        .build();
    HttpClient::with_config(config).unwrap()
}

fn tokens() -> SessionTokens {
    SessionTokens::new()
        .with("cf_clearance", "clear-123")
        .with("_ga", "GA1.1.42")
}

fn page_body(page: u32, total: u32, items: usize) -> serde_json::Value {
    let items: Vec<_> = (0..items)
        .map(|i| json!({"id": i, "url": format!("https://e-play.pl/umowy/c-{i}/")}))
        .collect();
    json!({
        "items": items,
        "pagination": {"page": page, "total_pages": total, "quantity": 120}
    })
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.origin, "https://e-play.pl");
    assert_eq!(config.referer, "https://e-play.pl/umowy/");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.probe_timeout, Duration::from_secs(10));
    assert_eq!(config.backoff_type, BackoffType::Constant);
    assert!(config.user_agent.contains("Chrome/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .endpoint("https://mirror.example.com/filter")
        .site("https://mirror.example.com", "https://mirror.example.com/list/")
        .timeout(Duration::from_secs(60))
        .probe_timeout(Duration::from_secs(3))
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .accept_language("pl-PL")
        .build();

    assert_eq!(config.endpoint, "https://mirror.example.com/filter");
    assert_eq!(config.origin, "https://mirror.example.com");
    assert_eq!(config.referer, "https://mirror.example.com/list/");
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.probe_timeout, Duration::from_secs(3));
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert_eq!(config.accept_language, "pl-PL");
}

#[tokio::test]
async fn test_fetch_page_sends_filter_body_and_cookies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-json/contracts/v1/filter"))
        .and(header("cookie", "_ga=GA1.1.42; cf_clearance=clear-123"))
        .and(header("origin", "https://e-play.pl"))
        .and(header("referer", "https://e-play.pl/umowy/"))
        .and(header("cache-control", "no-cache"))
        .and(body_json(json!({
            "paged": 2,
            "quantity": 120,
            "subject": "",
            "retail": "",
            "acquisition": "",
            "startup": "",
            "rebranding": "",
            "payments": "",
            "date_from": "",
            "date_to": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(2, 3, 4)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let page = client
        .fetch_page(&FilterRequest::page(2, 120), &tokens())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 4);
    assert_eq!(page.pagination.page, Some(2));
    assert_eq!(page.pagination.total_pages, Some(3));
}

#[tokio::test]
async fn test_fetch_page_access_denied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>Just a moment...</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_page(&FilterRequest::page(1, 120), &tokens())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AccessDenied { status: 403 }));
    assert_eq!(err.failure_cause(), FailureCause::AuthExpired);
}

#[tokio::test]
async fn test_fetch_page_unauthorized_is_access_denied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_page(&FilterRequest::page(1, 120), &tokens())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AccessDenied { status: 401 }));
}

#[tokio::test]
async fn test_fetch_page_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_page(&FilterRequest::page(1, 120), &tokens())
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "Bad gateway");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_page_html_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<!DOCTYPE html><title>Hi</title>"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_page(&FilterRequest::page(1, 120), &tokens())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("DOCTYPE"));
}

#[tokio::test]
async fn test_fetch_page_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(1, 1, 1))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .endpoint(server.uri())
        .timeout(Duration::from_millis(50))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let err = client
        .fetch_page(&FilterRequest::page(1, 120), &tokens())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn test_fetch_page_without_tokens_sends_no_cookie() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1, 0)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    client
        .fetch_page(&FilterRequest::page(1, 120), &SessionTokens::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("cookie"));
}

#[tokio::test]
async fn test_probe_accepts_valid_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"paged": 1, "quantity": 1})))
        .and(header("cookie", "cf_clearance=good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 900, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let tokens = SessionTokens::new().with("cf_clearance", "good");
    assert!(client.probe(&tokens).await.unwrap());
}

#[tokio::test]
async fn test_probe_rejects_denied_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let tokens = SessionTokens::new().with("cf_clearance", "stale");
    assert!(!client.probe(&tokens).await.unwrap());
}

#[test]
fn test_calculate_backoff_constant() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_calculate_backoff_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_calculate_backoff_exponential_capped() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(500));
    assert_eq!(client.calculate_backoff(40), Duration::from_millis(500));
}

#[test]
fn test_page_delay_within_bounds() {
    let delay = PageDelay::new(Duration::from_millis(500), Duration::from_millis(1000));
    for _ in 0..200 {
        let pause = delay.sample();
        assert!(pause >= Duration::from_millis(500));
        assert!(pause <= Duration::from_millis(1000));
    }
}

#[test]
fn test_page_delay_swaps_reversed_bounds() {
    let delay = PageDelay::new(Duration::from_secs(2), Duration::from_secs(1));
    assert_eq!(delay.min(), Duration::from_secs(1));
    assert_eq!(delay.max(), Duration::from_secs(2));
}

#[test]
fn test_page_delay_fixed() {
    let delay = PageDelay::new(Duration::from_millis(250), Duration::from_millis(250));
    assert_eq!(delay.sample(), Duration::from_millis(250));
    assert_eq!(PageDelay::none().sample(), Duration::ZERO);
    assert_eq!(PageDelay::default().min(), Duration::from_millis(500));
}

#[tokio::test]
async fn test_page_delay_none_returns_immediately() {
    let pause = PageDelay::none().wait().await;
    assert_eq!(pause, Duration::ZERO);
}
