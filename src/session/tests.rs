//! Tests for the session module

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Refresher that hands out numbered tokens and counts calls
#[derive(Default)]
struct CountingRefresher {
    calls: AtomicU32,
    fail: bool,
}

#[async_trait]
impl SessionProvider for CountingRefresher {
    async fn get_tokens(&self) -> crate::Result<TokenGrant> {
        self.refresh_tokens().await.map(TokenGrant::unverified)
    }

    async fn refresh_tokens(&self) -> crate::Result<SessionTokens> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(Error::MissingClearance);
        }
        Ok(SessionTokens::new().with(CLEARANCE_COOKIE, format!("fresh-{n}")))
    }
}

fn prober(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .endpoint(server.uri())
        .probe_timeout(Duration::from_secs(5))
        .build();
    HttpClient::with_config(config).unwrap()
}

// ============================================================================
// SessionTokens
// ============================================================================

#[test]
fn test_cookie_header_is_sorted_and_joined() {
    let tokens = SessionTokens::new()
        .with("cf_clearance", "abc")
        .with("_ga", "GA1.1.1")
        .with("_ga_ZH4G2KK1JY", "GS1.1.2");

    assert_eq!(
        tokens.cookie_header(),
        "_ga=GA1.1.1; _ga_ZH4G2KK1JY=GS1.1.2; cf_clearance=abc"
    );
    assert_eq!(tokens.len(), 3);
    assert!(tokens.has_clearance());
}

#[test]
fn test_empty_values_are_ignored() {
    let tokens = SessionTokens::new().with("cf_clearance", "").with("_ga", "x");
    assert!(!tokens.has_clearance());
    assert_eq!(tokens.len(), 1);
}

#[test]
fn test_from_cookie_string() {
    let tokens = SessionTokens::from_cookie_string(" cf_clearance=a=b=c ; _ga=GA1; junk ;=novalue");
    assert_eq!(tokens.clearance(), Some("a=b=c"));
    assert_eq!(tokens.get("_ga"), Some("GA1"));
    assert_eq!(tokens.len(), 2);
}

#[test]
fn test_from_env_lines_maps_known_keys() {
    let text = "\
# written by refresh helper
CF_CLEARANCE=\"clear\"
export GA_COOKIE='GA1.1.9'

GA_ZH4G2KK1JY=GS1
_extra=raw
not a pair
";
    let tokens = SessionTokens::from_env_lines(text);
    assert_eq!(tokens.clearance(), Some("clear"));
    assert_eq!(tokens.get("_ga"), Some("GA1.1.9"));
    assert_eq!(tokens.get("_ga_ZH4G2KK1JY"), Some("GS1"));
    assert_eq!(tokens.get("_extra"), Some("raw"));
    assert_eq!(tokens.len(), 4);
}

#[test]
fn test_to_env_lines() {
    let tokens = SessionTokens::new()
        .with("cf_clearance", "abc")
        .with("_ga", "GA1")
        .with("session-id", "s1");
    assert_eq!(
        tokens.to_env_lines(),
        "GA_COOKIE=GA1\nCF_CLEARANCE=abc\nSESSION_ID=s1"
    );
}

#[test_case("CF_CLEARANCE", Some("cf_clearance"))]
#[test_case("GA_COOKIE", Some("_ga"))]
#[test_case("GA_ZH4G2KK1JY", Some("_ga_ZH4G2KK1JY"))]
#[test_case("OTHER", None)]
fn test_cookie_name_for_env(key: &str, expected: Option<&str>) {
    assert_eq!(cookie_name_for_env(key), expected);
}

#[test]
fn test_debug_redacts_values() {
    let tokens = SessionTokens::new().with("cf_clearance", "0123456789abcdefghij");
    let rendered = format!("{tokens:?}");
    assert!(rendered.contains("01234567…"));
    assert!(!rendered.contains("abcdefghij"));
    assert_eq!(redact("short"), "short");
}

#[test]
fn test_merge_overrides() {
    let mut base = SessionTokens::new().with("cf_clearance", "old").with("_ga", "keep");
    base.merge(SessionTokens::new().with("cf_clearance", "new"));
    assert_eq!(base.clearance(), Some("new"));
    assert_eq!(base.get("_ga"), Some("keep"));
}

// ============================================================================
// cURL extraction
// ============================================================================

#[test]
fn test_curl_header_form() {
    let curl = r#"curl 'https://e-play.pl/wp-json/contracts/v1/filter' \
  -H 'accept: */*' \
  -H 'cookie: _ga=GA1.1.5; cf_clearance=abc.def-123' \
  --data-raw '{"paged":1}'"#;
    let tokens = extract_cookies_from_curl(curl);
    assert_eq!(tokens.clearance(), Some("abc.def-123"));
    assert_eq!(tokens.get("_ga"), Some("GA1.1.5"));
}

#[test]
fn test_curl_cookie_flag_form() {
    let curl = r#"curl "https://e-play.pl/" --cookie "cf_clearance=long; _ga_ZH4G2KK1JY=GS1""#;
    let tokens = extract_cookies_from_curl(curl);
    assert_eq!(tokens.clearance(), Some("long"));
    assert_eq!(tokens.get("_ga_ZH4G2KK1JY"), Some("GS1"));
}

#[test]
fn test_curl_short_flag_form() {
    let curl = "curl 'https://e-play.pl/' -b 'cf_clearance=short'";
    assert_eq!(extract_cookies_from_curl(curl).clearance(), Some("short"));
}

#[test]
fn test_curl_without_cookies() {
    let curl = "curl 'https://e-play.pl/' -H 'accept: */*'";
    assert!(extract_cookies_from_curl(curl).is_empty());
}

// ============================================================================
// StaticProvider
// ============================================================================

#[tokio::test]
async fn test_static_provider_hands_out_tokens() {
    let provider = StaticProvider::new(SessionTokens::new().with("cf_clearance", "abc"));
    let grant = provider.get_tokens().await.unwrap();
    assert_eq!(grant.tokens.clearance(), Some("abc"));
    assert!(!grant.freshly_verified);
}

#[tokio::test]
async fn test_static_provider_without_clearance() {
    let provider = StaticProvider::new(SessionTokens::new().with("_ga", "x"));
    assert!(matches!(
        provider.get_tokens().await,
        Err(Error::MissingClearance)
    ));
}

#[tokio::test]
async fn test_static_provider_cannot_refresh() {
    let provider = StaticProvider::default();
    assert!(matches!(
        provider.refresh_tokens().await,
        Err(Error::Session { .. })
    ));
}

// ============================================================================
// CommandProvider
// ============================================================================

#[test]
fn test_command_provider_rejects_empty_command() {
    assert!(matches!(
        CommandProvider::new(&[]),
        Err(Error::Config { .. })
    ));
}

#[tokio::test]
async fn test_command_provider_reads_stdout() {
    let provider =
        CommandProvider::new(&sh("echo CF_CLEARANCE=from-stdout; echo GA_COOKIE=GA1")).unwrap();
    assert_eq!(provider.program(), "sh");

    let tokens = provider.refresh_tokens().await.unwrap();
    assert_eq!(tokens.clearance(), Some("from-stdout"));
    assert_eq!(tokens.get("_ga"), Some("GA1"));
}

#[tokio::test]
async fn test_command_provider_reads_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = dir.path().join(".env.cookies");
    let script = format!(
        "printf 'CF_CLEARANCE=from-file\\nGA_ZH4G2KK1JY=GS1\\n' > '{}'",
        env_file.display()
    );

    let provider = CommandProvider::new(&sh(&script))
        .unwrap()
        .with_env_file(&env_file);
    let grant = provider.get_tokens().await.unwrap();

    assert_eq!(grant.tokens.clearance(), Some("from-file"));
    assert_eq!(grant.tokens.get("_ga_ZH4G2KK1JY"), Some("GS1"));
    assert!(!grant.freshly_verified);
}

#[tokio::test]
async fn test_command_provider_stdout_wins_over_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = dir.path().join("cookies.env");
    std::fs::write(&env_file, "CF_CLEARANCE=stale\nGA_COOKIE=GA-file\n").unwrap();

    let provider = CommandProvider::new(&sh("echo CF_CLEARANCE=fresh"))
        .unwrap()
        .with_env_file(&env_file);
    let tokens = provider.refresh_tokens().await.unwrap();

    assert_eq!(tokens.clearance(), Some("fresh"));
    assert_eq!(tokens.get("_ga"), Some("GA-file"));
}

#[tokio::test]
async fn test_command_provider_missing_clearance() {
    let provider = CommandProvider::new(&sh("echo GA_COOKIE=only-analytics")).unwrap();
    let err = provider.refresh_tokens().await.unwrap_err();
    assert!(matches!(err, Error::MissingClearance));
}

#[tokio::test]
async fn test_command_provider_non_zero_exit() {
    let provider = CommandProvider::new(&sh("echo boom >&2; exit 3")).unwrap();
    match provider.refresh_tokens().await.unwrap_err() {
        Error::Process { message } => {
            assert!(message.contains("code 3"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_command_provider_timeout() {
    let provider = CommandProvider::new(&sh("sleep 5"))
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let err = provider.refresh_tokens().await.unwrap_err();
    assert!(matches!(err, Error::RefreshTimeout { .. }));
}

#[tokio::test]
async fn test_command_provider_unknown_program() {
    let provider =
        CommandProvider::new(&["definitely-not-a-real-binary-7f3a".to_string()]).unwrap();
    assert!(matches!(
        provider.refresh_tokens().await,
        Err(Error::Process { .. })
    ));
}

#[tokio::test]
async fn test_run_with_timeout_captures_output() {
    let output = run_with_timeout("sh", &sh("printf hello")[1..], Duration::from_secs(5))
        .await
        .unwrap();
    assert!(output.success());
    assert_eq!(output.stdout, "hello");
}

// ============================================================================
// FallbackProvider
// ============================================================================

#[tokio::test]
async fn test_fallback_uses_valid_primary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("cookie", "cf_clearance=configured"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let refresher = Arc::new(CountingRefresher::default());
    let provider = FallbackProvider::new(
        StaticProvider::new(SessionTokens::new().with("cf_clearance", "configured")),
        Arc::clone(&refresher),
    )
    .with_prober(prober(&server));

    let grant = provider.get_tokens().await.unwrap();
    assert_eq!(grant.tokens.clearance(), Some("configured"));
    assert!(grant.freshly_verified);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fallback_refreshes_rejected_primary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let refresher = Arc::new(CountingRefresher::default());
    let provider = FallbackProvider::new(
        StaticProvider::new(SessionTokens::new().with("cf_clearance", "stale")),
        Arc::clone(&refresher),
    )
    .with_prober(prober(&server));

    let grant = provider.get_tokens().await.unwrap();
    assert_eq!(grant.tokens.clearance(), Some("fresh-1"));
    assert!(!grant.freshly_verified);
}

#[tokio::test]
async fn test_fallback_keeps_primary_when_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let refresher = Arc::new(CountingRefresher {
        fail: true,
        ..Default::default()
    });
    let provider = FallbackProvider::new(
        StaticProvider::new(SessionTokens::new().with("cf_clearance", "stale")),
        Arc::clone(&refresher),
    )
    .with_prober(prober(&server));

    let grant = provider.get_tokens().await.unwrap();
    assert_eq!(grant.tokens.clearance(), Some("stale"));
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_without_primary_refreshes() {
    let refresher = Arc::new(CountingRefresher::default());
    let provider = FallbackProvider::new(StaticProvider::default(), Arc::clone(&refresher));

    let grant = provider.get_tokens().await.unwrap();
    assert_eq!(grant.tokens.clearance(), Some("fresh-1"));
}

#[tokio::test]
async fn test_fallback_without_anything_fails() {
    let refresher = Arc::new(CountingRefresher {
        fail: true,
        ..Default::default()
    });
    let provider = FallbackProvider::new(StaticProvider::default(), Arc::clone(&refresher));
    assert!(matches!(
        provider.get_tokens().await,
        Err(Error::MissingClearance)
    ));
}

#[tokio::test]
async fn test_fallback_refresh_delegates() {
    let refresher = Arc::new(CountingRefresher::default());
    let provider = FallbackProvider::new(
        StaticProvider::new(SessionTokens::new().with("cf_clearance", "x")),
        Arc::clone(&refresher),
    );
    assert_eq!(
        provider.refresh_tokens().await.unwrap().clearance(),
        Some("fresh-1")
    );
    assert_eq!(
        provider.refresh_tokens().await.unwrap().clearance(),
        Some("fresh-2")
    );
}
