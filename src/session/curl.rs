//! Cookie extraction from a copied cURL command
//!
//! Browsers' "Copy as cURL" puts the cookies in one of three places:
//! `-H "Cookie: ..."`, `--cookie "..."` or `-b "..."`. All three are read and
//! merged, later forms overriding earlier ones.

use super::types::SessionTokens;
use once_cell::sync::Lazy;
use regex::Regex;

static COOKIE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)-H\s+["']Cookie:\s*([^"']+)["']"#).expect("valid cookie header regex")
});

static COOKIE_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)--cookie\s+["']([^"']+)["']"#).expect("valid --cookie regex"));

static COOKIE_SHORT_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|\s)-b\s+["']([^"']+)["']"#).expect("valid -b regex"));

/// Extract every cookie found in a cURL command
pub fn extract_cookies_from_curl(command: &str) -> SessionTokens {
    let mut tokens = SessionTokens::new();
    for pattern in [&*COOKIE_HEADER, &*COOKIE_FLAG, &*COOKIE_SHORT_FLAG] {
        if let Some(captures) = pattern.captures(command) {
            tokens.merge(SessionTokens::from_cookie_string(&captures[1]));
        }
    }
    tokens
}
