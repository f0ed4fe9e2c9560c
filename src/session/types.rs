//! Session token types
//!
//! Session tokens are the cookies that let requests through the site's
//! challenge gate. Only `cf_clearance` is required; the analytics cookies
//! are sent along when known.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cookie that proves the challenge gate was passed
pub const CLEARANCE_COOKIE: &str = "cf_clearance";

/// Environment-variable names used for the well-known cookies
pub const ENV_COOKIE_NAMES: &[(&str, &str)] = &[
    ("CF_CLEARANCE", CLEARANCE_COOKIE),
    ("GA_COOKIE", "_ga"),
    ("GA_ZH4G2KK1JY", "_ga_ZH4G2KK1JY"),
];

/// Map an env-style key (`CF_CLEARANCE`) to its cookie name (`cf_clearance`)
pub fn cookie_name_for_env(key: &str) -> Option<&'static str> {
    ENV_COOKIE_NAMES
        .iter()
        .find(|(env, _)| *env == key)
        .map(|(_, cookie)| *cookie)
}

/// Map a cookie name to the env-style key used for it
pub fn env_name_for_cookie(name: &str) -> String {
    ENV_COOKIE_NAMES
        .iter()
        .find(|(_, cookie)| *cookie == name)
        .map_or_else(
            || name.to_uppercase().replace('-', "_"),
            |(env, _)| (*env).to_string(),
        )
}

/// Cookie name → value
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTokens {
    cookies: BTreeMap<String, String>,
}

impl SessionTokens {
    /// Create an empty token set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cookie; empty values are ignored
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.cookies.insert(name.into(), value);
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a cookie value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The `cf_clearance` value, if present
    pub fn clearance(&self) -> Option<&str> {
        self.get(CLEARANCE_COOKIE)
    }

    /// Whether the required clearance cookie is populated
    pub fn has_clearance(&self) -> bool {
        self.clearance().is_some()
    }

    /// Number of cookies
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether no cookies are set
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterate over `(name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay another token set; its values win
    pub fn merge(&mut self, other: SessionTokens) {
        self.cookies.extend(other.cookies);
    }

    /// Value for a `Cookie` request header
    pub fn cookie_header(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Parse `name=value; name2=value2`
    pub fn from_cookie_string(cookies: &str) -> Self {
        let mut tokens = Self::new();
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    tokens.insert(name, value.trim());
                }
            }
        }
        tokens
    }

    /// Parse `KEY=VALUE` lines, skipping blanks and `#` comments.
    ///
    /// Env-style keys (`CF_CLEARANCE`, `GA_COOKIE`, ...) are mapped to their
    /// cookie names; any other key is taken as a literal cookie name.
    pub fn from_env_lines(text: &str) -> Self {
        let mut tokens = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().trim_start_matches("export ").trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            let name = cookie_name_for_env(key).unwrap_or(key);
            tokens.insert(name, value);
        }
        tokens
    }

    /// Render as `KEY=VALUE` lines using env-style keys
    pub fn to_env_lines(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{}={value}", env_name_for_cookie(name)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SessionTokens {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tokens = Self::new();
        for (name, value) in iter {
            tokens.insert(name, value);
        }
        tokens
    }
}

/// Values are redacted: tokens must not end up in logs
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.iter() {
            map.entry(&name, &redact(value));
        }
        map.finish()
    }
}

/// First few characters of a secret, for log lines
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(8).collect();
    if prefix.len() < value.len() {
        format!("{prefix}…")
    } else {
        prefix
    }
}

/// Tokens handed out by a session provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The tokens
    pub tokens: SessionTokens,
    /// Whether a real request confirmed them during this call
    pub freshly_verified: bool,
}

impl TokenGrant {
    /// Tokens that have not been checked against the site
    pub fn unverified(tokens: SessionTokens) -> Self {
        Self {
            tokens,
            freshly_verified: false,
        }
    }

    /// Tokens that just passed a probe request
    pub fn verified(tokens: SessionTokens) -> Self {
        Self {
            tokens,
            freshly_verified: true,
        }
    }
}
