//! Session module
//!
//! Supplies the cookies needed to get past the site's challenge gate.
//!
//! # Providers
//!
//! - [`StaticProvider`] - tokens fixed at startup (config, env, pasted cURL)
//! - [`CommandProvider`] - runs an acquisition helper with a time budget
//! - [`FallbackProvider`] - probes primary tokens, refreshes when they fail
//!
//! The pagination engine only sees the [`SessionProvider`] trait.

mod command;
mod curl;
mod provider;
mod types;

pub use command::{run_with_timeout, CommandProvider, ProcessOutput};
pub use curl::extract_cookies_from_curl;
pub use provider::{FallbackProvider, SessionProvider, StaticProvider};
pub use types::{
    cookie_name_for_env, env_name_for_cookie, redact, SessionTokens, TokenGrant,
    CLEARANCE_COOKIE, ENV_COOKIE_NAMES,
};

#[cfg(test)]
mod tests;
