//! HTTP module
//!
//! Talks to the contracts filter endpoint.
//!
//! # Features
//!
//! - **Browser headers**: Origin, referer and user agent the challenge gate expects
//! - **Classification**: Access-denied statuses surface as their own error
//! - **Probing**: Cheap one-item request to validate session tokens
//! - **Page delay**: Randomized pause between page fetches

mod client;
mod delay;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, DEFAULT_ENDPOINT, DEFAULT_ORIGIN,
    DEFAULT_REFERER, DEFAULT_USER_AGENT,
};
pub use delay::PageDelay;

#[cfg(test)]
mod tests;
