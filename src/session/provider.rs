//! Session provider trait and the static / fallback implementations

use super::types::{SessionTokens, TokenGrant};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of session tokens for the pagination engine
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current best-known tokens.
    ///
    /// Fails with [`Error::MissingClearance`] (or the acquisition error) when
    /// no `cf_clearance` can be produced at all.
    async fn get_tokens(&self) -> Result<TokenGrant>;

    /// Force acquisition of new tokens
    async fn refresh_tokens(&self) -> Result<SessionTokens>;
}

#[async_trait]
impl<T: SessionProvider + ?Sized> SessionProvider for Box<T> {
    async fn get_tokens(&self) -> Result<TokenGrant> {
        (**self).get_tokens().await
    }

    async fn refresh_tokens(&self) -> Result<SessionTokens> {
        (**self).refresh_tokens().await
    }
}

#[async_trait]
impl<T: SessionProvider + ?Sized> SessionProvider for Arc<T> {
    async fn get_tokens(&self) -> Result<TokenGrant> {
        (**self).get_tokens().await
    }

    async fn refresh_tokens(&self) -> Result<SessionTokens> {
        (**self).refresh_tokens().await
    }
}

// ============================================================================
// Static Provider
// ============================================================================

/// Tokens fixed at startup (config file, env vars, pasted cURL)
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    tokens: SessionTokens,
}

impl StaticProvider {
    /// Create a provider around fixed tokens
    pub fn new(tokens: SessionTokens) -> Self {
        Self { tokens }
    }

    /// The configured tokens
    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }
}

#[async_trait]
impl SessionProvider for StaticProvider {
    async fn get_tokens(&self) -> Result<TokenGrant> {
        if self.tokens.has_clearance() {
            Ok(TokenGrant::unverified(self.tokens.clone()))
        } else {
            Err(Error::MissingClearance)
        }
    }

    async fn refresh_tokens(&self) -> Result<SessionTokens> {
        Err(Error::session(
            "static tokens cannot be refreshed; configure a refresh command",
        ))
    }
}

// ============================================================================
// Fallback Provider
// ============================================================================

/// Primary tokens, verified by a probe request, with a refresher behind them.
///
/// `get_tokens` uses the primary tokens when they pass the probe. Missing or
/// rejected primary tokens trigger the refresher; if that fails too, rejected
/// (but present) primary tokens are still handed out unverified.
pub struct FallbackProvider<P, R> {
    primary: P,
    refresher: R,
    prober: Option<HttpClient>,
}

impl<P: SessionProvider, R: SessionProvider> FallbackProvider<P, R> {
    /// Create a fallback chain
    pub fn new(primary: P, refresher: R) -> Self {
        Self {
            primary,
            refresher,
            prober: None,
        }
    }

    /// Probe primary tokens with this client before trusting them
    #[must_use]
    pub fn with_prober(mut self, client: HttpClient) -> Self {
        self.prober = Some(client);
        self
    }
}

#[async_trait]
impl<P: SessionProvider, R: SessionProvider> SessionProvider for FallbackProvider<P, R> {
    async fn get_tokens(&self) -> Result<TokenGrant> {
        let grant = match self.primary.get_tokens().await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "No usable configured tokens, attempting refresh");
                return self
                    .refresher
                    .refresh_tokens()
                    .await
                    .map(TokenGrant::unverified);
            }
        };

        let Some(client) = &self.prober else {
            return Ok(grant);
        };

        match client.probe(&grant.tokens).await {
            Ok(true) => {
                info!("Configured tokens are valid");
                return Ok(TokenGrant::verified(grant.tokens));
            }
            Ok(false) => warn!("Configured tokens were rejected, attempting refresh"),
            Err(e) => warn!(error = %e, "Token probe failed, attempting refresh"),
        }

        match self.refresher.refresh_tokens().await {
            Ok(tokens) => Ok(TokenGrant::unverified(tokens)),
            Err(e) => {
                warn!(error = %e, "Refresh failed, continuing with configured tokens");
                debug!(tokens = ?grant.tokens, "Falling back");
                Ok(grant)
            }
        }
    }

    async fn refresh_tokens(&self) -> Result<SessionTokens> {
        self.refresher.refresh_tokens().await
    }
}

impl<P, R> std::fmt::Debug for FallbackProvider<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackProvider")
            .field("has_prober", &self.prober.is_some())
            .finish_non_exhaustive()
    }
}
