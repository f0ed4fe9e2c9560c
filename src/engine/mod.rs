//! Scrape engine module
//!
//! Main page loop with session recovery.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ScrapeEngine` - Walks every page sequentially, one request in flight
//! - `EngineConfig` - Page size, delays and retry budgets
//! - `ScrapeReport` - Collected records plus how the run ended
//!
//! Failures never discard what was already collected: an aborted run still
//! returns every record from the pages consumed before the abort.

mod types;

pub use types::{EngineConfig, FailureCause, Outcome, RunFailure, ScrapeReport, ScrapeStats};

use crate::http::HttpClient;
use crate::pagination::{FilterRequest, PageResponse, PaginationState, StopResult};
use crate::record::{normalize_all, Record};
use crate::session::{redact, SessionProvider, SessionTokens};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Scrape engine, generic over where session tokens come from
pub struct ScrapeEngine<P> {
    /// HTTP client
    client: HttpClient,
    /// Session token source
    provider: P,
    /// Engine configuration
    config: EngineConfig,
    /// Statistics of the last run
    stats: ScrapeStats,
}

impl<P: SessionProvider> ScrapeEngine<P> {
    /// Create a new engine
    pub fn new(client: HttpClient, provider: P) -> Self {
        Self {
            client,
            provider,
            config: EngineConfig::default(),
            stats: ScrapeStats::default(),
        }
    }

    /// Set engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get statistics of the last run
    pub fn stats(&self) -> &ScrapeStats {
        &self.stats
    }

    /// Fetch every page and normalize its items.
    ///
    /// Never fails as a whole: transport and session problems end the run
    /// with [`Outcome::Aborted`] and the records collected so far.
    pub async fn scrape_all(&mut self) -> ScrapeReport {
        let start = Instant::now();
        self.stats = ScrapeStats::default();

        let mut records = Vec::new();
        let outcome = self.run(&mut records).await;

        match &outcome {
            Outcome::Complete => info!(
                records = records.len(),
                pages = self.stats.pages_fetched,
                "Scrape complete"
            ),
            Outcome::Aborted(failure) => error!(
                cause = %failure.cause,
                records = records.len(),
                pages = self.stats.pages_fetched,
                "Scrape aborted: {}",
                failure.message
            ),
        }

        self.stats.records_collected = records.len();
        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        ScrapeReport {
            records,
            outcome,
            stats: self.stats.clone(),
        }
    }

    async fn run(&mut self, records: &mut Vec<Record>) -> Outcome {
        let mut tokens = match self.provider.get_tokens().await {
            Ok(grant) if grant.tokens.has_clearance() => {
                debug!(
                    verified = grant.freshly_verified,
                    tokens = ?grant.tokens,
                    "Using session tokens"
                );
                grant.tokens
            }
            Ok(_) => {
                return Outcome::Aborted(RunFailure::new(
                    FailureCause::ProviderFailure,
                    "session provider returned no cf_clearance cookie",
                ))
            }
            Err(e) => {
                return Outcome::Aborted(RunFailure::new(
                    FailureCause::ProviderFailure,
                    format!("could not obtain session tokens: {e}"),
                ))
            }
        };

        let mut state = PaginationState::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        loop {
            let request = FilterRequest::page(state.page, self.config.page_size);
            let page = match self.fetch_with_recovery(&request, &mut tokens).await {
                Ok(page) => page,
                Err(failure) => return Outcome::Aborted(failure),
            };
            self.stats.pages_fetched += 1;

            if let Some((previous, current)) = state.observe(&page.pagination) {
                info!("Total pages updated: {previous} -> {current}");
            }

            let stop = state.check_stop(&page.pagination, page.items.len());
            if stop == StopResult::EmptyPage {
                info!(page = state.page, "No more contracts, stopping");
                return Outcome::Complete;
            }

            let before = records.len();
            for record in normalize_all(&page.items) {
                if self.config.dedupe {
                    if let Some(key) = record.dedup_key() {
                        if !seen.insert(key) {
                            self.stats.duplicates_skipped += 1;
                            continue;
                        }
                    }
                }
                records.push(record);
            }

            info!(
                "Page {}/{}: {} contracts (total: {})",
                state.reported_page(&page.pagination),
                state.total_pages.unwrap_or(1),
                records.len() - before,
                records.len()
            );

            if stop.should_stop() {
                return Outcome::Complete;
            }

            if self.config.max_pages > 0
                && self.stats.pages_fetched >= self.config.max_pages as usize
            {
                info!(max_pages = self.config.max_pages, "Page limit reached, stopping");
                return Outcome::Complete;
            }

            state.next_page();
            self.config.delay.wait().await;
            self.stats.delays_slept += 1;
        }
    }

    /// Fetch one page, refreshing tokens on access denied and retrying
    /// transient failures within the configured budgets
    async fn fetch_with_recovery(
        &mut self,
        request: &FilterRequest,
        tokens: &mut SessionTokens,
    ) -> std::result::Result<PageResponse, RunFailure> {
        let mut auth_refreshes = 0;
        let mut transient_retries = 0;

        loop {
            self.stats.requests_sent += 1;
            debug!(page = request.paged, quantity = request.quantity, "Requesting page");

            let err = match self.client.fetch_page(request, tokens).await {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            match err.failure_cause() {
                FailureCause::AuthExpired => {
                    if auth_refreshes >= self.config.max_auth_refreshes {
                        return Err(RunFailure::new(
                            FailureCause::AuthExpired,
                            format!(
                                "page {} still rejected after {auth_refreshes} token refreshes: {err}",
                                request.paged
                            ),
                        ));
                    }
                    auth_refreshes += 1;
                    self.stats.auth_refreshes += 1;
                    warn!(
                        page = request.paged,
                        attempt = auth_refreshes,
                        max = self.config.max_auth_refreshes,
                        "Session rejected, refreshing tokens"
                    );

                    *tokens = match self.provider.refresh_tokens().await {
                        Ok(fresh) if fresh.has_clearance() => fresh,
                        Ok(_) => {
                            return Err(RunFailure::new(
                                FailureCause::AuthExpired,
                                "token refresh produced no cf_clearance cookie",
                            ))
                        }
                        Err(refresh_err) => {
                            return Err(RunFailure::new(
                                FailureCause::AuthExpired,
                                format!("token refresh failed: {refresh_err}"),
                            ))
                        }
                    };
                    info!(
                        cf_clearance = %tokens.clearance().map(redact).unwrap_or_default(),
                        "Retrying page {} with refreshed tokens",
                        request.paged
                    );
                    tokio::time::sleep(self.config.auth_backoff).await;
                }
                FailureCause::Transient | FailureCause::ProviderFailure => {
                    if transient_retries >= self.config.max_transient_retries {
                        return Err(RunFailure::new(
                            FailureCause::Transient,
                            format!(
                                "page {} failed after {transient_retries} retries: {err}",
                                request.paged
                            ),
                        ));
                    }
                    let backoff = self.client.calculate_backoff(transient_retries);
                    transient_retries += 1;
                    self.stats.transient_retries += 1;
                    warn!(
                        page = request.paged,
                        attempt = transient_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Page request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
