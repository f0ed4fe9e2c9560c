//! Scraper configuration
//!
//! Built once at startup from an optional YAML file, then environment
//! variables, then command-line flags, and validated before anything runs.
//!
//! ```yaml
//! pagination:
//!   page_size: 120
//!   delay_min_ms: 500
//!   delay_max_ms: 1000
//! session:
//!   cookies:
//!     cf_clearance: "..."
//!   auto_refresh: true
//!   refresh_command: ["node", "scripts/refresh-cookies.js"]
//! output:
//!   json_path: contracts.json
//!   csv_path: contracts.csv
//! sheets:
//!   enabled: true
//!   spreadsheet_id: "1AbC..."
//! ```

use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use crate::http::{
    HttpClientConfig, PageDelay, DEFAULT_ENDPOINT, DEFAULT_ORIGIN, DEFAULT_REFERER,
    DEFAULT_USER_AGENT,
};
use crate::output::{ServiceAccountKey, SheetsConfig, DEFAULT_SHEETS_API};
use crate::pagination::MAX_PAGE_SIZE;
use crate::session::{SessionTokens, ENV_COOKIE_NAMES};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete scraper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Endpoint and request headers
    pub api: ApiConfig,

    /// Page walk settings
    pub pagination: PaginationConfig,

    /// Retry budgets
    pub retry: RetryConfig,

    /// Session tokens and refresh
    pub session: SessionConfig,

    /// Local file sinks
    pub output: OutputConfig,

    /// Google Sheets sink
    pub sheets: SheetsSettings,
}

// ============================================================================
// API
// ============================================================================

/// Endpoint and request headers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Contracts filter endpoint
    pub endpoint: String,
    /// `origin` header
    pub origin: String,
    /// `referer` header
    pub referer: String,
    /// Browser user agent sent with every request
    pub user_agent: String,
    /// Overrides the client's default `accept-language`
    pub accept_language: Option<String>,
    /// Page request timeout
    pub timeout_seconds: u64,
    /// Token probe timeout
    pub probe_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: None,
            timeout_seconds: 30,
            probe_timeout_seconds: 10,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Page walk settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Items per page (1..=120)
    pub page_size: u32,
    /// Lower bound of the pause between pages
    pub delay_min_ms: u64,
    /// Upper bound of the pause between pages
    pub delay_max_ms: u64,
    /// Stop after this many pages (0 = unlimited)
    pub max_pages: u32,
    /// Drop repeated `(id, link)` records
    pub dedupe: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            delay_min_ms: 500,
            delay_max_ms: 1000,
            max_pages: 0,
            dedupe: false,
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Retry budgets, all per page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Token refreshes allowed for a rejected page
    pub max_auth_refreshes: u32,
    /// Retries allowed for a page that failed for any other reason
    pub max_transient_retries: u32,
    /// Pause after a refresh before re-issuing the page
    pub auth_backoff_ms: u64,
    /// Backoff between transient retries
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_auth_refreshes: 1,
            max_transient_retries: 1,
            auth_backoff_ms: 2000,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type")]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Constant,
            initial_ms: 2000,
            max_ms: 30_000,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Session tokens and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name → value
    pub cookies: BTreeMap<String, String>,
    /// Probe configured cookies and refresh them when rejected
    pub auto_refresh: bool,
    /// Helper that produces fresh cookies (program followed by args)
    pub refresh_command: Vec<String>,
    /// Env file the helper writes cookies to
    pub refresh_env_file: Option<PathBuf>,
    /// Time budget for one helper run
    pub refresh_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookies: BTreeMap::new(),
            auto_refresh: false,
            refresh_command: Vec::new(),
            refresh_env_file: Some(PathBuf::from(".env.cookies")),
            refresh_timeout_seconds: 60,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Local file sinks; an absent path disables that sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON array of records
    pub json_path: Option<PathBuf>,
    /// Flattened CSV
    pub csv_path: Option<PathBuf>,
    /// Flattened Parquet
    pub parquet_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: Some(PathBuf::from("contracts.json")),
            csv_path: Some(PathBuf::from("contracts.csv")),
            parquet_path: None,
        }
    }
}

// ============================================================================
// Sheets
// ============================================================================

/// Google Sheets sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    /// Upload after scraping
    pub enabled: bool,
    /// Service-account key, raw JSON or base64
    pub credentials_json: Option<String>,
    /// Target spreadsheet id (from its URL)
    pub spreadsheet_id: Option<String>,
    /// Worksheet (tab) title, created when missing
    pub worksheet: String,
    /// Sheets API base URL
    pub api_base: String,
    /// Token endpoint override
    pub token_url: Option<String>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials_json: None,
            spreadsheet_id: None,
            worksheet: "Contracts".to_string(),
            api_base: DEFAULT_SHEETS_API.to_string(),
            token_url: None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ScraperConfig {
    /// Load from an optional YAML file plus the process environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {e}", path.display()))
                })?;
                debug!(path = %path.display(), "Loaded config file");
                Self::from_yaml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML; missing sections and fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` returns the variable's value; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for &(env_key, cookie) in ENV_COOKIE_NAMES {
            if let Some(value) = get(env_key) {
                self.session
                    .cookies
                    .insert(cookie.to_string(), value.trim().to_string());
            }
        }
        if let Some(value) = get("AUTO_REFRESH_COOKIES") {
            self.session.auto_refresh = parse_bool(&value);
        }
        if let Some(value) = get("COOKIE_REFRESH_COMMAND") {
            self.session.refresh_command = value.split_whitespace().map(String::from).collect();
        }
        if let Some(value) = get("UPLOAD_TO_SHEETS") {
            self.sheets.enabled = parse_bool(&value);
        }
        if let Some(value) = get("SHEETS_CREDENTIALS_JSON") {
            self.sheets.credentials_json = Some(value);
        }
        if let Some(value) = get("SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(value.trim().to_string());
        }
        if let Some(value) = get("SHEETS_WORKSHEET_NAME") {
            self.sheets.worksheet = value.trim().to_string();
        }
    }

    /// Check value ranges and cross-field requirements
    pub fn validate(&self) -> Result<()> {
        let page_size = self.pagination.page_size;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::invalid_value(
                "pagination.page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            ));
        }
        if self.pagination.delay_min_ms > self.pagination.delay_max_ms {
            return Err(Error::invalid_value(
                "pagination.delay_min_ms",
                "must not exceed delay_max_ms",
            ));
        }
        url::Url::parse(&self.api.endpoint)
            .map_err(|e| Error::invalid_value("api.endpoint", e.to_string()))?;

        if self.session.auto_refresh && self.session.refresh_command.is_empty() {
            return Err(Error::invalid_value(
                "session.refresh_command",
                "required when auto_refresh is enabled",
            ));
        }

        if self.sheets.enabled {
            if self.sheets.spreadsheet_id.is_none() {
                return Err(Error::invalid_value(
                    "sheets.spreadsheet_id",
                    "required when the Sheets upload is enabled",
                ));
            }
            if self.sheets.credentials_json.is_none() {
                return Err(Error::invalid_value(
                    "sheets.credentials_json",
                    "required when the Sheets upload is enabled",
                ));
            }
            if self.sheets.worksheet.is_empty() {
                return Err(Error::invalid_value("sheets.worksheet", "must not be empty"));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Derived component configs
    // ========================================================================

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let backoff = &self.retry.backoff;
        let mut builder = HttpClientConfig::builder()
            .endpoint(&self.api.endpoint)
            .site(&self.api.origin, &self.api.referer)
            .user_agent(&self.api.user_agent)
            .timeout(Duration::from_secs(self.api.timeout_seconds))
            .probe_timeout(Duration::from_secs(self.api.probe_timeout_seconds))
            .backoff(
                backoff.backoff_type,
                Duration::from_millis(backoff.initial_ms),
                Duration::from_millis(backoff.max_ms),
            );
        if let Some(language) = &self.api.accept_language {
            builder = builder.accept_language(language);
        }
        builder.build()
    }

    /// Engine settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_page_size(self.pagination.page_size)
            .with_delay(PageDelay::new(
                Duration::from_millis(self.pagination.delay_min_ms),
                Duration::from_millis(self.pagination.delay_max_ms),
            ))
            .with_max_pages(self.pagination.max_pages)
            .with_dedupe(self.pagination.dedupe)
            .with_max_auth_refreshes(self.retry.max_auth_refreshes)
            .with_max_transient_retries(self.retry.max_transient_retries)
            .with_auth_backoff(Duration::from_millis(self.retry.auth_backoff_ms))
    }

    /// Configured session cookies
    pub fn session_tokens(&self) -> SessionTokens {
        self.session.cookies.iter().collect()
    }

    /// Refresh helper time budget
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.session.refresh_timeout_seconds)
    }

    /// Service-account key and upload target, when the Sheets upload is enabled
    pub fn sheets_target(&self) -> Result<Option<(ServiceAccountKey, SheetsConfig)>> {
        if !self.sheets.enabled {
            return Ok(None);
        }
        let (Some(credentials), Some(spreadsheet_id)) =
            (&self.sheets.credentials_json, &self.sheets.spreadsheet_id)
        else {
            return Err(Error::config(
                "Sheets upload needs credentials_json and spreadsheet_id",
            ));
        };

        let key = ServiceAccountKey::parse(credentials)?;
        let mut target = SheetsConfig::new(spreadsheet_id, &self.sheets.worksheet)
            .with_api_base(&self.sheets.api_base);
        if let Some(url) = &self.sheets.token_url {
            target = target.with_token_url(url);
        }
        Ok(Some((key, target)))
    }
}

/// `true`, `1`, `yes` and `on` (any case) are true; anything else is false
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
