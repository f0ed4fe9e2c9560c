//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::ScraperConfig;
use crate::engine::{FailureCause, Outcome, ScrapeEngine, ScrapeReport};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::output::{ExportFormat, SheetsUploader};
use crate::record::Record;
use crate::session::{
    extract_cookies_from_curl, CommandProvider, FallbackProvider, SessionProvider, StaticProvider,
};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Flags of the `scrape` command
#[derive(Debug, Clone, Default)]
struct ScrapeOverrides {
    page_size: Option<u32>,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
    parquet: Option<PathBuf>,
    no_files: bool,
    sheets: bool,
    dedupe: bool,
    max_pages: Option<u32>,
}

impl ScrapeOverrides {
    fn apply(&self, config: &mut ScraperConfig) {
        if let Some(size) = self.page_size {
            config.pagination.page_size = size;
        }
        if let Some(max) = self.max_pages {
            config.pagination.max_pages = max;
        }
        if self.dedupe {
            config.pagination.dedupe = true;
        }
        if self.sheets {
            config.sheets.enabled = true;
        }
        if self.no_files {
            config.output.json_path = None;
            config.output.csv_path = None;
            config.output.parquet_path = None;
        }
        for (target, value) in [
            (&mut config.output.json_path, &self.json),
            (&mut config.output.csv_path, &self.csv),
            (&mut config.output.parquet_path, &self.parquet),
        ] {
            if value.is_some() {
                target.clone_from(value);
            }
        }
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, returning the process exit code
    pub async fn run(&self) -> Result<i32> {
        match &self.cli.command {
            Commands::Scrape {
                page_size,
                json,
                csv,
                parquet,
                no_files,
                sheets,
                dedupe,
                max_pages,
            } => {
                let overrides = ScrapeOverrides {
                    page_size: *page_size,
                    json: json.clone(),
                    csv: csv.clone(),
                    parquet: parquet.clone(),
                    no_files: *no_files,
                    sheets: *sheets,
                    dedupe: *dedupe,
                    max_pages: *max_pages,
                };
                let mut config = self.load_config()?;
                overrides.apply(&mut config);
                config.validate()?;
                self.scrape(&config).await
            }
            Commands::Check => {
                let config = self.load_config()?;
                self.check(&config).await
            }
            Commands::Cookies { curl } => self.cookies(curl.as_deref()),
        }
    }

    fn load_config(&self) -> Result<ScraperConfig> {
        ScraperConfig::load(self.cli.config.as_deref())
    }

    /// Output a JSON message to stdout
    fn output_message(&self, msg: &Value) {
        println!("{}", serde_json::to_string(msg).unwrap_or_default());
    }

    /// Fetch, export and optionally upload
    async fn scrape(&self, config: &ScraperConfig) -> Result<i32> {
        let client = HttpClient::with_config(config.http_client_config())?;
        let provider = build_provider(config, &client)?;

        let mut engine = ScrapeEngine::new(client, provider).with_config(config.engine_config());
        let report = engine.scrape_all().await;

        // Partial results are exported too. A sink failure only decides the
        // exit code when the scrape itself completed.
        let mut sink_error = None;
        if let Err(e) = export_files(config, &report.records) {
            error!(error = %e, "Writing output files failed");
            sink_error = Some(e);
        }
        if let Err(e) = upload_sheets(config, &report.records).await {
            error!(error = %e, "Google Sheets upload failed");
            sink_error.get_or_insert(e);
        }

        self.output_message(&summary(&report));
        match sink_error {
            Some(e) if report.is_complete() => Err(e),
            _ => Ok(report.exit_code()),
        }
    }

    /// Probe the configured tokens
    async fn check(&self, config: &ScraperConfig) -> Result<i32> {
        let tokens = config.session_tokens();
        if !tokens.has_clearance() {
            self.output_message(&connection_status(
                "FAILED",
                "No cf_clearance cookie configured",
            ));
            return Ok(FailureCause::ProviderFailure.exit_code());
        }

        let client = HttpClient::with_config(config.http_client_config())?;
        let (status, message, code) = match client.probe(&tokens).await {
            Ok(true) => ("SUCCEEDED", "Session tokens accepted".to_string(), 0),
            Ok(false) => (
                "FAILED",
                "Session tokens rejected".to_string(),
                FailureCause::AuthExpired.exit_code(),
            ),
            Err(e) => (
                "FAILED",
                format!("Probe request failed: {e}"),
                FailureCause::Transient.exit_code(),
            ),
        };
        self.output_message(&connection_status(status, &message));
        Ok(code)
    }

    /// Print cookies found in a cURL command as env lines
    fn cookies(&self, curl: Option<&str>) -> Result<i32> {
        let command = match curl {
            Some(command) => command.to_string(),
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read the cURL command from stdin")?;
                buffer
            }
        };

        let tokens = extract_cookies_from_curl(&command);
        if tokens.is_empty() {
            return Err(Error::config("No cookies found in the cURL command"));
        }
        if !tokens.has_clearance() {
            warn!("cURL command carries no cf_clearance cookie");
        }

        println!("{}", tokens.to_env_lines());
        Ok(0)
    }
}

/// Static tokens, with the refresh helper behind them when one is configured
fn build_provider(
    config: &ScraperConfig,
    client: &HttpClient,
) -> Result<Box<dyn SessionProvider>> {
    let fixed = StaticProvider::new(config.session_tokens());
    if config.session.refresh_command.is_empty() {
        return Ok(Box::new(fixed));
    }

    let mut refresher = CommandProvider::new(&config.session.refresh_command)?
        .with_timeout(config.refresh_timeout());
    if let Some(path) = &config.session.refresh_env_file {
        refresher = refresher.with_env_file(path);
    }
    info!(
        program = %refresher.program(),
        auto_refresh = config.session.auto_refresh,
        "Token refresh enabled"
    );

    let mut provider = FallbackProvider::new(fixed, refresher);
    if config.session.auto_refresh {
        provider = provider.with_prober(client.clone());
    }
    Ok(Box::new(provider))
}

/// Write every configured local sink; one failing sink does not skip the rest
fn export_files(config: &ScraperConfig, records: &[Record]) -> Result<()> {
    let targets = [
        (ExportFormat::Json, &config.output.json_path),
        (ExportFormat::Csv, &config.output.csv_path),
        (ExportFormat::Parquet, &config.output.parquet_path),
    ];
    let mut first_error = None;
    for (format, path) in targets {
        let Some(path) = path else { continue };
        if let Err(e) = format.write(path, records) {
            warn!(format = %format, path = %path.display(), error = %e, "Export failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

async fn upload_sheets(config: &ScraperConfig, records: &[Record]) -> Result<()> {
    let Some((key, target)) = config.sheets_target()? else {
        return Ok(());
    };
    if records.is_empty() {
        warn!("No contracts collected, skipping Google Sheets upload");
        return Ok(());
    }
    SheetsUploader::new(key, target)?.upload(records).await?;
    Ok(())
}

fn connection_status(status: &str, message: &str) -> Value {
    json!({
        "type": "CONNECTION_STATUS",
        "connectionStatus": {
            "status": status,
            "message": message
        }
    })
}

fn summary(report: &ScrapeReport) -> Value {
    let (status, cause, message) = match &report.outcome {
        Outcome::Complete => ("COMPLETE", None, None),
        Outcome::Aborted(failure) => (
            "ABORTED",
            Some(failure.cause.as_str()),
            Some(failure.message.as_str()),
        ),
    };
    json!({
        "type": "SCRAPE_SUMMARY",
        "summary": {
            "status": status,
            "cause": cause,
            "message": message,
            "records": report.records.len(),
            "pages": report.stats.pages_fetched,
            "auth_refreshes": report.stats.auth_refreshes,
            "transient_retries": report.stats.transient_retries,
            "duplicates_skipped": report.stats.duplicates_skipped,
            "duration_ms": report.stats.duration_ms
        }
    })
}
