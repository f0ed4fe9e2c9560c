//! Command-backed token acquisition
//!
//! Runs an external helper (typically a headless-browser script that solves
//! the challenge) and reads the cookies it produces. The helper can print
//! `KEY=VALUE` lines on stdout, write them to an env file, or both; stdout
//! wins on conflicts.

use super::provider::SessionProvider;
use super::types::{redact, SessionTokens, TokenGrant};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Default time budget for one acquisition
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Output from a helper run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content
    pub stdout: String,
    /// Standard error content
    pub stderr: String,
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// How long the command took
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command with a timeout, capturing its output.
///
/// The child is killed if the timeout elapses.
#[instrument(skip_all, fields(program = %program, timeout = ?timeout))]
pub async fn run_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ProcessOutput> {
    debug!(args = ?args, "Running refresh command");
    let start = Instant::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => {
            result.map_err(|e| Error::process(format!("failed to start '{program}': {e}")))?
        }
        Err(_) => {
            warn!(program = %program, timeout = ?timeout, "Refresh command timed out");
            return Err(Error::RefreshTimeout {
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let result = ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
        duration: start.elapsed(),
    };

    debug!(
        exit_code = result.exit_code,
        duration = ?result.duration,
        stdout_len = result.stdout.len(),
        "Refresh command completed"
    );

    Ok(result)
}

/// Session provider that runs a helper command for every acquisition
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    env_file: Option<PathBuf>,
    timeout: Duration,
}

impl CommandProvider {
    /// Create a provider from a command line (`program` followed by its args)
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::config("Refresh command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            env_file: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Also read cookies from this env file after the command exits
    #[must_use]
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Set the time budget
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program that will be run
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn acquire(&self) -> Result<SessionTokens> {
        info!(program = %self.program, "Acquiring fresh session tokens");
        let output = run_with_timeout(&self.program, &self.args, self.timeout).await?;

        if !output.success() {
            let stderr: String = output.stderr.chars().take(500).collect();
            return Err(Error::process(format!(
                "'{}' exited with code {}: {}",
                self.program,
                output.exit_code,
                stderr.trim()
            )));
        }

        let mut tokens = match &self.env_file {
            Some(path) => read_env_file(path).await?,
            None => SessionTokens::new(),
        };
        tokens.merge(SessionTokens::from_env_lines(&output.stdout));

        match tokens.clearance() {
            Some(clearance) => {
                info!(
                    cookies = tokens.len(),
                    cf_clearance = %redact(clearance),
                    "Refreshed session tokens"
                );
                Ok(tokens)
            }
            None => {
                warn!("Refresh command produced no cf_clearance cookie");
                Err(Error::MissingClearance)
            }
        }
    }
}

#[async_trait]
impl SessionProvider for CommandProvider {
    async fn get_tokens(&self) -> Result<TokenGrant> {
        self.acquire().await.map(TokenGrant::unverified)
    }

    async fn refresh_tokens(&self) -> Result<SessionTokens> {
        self.acquire().await
    }
}

/// Read cookies from an env file; a missing file yields no cookies
async fn read_env_file(path: &Path) -> Result<SessionTokens> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(SessionTokens::from_env_lines(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Cookie env file not found");
            Ok(SessionTokens::new())
        }
        Err(e) => Err(Error::Io(e)),
    }
}
