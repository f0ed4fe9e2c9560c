//! Google Sheets sink
//!
//! Authenticates as a service account (signed JWT exchanged for an access
//! token), makes sure the worksheet exists, clears it and writes the header
//! plus one row per record from `A1`. The header row is then bolded on a
//! gray background.

use super::schema::{sheet_rows, SHEET_HEADERS};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::types::{JsonValue, JwtAlgorithm};
use base64::Engine as _;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// OAuth scope for reading and writing spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Google's OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Sheets REST API base
pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

const NEW_SHEET_ROWS: u32 = 10_000;
const NEW_SHEET_COLUMNS: u32 = 15;
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file that are needed here
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key given as raw JSON or as base64-encoded JSON
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.starts_with('{') {
            return Ok(serde_json::from_str(raw)?);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| Error::sheets(format!("Credentials are neither JSON nor base64: {e}")))?;
        Ok(serde_json::from_slice(&decoded)?)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

/// Where and how to upload
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet id (from its URL)
    pub spreadsheet_id: String,
    /// Worksheet (tab) title
    pub worksheet: String,
    /// Sheets API base URL, ending with `/`
    pub api_base: String,
    /// Token endpoint; defaults to the key's `token_uri`
    pub token_url: Option<String>,
    /// JWT signing algorithm
    pub algorithm: JwtAlgorithm,
    /// Per-request timeout
    pub timeout: Duration,
}

impl SheetsConfig {
    /// Upload to `worksheet` of `spreadsheet_id`
    pub fn new(spreadsheet_id: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            api_base: DEFAULT_SHEETS_API.to_string(),
            token_url: None,
            algorithm: JwtAlgorithm::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Point at another API base (tests, proxies)
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.api_base = base;
        self
    }

    /// Override the token endpoint
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Uploads records to one worksheet
pub struct SheetsUploader {
    client: Client,
    key: ServiceAccountKey,
    config: SheetsConfig,
}

impl SheetsUploader {
    /// Create an uploader
    pub fn new(key: ServiceAccountKey, config: SheetsConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            key,
            config,
        })
    }

    /// Upload configuration
    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn token_url(&self) -> &str {
        self.config
            .token_url
            .as_deref()
            .or(self.key.token_uri.as_deref())
            .unwrap_or(DEFAULT_TOKEN_URL)
    }

    /// Sign a JWT assertion and exchange it for an access token
    pub async fn access_token(&self) -> Result<String> {
        let token_url = self.token_url();
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: token_url,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(self.config.algorithm.into());
        header.kid.clone_from(&self.key.private_key_id);

        let encoding_key =
            EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| {
                Error::JwtGeneration {
                    message: format!("Invalid private key: {e}"),
                }
            })?;
        let jwt = encode(&header, &claims, &encoding_key).map_err(|e| Error::JwtGeneration {
            message: format!("Failed to encode JWT: {e}"),
        })?;

        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];
        let response = self.client.post(token_url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::JwtGeneration {
                message: format!("JWT token exchange failed with status {status}: {body}"),
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!(client_email = %self.key.client_email, "Obtained Sheets access token");
        Ok(token.access_token)
    }

    /// Replace the worksheet contents with `records`; returns rows written
    #[instrument(skip_all, fields(spreadsheet = %self.config.spreadsheet_id, worksheet = %self.config.worksheet))]
    pub async fn upload(&self, records: &[Record]) -> Result<usize> {
        let token = self.access_token().await?;
        let sheet_id = self.ensure_worksheet(&token).await?;
        let range = quote_sheet_title(&self.config.worksheet);

        self.send(
            self.client
                .post(self.url(&["values", &format!("{range}:clear")], None)?)
                .json(&json!({})),
            &token,
            "clear worksheet",
        )
        .await?;

        let rows = sheet_rows(records);
        let target = format!("{range}!A1");
        self.send(
            self.client
                .put(self.url(&["values", &target], Some(("valueInputOption", "RAW")))?)
                .json(&json!({
                    "range": target,
                    "majorDimension": "ROWS",
                    "values": rows,
                })),
            &token,
            "write values",
        )
        .await?;

        self.format_header(&token, sheet_id).await?;

        info!(rows = records.len(), "Uploaded records to Google Sheets");
        Ok(records.len())
    }

    /// Find the worksheet by title, creating it when missing; returns its sheet id
    async fn ensure_worksheet(&self, token: &str) -> Result<i64> {
        let body = self
            .send(
                self.client
                    .get(self.url(&[], Some(("fields", "sheets.properties")))?),
                token,
                "read spreadsheet",
            )
            .await?;

        let existing = body["sheets"].as_array().and_then(|sheets| {
            sheets.iter().find_map(|sheet| {
                let properties = &sheet["properties"];
                (properties["title"].as_str() == Some(self.config.worksheet.as_str()))
                    .then(|| properties["sheetId"].as_i64().unwrap_or(0))
            })
        });
        if let Some(sheet_id) = existing {
            return Ok(sheet_id);
        }

        info!(worksheet = %self.config.worksheet, "Creating worksheet");
        let reply = self
            .batch_update(
                token,
                json!([{
                    "addSheet": {
                        "properties": {
                            "title": self.config.worksheet,
                            "gridProperties": {
                                "rowCount": NEW_SHEET_ROWS,
                                "columnCount": NEW_SHEET_COLUMNS,
                            }
                        }
                    }
                }]),
            )
            .await?;

        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| Error::sheets("addSheet reply carried no sheetId"))
    }

    async fn format_header(&self, token: &str, sheet_id: i64) -> Result<()> {
        self.batch_update(
            token,
            json!([{
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 0,
                        "endRowIndex": 1,
                        "startColumnIndex": 0,
                        "endColumnIndex": SHEET_HEADERS.len(),
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "textFormat": {"bold": true},
                            "backgroundColor": {"red": 0.9, "green": 0.9, "blue": 0.9}
                        }
                    },
                    "fields": "userEnteredFormat(textFormat,backgroundColor)"
                }
            }]),
        )
        .await
        .map(|_| ())
    }

    async fn batch_update(&self, token: &str, requests: JsonValue) -> Result<JsonValue> {
        let url = self.url(&[], None)?;
        let url = Url::parse(&format!("{}:batchUpdate", url.as_str().trim_end_matches('/')))?;
        self.send(
            self.client
                .post(url)
                .json(&json!({ "requests": requests })),
            token,
            "batch update",
        )
        .await
    }

    /// `{api_base}{spreadsheet_id}/{segments...}` with an optional query pair
    fn url(&self, segments: &[&str], query: Option<(&str, &str)>) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base)?.join(&self.config.spreadsheet_id)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::sheets("Sheets API base cannot be a base URL"))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, token: &str, what: &str) -> Result<JsonValue> {
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let preview: String = text.chars().take(500).collect();
            return Err(Error::sheets(format!(
                "{what} failed with HTTP {}: {preview}",
                status.as_u16()
            )));
        }

        debug!(operation = what, status = status.as_u16(), "Sheets request succeeded");
        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Quote a sheet title for A1 notation
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
