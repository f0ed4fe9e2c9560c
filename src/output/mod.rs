//! Output module
//!
//! Sinks for collected records.
//!
//! # Overview
//!
//! This module provides:
//! - JSON export (full record, nested flags)
//! - CSV and Parquet export with a fixed flattened column layout
//! - Google Sheets upload through a service account

mod schema;
mod sheets;
mod writer;

pub use schema::{
    contracts_schema, records_to_batch, sheet_rows, FlatRecord, CSV_COLUMNS, SHEET_HEADERS,
};
pub use sheets::{
    ServiceAccountKey, SheetsConfig, SheetsUploader, DEFAULT_SHEETS_API, DEFAULT_TOKEN_URL,
    SHEETS_SCOPE,
};
pub use writer::{write_csv, write_json, write_parquet, ParquetWriterConfig};

use crate::error::Result;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File format of a local sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Parquet,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Write `records` to `path` in this format; returns records written
    pub fn write(self, path: impl AsRef<Path>, records: &[Record]) -> Result<usize> {
        match self {
            Self::Json => write_json(path, records),
            Self::Csv => write_csv(path, records),
            Self::Parquet => write_parquet(path, records, None),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        })
    }
}
