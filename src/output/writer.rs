//! File sinks
//!
//! JSON, CSV and Parquet writers for collected records. Each writer creates
//! missing parent directories and replaces any existing file.

use super::schema::{contracts_schema, records_to_batch, FlatRecord};
use crate::error::{Error, Result};
use crate::record::Record;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 64 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::output(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    File::create(path)
        .map_err(|e| Error::output(format!("Failed to create {}: {e}", path.display())))
}

/// Write records as a pretty-printed JSON array (UTF-8, non-ASCII kept)
pub fn write_json(path: impl AsRef<Path>, records: &[Record]) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(create_file(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "Wrote JSON");
    Ok(records.len())
}

/// Write records as CSV with a header row
pub fn write_csv(path: impl AsRef<Path>, records: &[Record]) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(create_file(path)?);

    if records.is_empty() {
        writer.write_record(super::schema::CSV_COLUMNS)?;
    }
    for record in records {
        writer.serialize(FlatRecord::from(record))?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "Wrote CSV");
    Ok(records.len())
}

/// Write records to a Parquet file
pub fn write_parquet(
    path: impl AsRef<Path>,
    records: &[Record],
    config: Option<&ParquetWriterConfig>,
) -> Result<usize> {
    let path = path.as_ref();
    let default_config = ParquetWriterConfig::default();
    let config = config.unwrap_or(&default_config);

    let batch = records_to_batch(records)?;
    let mut writer = ArrowWriter::try_new(
        create_file(path)?,
        Arc::new(contracts_schema()),
        Some(config.build_properties()),
    )
    .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;

    writer
        .write(&batch)
        .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;

    info!(path = %path.display(), records = records.len(), "Wrote Parquet");
    Ok(records.len())
}
