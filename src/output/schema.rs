//! Column layout shared by the tabular sinks
//!
//! CSV, Parquet and Sheets all use the same flattened view of a [`Record`]:
//! markets joined into one string and the four flags as separate columns.

use crate::error::Result;
use crate::record::Record;
use arrow::array::{ArrayRef, BooleanArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use std::sync::Arc;

/// Column names for CSV and Parquet
pub const CSV_COLUMNS: [&str; 13] = [
    "id",
    "link",
    "company1",
    "company2",
    "subjects",
    "date",
    "country",
    "markets",
    "contract_slug",
    "flag_retail",
    "flag_acquisition",
    "flag_startup",
    "flag_rebranding",
];

/// Header row for the spreadsheet
pub const SHEET_HEADERS: [&str; 13] = [
    "ID",
    "Link",
    "Company 1",
    "Company 2",
    "Subjects",
    "Date",
    "Country",
    "Markets",
    "Contract Slug",
    "Retail",
    "Acquisition",
    "Startup",
    "Rebranding",
];

/// One flattened row; field order matches [`CSV_COLUMNS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRecord<'a> {
    pub id: String,
    pub link: &'a str,
    pub company1: &'a str,
    pub company2: &'a str,
    pub subjects: &'a str,
    pub date: &'a str,
    pub country: &'a str,
    pub markets: String,
    pub contract_slug: &'a str,
    pub flag_retail: bool,
    pub flag_acquisition: bool,
    pub flag_startup: bool,
    pub flag_rebranding: bool,
}

impl<'a> From<&'a Record> for FlatRecord<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            id: record.id_string(),
            link: &record.link,
            company1: &record.company1,
            company2: &record.company2,
            subjects: &record.subjects,
            date: &record.date,
            country: &record.country,
            markets: record.markets_joined(),
            contract_slug: &record.contract_slug,
            flag_retail: record.flags.retail,
            flag_acquisition: record.flags.acquisition,
            flag_startup: record.flags.startup,
            flag_rebranding: record.flags.rebranding,
        }
    }
}

/// Arrow schema for contract records
pub fn contracts_schema() -> Schema {
    let mut fields: Vec<Field> = Vec::with_capacity(CSV_COLUMNS.len());
    fields.push(Field::new("id", DataType::Utf8, true));
    for name in &CSV_COLUMNS[1..9] {
        fields.push(Field::new(*name, DataType::Utf8, false));
    }
    for name in &CSV_COLUMNS[9..] {
        fields.push(Field::new(*name, DataType::Boolean, false));
    }
    Schema::new(fields)
}

/// Convert records to an Arrow RecordBatch with [`contracts_schema`]
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch> {
    let strings = |f: fn(&Record) -> String| -> ArrayRef {
        Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let flags = |f: fn(&Record) -> bool| -> ArrayRef {
        Arc::new(BooleanArray::from(records.iter().map(f).collect::<Vec<_>>()))
    };

    let ids: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| r.id.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>(),
    ));

    let columns = vec![
        ids,
        strings(|r| r.link.clone()),
        strings(|r| r.company1.clone()),
        strings(|r| r.company2.clone()),
        strings(|r| r.subjects.clone()),
        strings(|r| r.date.clone()),
        strings(|r| r.country.clone()),
        strings(Record::markets_joined),
        strings(|r| r.contract_slug.clone()),
        flags(|r| r.flags.retail),
        flags(|r| r.flags.acquisition),
        flags(|r| r.flags.startup),
        flags(|r| r.flags.rebranding),
    ];

    Ok(RecordBatch::try_new(Arc::new(contracts_schema()), columns)?)
}

/// Spreadsheet cell for a flag
fn yes_or_blank(flag: bool) -> String {
    if flag { "Yes" } else { "" }.to_string()
}

/// Header plus one row per record, as spreadsheet cell values
pub fn sheet_rows(records: &[Record]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(SHEET_HEADERS.iter().map(ToString::to_string).collect());
    for record in records {
        rows.push(vec![
            record.id_string(),
            record.link.clone(),
            record.company1.clone(),
            record.company2.clone(),
            record.subjects.clone(),
            record.date.clone(),
            record.country.clone(),
            record.markets_joined(),
            record.contract_slug.clone(),
            yes_or_blank(record.flags.retail),
            yes_or_blank(record.flags.acquisition),
            yes_or_blank(record.flags.startup),
            yes_or_blank(record.flags.rebranding),
        ]);
    }
    rows
}
