//! Raw item → `Record` normalization
//!
//! Normalization never fails: every field has a default, so partial or
//! malformed items degrade to empty values instead of aborting a page.
//!
//! Counterparty names are read through an ordered list of extraction
//! strategies. The first strategy that yields a non-empty name wins, per side.

use super::types::{ContractFlags, Record, RecordId, SUBJECTS_SEPARATOR};
use crate::types::{JsonObject, JsonValue, OptionStringExt};

/// Which counterparty to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// A named way of reading a counterparty name out of a raw item
pub type NameStrategy = fn(&JsonObject, Side) -> Option<String>;

/// Extraction strategies, tried in order
pub const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("subject_keys", from_subject_keys),
    ("company_objects", from_company_objects),
];

/// `subject1` / `subject2` as flat string keys
fn from_subject_keys(item: &JsonObject, side: Side) -> Option<String> {
    let key = match side {
        Side::First => "subject1",
        Side::Second => "subject2",
    };
    string_field(item, key)
}

/// `company1.name` / `company2.name` as nested objects
fn from_company_objects(item: &JsonObject, side: Side) -> Option<String> {
    let key = match side {
        Side::First => "company1",
        Side::Second => "company2",
    };
    item.get(key)
        .and_then(JsonValue::as_object)
        .and_then(|company| string_field(company, "name"))
}

/// Normalize one raw item
pub fn normalize(item: &JsonValue) -> Record {
    let Some(obj) = item.as_object() else {
        return Record::default();
    };

    let company1 = counterparty(obj, Side::First);
    let company2 = counterparty(obj, Side::Second);
    let subjects = join_subjects(&company1, &company2);
    let link = string_field(obj, "url").unwrap_or_default();
    let markets = market_list(obj);

    Record {
        id: record_id(obj.get("id")),
        contract_slug: slug_from_link(&link),
        link,
        subjects,
        company1,
        company2,
        date: string_field(obj, "date").unwrap_or_default(),
        country: primary_market(&markets),
        markets,
        flags: contract_flags(obj.get("flags")),
    }
}

/// Normalize every item of a page, preserving order
pub fn normalize_all(items: &[JsonValue]) -> Vec<Record> {
    items.iter().map(normalize).collect()
}

/// Run the strategy chain for one side
pub fn counterparty(item: &JsonObject, side: Side) -> String {
    NAME_STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(item, side))
        .unwrap_or_default()
}

/// `"A 🤝 B"` when both are present, else whichever is, else empty
pub fn join_subjects(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (false, false) => format!("{first}{SUBJECTS_SEPARATOR}{second}"),
        (false, true) => first.to_string(),
        (true, false) => second.to_string(),
        (true, true) => String::new(),
    }
}

/// First market code, uppercased
pub fn primary_market(markets: &[String]) -> String {
    markets.first().map(|m| m.to_uppercase()).unwrap_or_default()
}

/// Second-to-last `/` segment of a link.
///
/// `https://site/umowy/contract-42/` yields `contract-42`; a link without a
/// trailing slash yields its parent segment.
pub fn slug_from_link(link: &str) -> String {
    if link.is_empty() {
        return String::new();
    }
    let segments: Vec<&str> = link.split('/').collect();
    if segments.len() < 2 {
        return String::new();
    }
    segments[segments.len() - 2].to_string()
}

fn record_id(value: Option<&JsonValue>) -> Option<RecordId> {
    match value? {
        JsonValue::Number(n) => Some(match n.as_i64() {
            Some(i) => RecordId::Number(i),
            None => RecordId::Text(n.to_string()),
        }),
        JsonValue::String(s) => s.clone().none_if_empty().map(RecordId::Text),
        _ => None,
    }
}

fn market_list(item: &JsonObject) -> Vec<String> {
    match item.get("market") {
        Some(JsonValue::Array(codes)) => codes
            .iter()
            .filter_map(JsonValue::as_str)
            .filter(|code| !code.is_empty())
            .map(String::from)
            .collect(),
        Some(JsonValue::String(code)) if !code.is_empty() => vec![code.clone()],
        _ => Vec::new(),
    }
}

fn contract_flags(value: Option<&JsonValue>) -> ContractFlags {
    let Some(flags) = value.and_then(JsonValue::as_object) else {
        return ContractFlags::default();
    };
    let flag = |key: &str| flags.get(key).is_some_and(truthy);

    ContractFlags {
        retail: flag("retail"),
        acquisition: flag("acquisition"),
        startup: flag("startup"),
        rebranding: flag("rebranding"),
    }
}

/// WordPress sends flags as bools, 0/1 or "1"/"0" depending on the field
fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

fn string_field(obj: &JsonObject, key: &str) -> Option<String> {
    match obj.get(key)? {
        JsonValue::String(s) => s.trim().to_string().none_if_empty(),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
