//! Record types
//!
//! A `Record` is one normalized contract announcement. Records are built once
//! by [`super::normalize`] and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between the two counterparties in `subjects`
pub const SUBJECTS_SEPARATOR: &str = " 🤝 ";

/// Separator used when the market list is rendered as a single cell
pub const MARKETS_SEPARATOR: &str = ", ";

/// Source-assigned identifier (the API has returned both numbers and strings)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric id
    Number(i64),
    /// String id
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Independent boolean flags attached to a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContractFlags {
    pub retail: bool,
    pub acquisition: bool,
    pub startup: bool,
    pub rebranding: bool,
}

/// Markets travel as a single `"es, pt"` string in exported JSON
mod markets_cell {
    use super::MARKETS_SEPARATOR;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(markets: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&markets.join(MARKETS_SEPARATOR))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Joined(String),
        List(Vec<String>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Cell::deserialize(deserializer)? {
            Cell::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(String::from)
                .collect(),
            Cell::List(codes) => codes,
        })
    }
}

/// One normalized contract announcement
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Source identifier, if the item carried one
    pub id: Option<RecordId>,
    /// Link to the announcement page
    pub link: String,
    /// First counterparty
    pub company1: String,
    /// Second counterparty
    pub company2: String,
    /// Both counterparties joined with [`SUBJECTS_SEPARATOR`]
    pub subjects: String,
    /// Announcement date, as sent by the source
    pub date: String,
    /// First market code, uppercased
    pub country: String,
    /// All market codes in source order; serialized as one joined string
    #[serde(with = "markets_cell")]
    pub markets: Vec<String>,
    /// Second-to-last path segment of `link`
    pub contract_slug: String,
    /// Contract flags
    pub flags: ContractFlags,
}

impl Record {
    /// Market codes rendered as one cell (`"es, pt"`)
    pub fn markets_joined(&self) -> String {
        self.markets.join(MARKETS_SEPARATOR)
    }

    /// Id rendered for tabular sinks (empty when absent)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// De-duplication key: `(id, link)` when both are present
    pub fn dedup_key(&self) -> Option<(String, String)> {
        match &self.id {
            Some(id) if !self.link.is_empty() => Some((id.to_string(), self.link.clone())),
            _ => None,
        }
    }
}
