//! Record module
//!
//! Normalizes raw API items into flat contract records.
//!
//! # Overview
//!
//! The source API has been seen sending two item shapes: counterparty names
//! under `subject1`/`subject2`, or nested under `company1.name`/`company2.name`.
//! Both are handled by an ordered strategy chain in [`normalize`].

mod normalize;
mod types;

pub use normalize::{
    counterparty, join_subjects, normalize, normalize_all, primary_market, slug_from_link,
    NameStrategy, Side, NAME_STRATEGIES,
};
pub use types::{ContractFlags, Record, RecordId, MARKETS_SEPARATOR, SUBJECTS_SEPARATOR};
