//! Pagination module
//!
//! Page-number pagination against the contracts filter endpoint.
//!
//! # Overview
//!
//! Pages are requested by 1-based number. Every response carries a
//! `pagination` object whose `total_pages` is authoritative and may change
//! between responses. The walk stops on an empty page or once the reported
//! page reaches the total.

mod types;

pub use types::{
    FilterRequest, PageResponse, PaginationMeta, PaginationState, ProbeRequest, StopResult,
    MAX_PAGE_SIZE,
};
