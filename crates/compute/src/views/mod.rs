//! Per-view reducers.
//!
//! Each view is a pure function from filtered records to a `Vec` of plain
//! serializable rows. Time series come back most recent first; breakdowns
//! come back sorted by their headline measure, ties broken by key.

pub mod cancellations;
pub mod conversion;
pub mod discounts;
pub mod leads;
pub mod sales;
pub mod sessions;
pub mod trainers;
