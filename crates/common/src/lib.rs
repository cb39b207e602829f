//! Shared types for the ausdex crates
//!
//! This crate holds the vocabulary used by both the `ausdex-core` library and
//! the `ausdex` CLI: CPI locations and the lenient date handling that every
//! date-taking operation goes through.

pub mod dates;
pub mod location;

// Re-export commonly used types
pub use dates::{DateError, DateInput, convert_date, decimal_year, to_decimal_year};
pub use location::Location;
