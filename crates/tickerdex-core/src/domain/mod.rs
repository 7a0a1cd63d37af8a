//! # Domain Models
//!
//! Canonical domain types for tickerdex symbol listings.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Country`] | Country namespace of a listing (KR, US) |
//! | [`SymbolCode`] | Shape-checked exchange code/ticker |
//! | [`SymbolKey`] | Uniqueness key `(country, code)` |
//! | [`SymbolRecord`] | Canonical listing record |
//! | [`RawRecord`] | Source-shaped record before normalization |
//!
//! ## Validation
//!
//! Codes are validated per country when constructed:
//!
//! ```rust,ignore
//! use tickerdex_core::{Country, SymbolCode};
//!
//! assert!(SymbolCode::parse(Country::Kr, "005930").is_ok());
//! assert!(SymbolCode::parse(Country::Kr, "00593").is_err());
//! assert_eq!(SymbolCode::parse(Country::Us, "aapl")?.as_str(), "AAPL");
//! ```

mod record;
mod symbol;

pub use record::{RawRecord, SymbolKey, SymbolRecord};
pub use symbol::{Country, SymbolCode};
