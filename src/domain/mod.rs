//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - normalized quotes (`BondQuote`) and the instrument taxonomy (`InstrumentType`)
//! - reference-table rows and abbreviation lookups
//! - variation outputs (`VariationRecord`, `VariationReport`, `VariationOutcome`)
//! - flattened market API rows (`MarketQuote`, `MarketStatus`)

pub mod types;

pub use types::*;
