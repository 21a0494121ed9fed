//! Input/output helpers.
//!
//! - CSV decode + validation + normalization (`ingest`)
//! - result exports (CSV/JSON) and report reload (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
