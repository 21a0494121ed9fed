//! Remote data sources.

pub mod tesouro;

pub use tesouro::*;
