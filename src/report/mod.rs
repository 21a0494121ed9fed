//! Reporting utilities: terminal tables for variation, market and comparison views.

pub mod format;

pub use format::*;
