//! `td-variation` library crate.
//!
//! The binary (`td`) is a thin wrapper around this library so that:
//!
//! - the fetch/normalize/variation pipeline is testable without the network
//! - every stage takes plain values in and returns plain values out
//! - other front-ends can reuse the same pipeline

pub mod app;
pub mod classify;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod market;
pub mod report;
pub mod variation;
