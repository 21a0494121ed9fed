//! Command-line parsing for the Tesouro Direto variation tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fetch/normalize/compute code. Every argument becomes a request-scoped
//! value; nothing here touches global state.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::domain::{FamilyArg, InstrumentType, Side};
use crate::report::TableView;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "td", version, about = "Tesouro Direto price variation (Tesouro Transparente + B3 feeds)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Day-over-day change of the morning base price per instrument group.
    Variation(VariationArgs),
    /// Current market rates and prices from the live API.
    Market(MarketArgs),
    /// Market open/closed status and trading window.
    Status,
    /// Current buy price vs the latest historical base price.
    Compare(CompareArgs),
    /// Re-print a report saved with `td variation --export-json`.
    Show(ShowArgs),
}

/// Options for the variation table.
#[derive(Debug, Parser, Clone)]
pub struct VariationArgs {
    /// Read the price history from a local CSV instead of downloading it.
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Restrict to one instrument type (applied before the two dates are picked).
    #[arg(short = 't', long = "type", value_enum)]
    pub instrument_type: Option<InstrumentType>,

    /// Abbreviation table (`Titulo;Abreviatura;Tipo`). Defaults to the built-in table.
    #[arg(long, value_name = "CSV")]
    pub reference: Option<PathBuf>,

    /// Label rows by full group name or by abbreviation.
    #[arg(long, value_enum, default_value_t = TableView::Group)]
    pub view: TableView,

    /// Show only the first N rows of the table.
    #[arg(long)]
    pub top: Option<usize>,

    /// Export per-group results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the full report to JSON (reloadable with `td show`).
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for the current market table.
#[derive(Debug, Parser, Clone)]
pub struct MarketArgs {
    /// Index family to show.
    #[arg(long, value_enum)]
    pub family: Option<FamilyArg>,

    /// Buy side drops instruments not currently offered for purchase.
    #[arg(long, value_enum, default_value_t = Side::Both)]
    pub side: Side,

    /// Reference Selic rate (percent, `14.75` or `14,75`).
    #[arg(long, value_parser = parse_rate)]
    pub ref_selic: Option<Decimal>,

    /// Reference rate for prefixado instruments.
    #[arg(long, value_parser = parse_rate)]
    pub ref_prefixado: Option<Decimal>,

    /// Reference real rate for IPCA instruments.
    #[arg(long, value_parser = parse_rate)]
    pub ref_ipca: Option<Decimal>,
}

/// Options for the market vs history comparison.
#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    /// Read the price history from a local CSV instead of downloading it.
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Index family to compare.
    #[arg(long, value_enum)]
    pub family: Option<FamilyArg>,
}

/// Options for re-printing a saved report.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Report JSON produced by `td variation --export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    #[arg(long, value_enum, default_value_t = TableView::Group)]
    pub view: TableView,

    #[arg(long)]
    pub top: Option<usize>,
}

fn parse_rate(s: &str) -> Result<Decimal, String> {
    crate::io::ingest::parse_br_decimal(s)
}
