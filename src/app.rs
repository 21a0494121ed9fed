//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - fetches and normalizes the price history / market snapshot
//! - runs the variation engine and the market views
//! - prints tables and writes optional exports

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Command, CompareArgs, MarketArgs, ShowArgs, VariationArgs};
use crate::domain::{IndexFamily, Side, VariationOutcome, VariationReport};
use crate::error::AppError;
use crate::io::ingest::format_br_date;
use crate::market::{
    MarketFilter, ReferenceRates, compare_market_to_history, filter_quotes, history_dates,
};
use crate::variation::VariationQuery;

pub mod cache;
pub mod pipeline;

use pipeline::Session;

/// Entry point for the `td` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `td` and `td --type selic` behave like `td variation ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Variation(args) => handle_variation(args),
        Command::Market(args) => handle_market(args),
        Command::Status => handle_status(),
        Command::Compare(args) => handle_compare(args),
        Command::Show(args) => handle_show(args),
    }
}

fn init_tracing() {
    // Logs go to stderr so tables on stdout stay pipeable.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("td_variation=info")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn handle_variation(args: VariationArgs) -> Result<(), AppError> {
    let reference = pipeline::load_reference(args.reference.as_deref())?;
    let mut session = Session::from_env()?;
    let history = session.load_history(args.file.as_deref())?;

    println!(
        "{}",
        crate::report::format_ingest_summary(&history.ingest, &history.source)
    );

    let query = VariationQuery {
        instrument_type: args.instrument_type,
    };
    let report = require_report(pipeline::run_variation(&history, &reference, query), query)?;

    println!(
        "{}",
        crate::report::format_variation_report(&report, args.view, args.top)
    );

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::export::write_variation_csv(path, &report)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::export::write_report_json(path, &report)?;
    }

    Ok(())
}

/// Turn the non-computed outcomes into exit-code-3 errors.
fn require_report(outcome: VariationOutcome, query: VariationQuery) -> Result<VariationReport, AppError> {
    let scope = query
        .instrument_type
        .map(|t| format!(" for type {t}"))
        .unwrap_or_default();
    match outcome {
        VariationOutcome::Computed(report) => Ok(report),
        VariationOutcome::InsufficientDates { distinct_dates } => Err(AppError::insufficient(format!(
            "Need at least two distinct dates to compute a variation{scope}; found {distinct_dates}."
        ))),
        VariationOutcome::NoCommonGroups { latest, previous } => Err(AppError::insufficient(format!(
            "No instrument{scope} has prices on both {} and {}.",
            format_br_date(previous),
            format_br_date(latest)
        ))),
    }
}

fn handle_market(args: MarketArgs) -> Result<(), AppError> {
    let mut session = Session::from_env()?;
    let snapshot = session.load_market()?;

    let filter = MarketFilter {
        family: args.family.map(IndexFamily::from),
        side: args.side,
    };
    let refs = ReferenceRates::default()
        .with(IndexFamily::Selic, args.ref_selic)
        .with(IndexFamily::Prefixado, args.ref_prefixado)
        .with(IndexFamily::Ipca, args.ref_ipca);

    println!("{}", crate::report::format_market_status(&snapshot.status));
    let rows = filter_quotes(&snapshot.quotes, &filter);
    println!("{}", crate::report::format_market_table(&rows, args.side, &refs));
    Ok(())
}

fn handle_status() -> Result<(), AppError> {
    let mut session = Session::from_env()?;
    let snapshot = session.load_market()?;
    print!("{}", crate::report::format_market_status(&snapshot.status));
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let mut session = Session::from_env()?;
    let snapshot = session.load_market()?;
    let history = session.load_history(args.file.as_deref())?;

    if history.ingest.quotes.is_empty() {
        return Err(AppError::insufficient(format!(
            "No usable rows in the price history from {}.",
            history.source
        )));
    }

    if let Some((latest, previous)) = history_dates(&history.ingest.quotes) {
        let previous = previous
            .map(|d| format!(" (previous {})", format_br_date(d)))
            .unwrap_or_default();
        println!("History: latest {}{previous}", format_br_date(latest));
    }

    let filter = MarketFilter {
        family: args.family.map(IndexFamily::from),
        side: Side::Buy,
    };
    let rows = filter_quotes(&snapshot.quotes, &filter);
    let comparisons = compare_market_to_history(&rows, &history.ingest.quotes);
    println!("{}", crate::report::format_comparisons(&comparisons));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::export::read_report_json(&args.report)?;
    println!(
        "{}",
        crate::report::format_variation_report(&report, args.view, args.top)
    );
    Ok(())
}

/// Rewrite argv so `td` defaults to `td variation`.
///
/// Rules:
/// - `td`                      -> `td variation`
/// - `td --type selic ...`     -> `td variation --type selic ...`
/// - `td --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("variation".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "variation".to_string());
    }
    argv
}
