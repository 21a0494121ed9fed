//! CSV ingest and normalization.
//!
//! This module turns the Tesouro Transparente price CSV into a clean set of
//! `BondQuote`s.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness, no clock access)
//! - **Separation of concerns**: no variation logic here

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;

use crate::classify::classify;
use crate::domain::BondQuote;
use crate::error::AppError;

pub const COL_OBSERVATION_DATE: &str = "Data Base";
pub const COL_NAME: &str = "Tipo Titulo";
pub const COL_UNIT_PRICE: &str = "PU Base Manha";
pub const COL_MATURITY_DATE: &str = "Data Vencimento";
pub const COL_BUY_RATE: &str = "Taxa Compra Manha";
pub const COL_SELL_RATE: &str = "Taxa Venda Manha";
pub const COL_BUY_PRICE: &str = "PU Compra Manha";
pub const COL_SELL_PRICE: &str = "PU Venda Manha";

const REQUIRED_COLUMNS: [&str; 4] = [
    COL_OBSERVATION_DATE,
    COL_NAME,
    COL_UNIT_PRICE,
    COL_MATURITY_DATE,
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub name: Option<String>,
    pub message: String,
}

/// Ingest output: normalized quotes + row errors + counters.
#[derive(Debug, Clone)]
pub struct IngestedQuotes {
    pub quotes: Vec<BondQuote>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Decode a downloaded body.
///
/// The published file has shipped both as UTF-8 and as Latin-1 over the
/// years. Valid UTF-8 wins; anything else is read as Latin-1, where every
/// byte maps to the code point of the same value.
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse and normalize the semicolon-delimited price CSV.
pub fn parse_prices_csv(text: &str) -> Result<IngestedQuotes, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut quotes = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    name: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match normalize_row(&record, &header_map) {
            Ok(quote) => quotes.push(quote),
            Err(message) => row_errors.push(RowError {
                line,
                name: get_optional(&record, &header_map, COL_NAME).map(str::to_string),
                message,
            }),
        }
    }

    let rows_used = quotes.len();
    tracing::debug!(rows_read, rows_used, dropped = row_errors.len(), "normalized price CSV");

    Ok(IngestedQuotes {
        quotes,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM; without
    // stripping it, schema validation reports a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !header_map.contains_key(&normalize_header_name(col)))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::input(format!(
        "The price CSV must contain the columns: {}. Missing: {}.",
        REQUIRED_COLUMNS.join(", "),
        missing.join(", ")
    )))
}

fn normalize_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<BondQuote, String> {
    let instrument_name = get_required(record, header_map, COL_NAME)?.to_string();
    let observation_date = parse_br_date(get_required(record, header_map, COL_OBSERVATION_DATE)?)?;
    let maturity_date = parse_br_date(get_required(record, header_map, COL_MATURITY_DATE)?)?;
    let unit_price = parse_br_decimal(get_required(record, header_map, COL_UNIT_PRICE)?)?;

    if observation_date > maturity_date {
        return Err(format!(
            "Observation date {observation_date} is after maturity date {maturity_date}."
        ));
    }

    // Optional columns never invalidate a row; unparseable values become `None`.
    let optional = |col: &str| get_optional(record, header_map, col).and_then(|s| parse_br_decimal(s).ok());

    Ok(BondQuote {
        instrument_type: classify(&instrument_name),
        instrument_name,
        observation_date,
        maturity_date,
        unit_price,
        buy_rate: optional(COL_BUY_RATE),
        sell_rate: optional(COL_SELL_RATE),
        buy_price: optional(COL_BUY_PRICE),
        sell_price: optional(COL_SELL_PRICE),
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(&normalize_header_name(name))
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(&normalize_header_name(name))?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a `DD/MM/YYYY` date.
pub fn parse_br_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .map_err(|_| format!("Invalid date '{s}'. Expected DD/MM/YYYY."))
}

pub fn format_br_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parse a non-negative number that may use the Brazilian locale.
///
/// When a comma is present it is the decimal mark and dots are thousands
/// separators (`1.234,56`). Without a comma the value is parsed as-is
/// (`1234.56`). Mixed forms such as `1,234.56` are rejected.
pub fn parse_br_decimal(s: &str) -> Result<Decimal, String> {
    let trimmed = s.trim();
    let canonical = match trimmed.rsplit_once(',') {
        Some((int_part, frac_part)) => {
            if frac_part.contains('.') || int_part.contains(',') {
                return Err(format!("Invalid number '{s}'. Expected 1.234,56 or 1234.56."));
            }
            format!("{}.{frac_part}", int_part.replace('.', ""))
        }
        None => trimmed.to_string(),
    };

    let value = Decimal::from_str(&canonical).map_err(|_| format!("Invalid number '{s}'."))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(format!("Negative value '{s}' is not a valid price or rate."));
    }
    Ok(value)
}

/// Format with a comma decimal mark and dot thousands separators.
///
/// The output parses back through `parse_br_decimal` to the same value.
pub fn format_br_decimal(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp(decimals);
    let plain = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (plain.clone(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped},{f}"),
        None => format!("{sign}{grouped}"),
    }
}
