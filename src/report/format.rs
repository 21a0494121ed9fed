//! Formatted terminal output.
//!
//! We keep formatting code in one place so the pipeline stays free of
//! presentation concerns and output changes are localized.

use clap::ValueEnum;

use crate::domain::{
    MarketComparison, MarketQuote, MarketStatus, PercentChange, RateSignal, Side, VariationReport,
};
use crate::io::ingest::{IngestedQuotes, format_br_date, format_br_decimal};
use crate::market::ReferenceRates;
use crate::variation::mean_change;

/// Row label used by the variation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TableView {
    /// Full name + maturity year.
    #[default]
    Group,
    /// Short abbreviation plus type column.
    Abbrev,
}

const MAX_ROW_ERRORS_SHOWN: usize = 5;

/// Rows read/used/dropped plus the first few row errors.
pub fn format_ingest_summary(ingest: &IngestedQuotes, source: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Rows: read={} used={} dropped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    for err in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        out.push_str(&format!(
            "  line {}{}: {}\n",
            err.line,
            err.name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default(),
            err.message
        ));
    }
    if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!(
            "  ... {} more\n",
            ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN
        ));
    }
    out
}

/// Variation table, already sorted by the engine.
pub fn format_variation_report(report: &VariationReport, view: TableView, top: Option<usize>) -> String {
    let mut out = String::new();

    out.push_str("=== td - Variação do PU Base Manhã ===\n");
    out.push_str(&format!(
        "Dates: {} -> {}\n",
        format_br_date(report.previous_date),
        format_br_date(report.latest_date)
    ));
    if let Some(t) = report.instrument_type {
        out.push_str(&format!("Type: {t}\n"));
    }
    out.push_str(&format!("Groups: {}", report.records.len()));
    if let Some(mean) = mean_change(&report.records) {
        out.push_str(&format!(" | mean change: {mean:.2}%"));
    }
    out.push('\n');
    if report.undefined_count() > 0 {
        out.push_str(&format!(
            "Note: {} group(s) had a previous price of zero; their change is undefined.\n",
            report.undefined_count()
        ));
    }
    out.push('\n');

    let prev_label = format!("PU {}", format_br_date(report.previous_date));
    let latest_label = format!("PU {}", format_br_date(report.latest_date));

    let header = match view {
        TableView::Group => format!(
            "{:<44} {:>14} {:>14} {:>10}",
            "group", prev_label, latest_label, "change %"
        ),
        TableView::Abbrev => format!(
            "{:<22} {:<10} {:>14} {:>14} {:>10}",
            "abbreviation", "type", prev_label, latest_label, "change %"
        ),
    };
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(header.trim_end().chars().count()));
    out.push('\n');

    let limit = top.unwrap_or(usize::MAX);
    for r in report.records.iter().take(limit) {
        let line = match view {
            TableView::Group => format!(
                "{:<44} {:>14} {:>14} {:>10}",
                truncate(&r.group_key, 44),
                format_br_decimal(r.price_previous, 2),
                format_br_decimal(r.price_latest, 2),
                fmt_change(r.percent_change),
            ),
            TableView::Abbrev => format!(
                "{:<22} {:<10} {:>14} {:>14} {:>10}",
                truncate(&r.abbreviation, 22),
                r.instrument_type.label(),
                format_br_decimal(r.price_previous, 2),
                format_br_decimal(r.price_latest, 2),
                fmt_change(r.percent_change),
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

pub fn format_market_status(status: &MarketStatus) -> String {
    let mut out = String::new();
    let marker = if status.is_open() { "[open]" } else { "[closed]" };
    out.push_str(&format!("Market status: {} {marker}\n", status.status));
    out.push_str(&format!(
        "  Opening: {} {}\n",
        status.opening.format("%d/%m/%Y"),
        status.opening.format("%H:%M")
    ));
    out.push_str(&format!(
        "  Closing: {} {}\n",
        status.closing.format("%d/%m/%Y"),
        status.closing.format("%H:%M")
    ));
    out
}

/// Current market table. Columns follow the selected side.
pub fn format_market_table(rows: &[&MarketQuote], side: Side, refs: &ReferenceRates) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No instruments match the filter.\n");
        return out;
    }

    let show_buy = matches!(side, Side::Buy | Side::Both);
    let show_sell = matches!(side, Side::Sell | Side::Both);

    let mut header = format!("{:<10} {:<44} {:<10}", "family", "name", "maturity");
    if show_buy {
        header.push_str(&format!(" {:>8} {:>14} {:<6}", "buy %", "buy PU", "ref"));
    }
    if show_sell {
        header.push_str(&format!(" {:>8} {:>14}", "sell %", "sell PU"));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(header.trim_end().chars().count()));
    out.push('\n');

    for q in rows {
        let mut line = format!(
            "{:<10} {:<44} {:<10}",
            truncate(q.family.label(), 10),
            truncate(&q.name, 44),
            format_br_date(q.maturity_date)
        );
        if show_buy {
            line.push_str(&format!(
                " {:>8} {:>14} {:<6}",
                format_br_decimal(q.buy_rate, 2),
                fmt_opt_price(q.buy_price),
                fmt_signal(refs.signal_for(q)),
            ));
        }
        if show_sell {
            line.push_str(&format!(
                " {:>8} {:>14}",
                format_br_decimal(q.sell_rate, 2),
                fmt_opt_price(q.sell_price),
            ));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn format_comparisons(rows: &[MarketComparison]) -> String {
    let mut out = String::new();
    let Some(first) = rows.first() else {
        out.push_str("No instruments could be matched against the price history.\n");
        return out;
    };

    let hist_label = format!("PU {}", format_br_date(first.historical_date));
    let header = format!(
        "{:<10} {:<44} {:>14} {:>14} {:>10}",
        "family", "name", "PU now", hist_label, "change %"
    );
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(header.trim_end().chars().count()));
    out.push('\n');

    for r in rows {
        let line = format!(
            "{:<10} {:<44} {:>14} {:>14} {:>10}",
            truncate(r.family.label(), 10),
            truncate(&r.name, 44),
            format_br_decimal(r.current_price, 2),
            format_br_decimal(r.historical_price, 2),
            fmt_change(r.percent_change),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn fmt_change(change: PercentChange) -> String {
    match change.rounded() {
        Some(v) => format_br_decimal(v, 2),
        None => "n/a".to_string(),
    }
}

fn fmt_opt_price(price: Option<rust_decimal::Decimal>) -> String {
    price.map(|p| format_br_decimal(p, 2)).unwrap_or_else(|| "-".to_string())
}

fn fmt_signal(signal: Option<RateSignal>) -> &'static str {
    match signal {
        Some(RateSignal::Above) => "above",
        Some(RateSignal::Below) => "below",
        Some(RateSignal::Equal) => "equal",
        None => "",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentType, VariationRecord};
    use crate::io::ingest::RowError;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn report() -> VariationReport {
        let record = |name: &str, abbr: &str, prev: &str, latest: &str| VariationRecord {
            group_key: format!("{name} 2029"),
            instrument_name: name.to_string(),
            maturity_year: 2029,
            instrument_type: crate::classify::classify(name),
            abbreviation: abbr.to_string(),
            price_previous: dec(prev),
            price_latest: dec(latest),
            percent_change: PercentChange::between(dec(prev), dec(latest)),
        };
        VariationReport {
            latest_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            previous_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            instrument_type: Some(InstrumentType::Selic),
            records: vec![
                record("Tesouro Selic", "T Selic 2029", "14000", "14014"),
                record("Tesouro Selic Antigo", "T Selic 2029", "0", "1"),
            ],
        }
    }

    #[test]
    fn variation_table_uses_br_formatting() {
        let text = format_variation_report(&report(), TableView::Group, None);
        assert!(text.contains("Dates: 01/01/2024 -> 02/01/2024"));
        assert!(text.contains("Type: Selic"));
        assert!(text.contains("PU 01/01/2024"));
        assert!(text.contains("14.000,00"));
        assert!(text.contains("0,10"));
        assert!(text.contains("n/a"));
        assert!(text.contains("undefined"));
    }

    #[test]
    fn abbreviation_view_and_top_limit() {
        let text = format_variation_report(&report(), TableView::Abbrev, Some(1));
        assert!(text.contains("T Selic 2029"));
        assert!(text.contains("Selic"));
        assert!(!text.contains("n/a"));
    }

    #[test]
    fn ingest_summary_lists_row_errors() {
        let ingest = IngestedQuotes {
            quotes: Vec::new(),
            row_errors: (0..7)
                .map(|i| RowError {
                    line: i + 2,
                    name: Some("Tesouro Selic".to_string()),
                    message: "Invalid date".to_string(),
                })
                .collect(),
            rows_read: 7,
            rows_used: 0,
        };
        let text = format_ingest_summary(&ingest, "file.csv");
        assert!(text.contains("read=7 used=0 dropped=7"));
        assert!(text.contains("line 2 (Tesouro Selic): Invalid date"));
        assert!(text.contains("... 2 more"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
