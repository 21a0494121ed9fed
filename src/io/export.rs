//! Export variation results.
//!
//! - CSV: one row per group, easy to open in a spreadsheet
//! - JSON: the full `VariationReport`, reloadable with `td show`

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{InstrumentType, VariationReport};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group: &'a str,
    abbreviation: &'a str,
    #[serde(rename = "type")]
    instrument_type: InstrumentType,
    latest_date: String,
    previous_date: String,
    price_previous: String,
    price_latest: String,
    /// Empty when the ratio is undefined.
    percent_change: String,
}

/// Write per-group results to a CSV file.
pub fn write_variation_csv(path: &Path, report: &VariationReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::transport(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let latest_date = report.latest_date.to_string();
    let previous_date = report.previous_date.to_string();
    for r in &report.records {
        writer
            .serialize(CsvRow {
                group: &r.group_key,
                abbreviation: &r.abbreviation,
                instrument_type: r.instrument_type,
                latest_date: latest_date.clone(),
                previous_date: previous_date.clone(),
                price_previous: r.price_previous.to_string(),
                price_latest: r.price_latest.to_string(),
                percent_change: r
                    .percent_change
                    .rounded()
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_default(),
            })
            .map_err(|e| AppError::transport(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::transport(format!("Failed to flush export CSV: {e}")))?;
    tracing::info!(path = %path.display(), rows = report.records.len(), "wrote variation CSV");
    Ok(())
}

/// Write the full report as pretty JSON.
pub fn write_report_json(path: &Path, report: &VariationReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::transport(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::transport(format!("Failed to write report JSON: {e}")))?;
    tracing::info!(path = %path.display(), "wrote report JSON");
    Ok(())
}

/// Read a report JSON file produced by `write_report_json`.
pub fn read_report_json(path: &Path) -> Result<VariationReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid report JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PercentChange, VariationRecord};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn report() -> VariationReport {
        VariationReport {
            latest_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            previous_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            instrument_type: None,
            records: vec![
                VariationRecord {
                    group_key: "Tesouro Selic 2029".to_string(),
                    instrument_name: "Tesouro Selic".to_string(),
                    maturity_year: 2029,
                    instrument_type: InstrumentType::Selic,
                    abbreviation: "T Selic 2029".to_string(),
                    price_previous: Decimal::from_str("100").unwrap(),
                    price_latest: Decimal::from_str("110").unwrap(),
                    percent_change: PercentChange::between(
                        Decimal::from_str("100").unwrap(),
                        Decimal::from_str("110").unwrap(),
                    ),
                },
                VariationRecord {
                    group_key: "Tesouro XPTO 2099".to_string(),
                    instrument_name: "Tesouro XPTO".to_string(),
                    maturity_year: 2099,
                    instrument_type: InstrumentType::Outro,
                    abbreviation: "Tesouro XPTO 2099".to_string(),
                    price_previous: Decimal::ZERO,
                    price_latest: Decimal::ONE,
                    percent_change: PercentChange::Undefined,
                },
            ],
        }
    }

    #[test]
    fn csv_export_has_header_and_blank_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_variation_csv(&path, &report()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "group,abbreviation,type,latest_date,previous_date,price_previous,price_latest,percent_change"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Tesouro Selic 2029,T Selic 2029,Selic,2024-01-02,2024-01-01,100,110,10.00"
        );
        assert!(lines.next().unwrap().ends_with(",0,1,"));
    }

    #[test]
    fn json_export_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let saved = report();
        write_report_json(&path, &saved).unwrap();
        assert_eq!(read_report_json(&path).unwrap(), saved);
    }

    #[test]
    fn reading_missing_file_is_input_error() {
        let err = read_report_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
