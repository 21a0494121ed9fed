use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use td_variation::classify::ReferenceTable;
use td_variation::domain::{AbbreviationSource, InstrumentType, PercentChange, VariationOutcome};
use td_variation::io::ingest::{
    format_br_date, format_br_decimal, parse_br_date, parse_br_decimal, parse_prices_csv,
};
use td_variation::variation::{VariationQuery, compute_variation};

const HEADER: &str = "Tipo Titulo;Data Vencimento;Data Base;Taxa Compra Manha;Taxa Venda Manha;PU Compra Manha;PU Venda Manha;PU Base Manha";

const NAMES: [&str; 5] = [
    "Tesouro Selic",
    "Tesouro Prefixado",
    "Tesouro IPCA+ com Juros Semestrais",
    "Tesouro Renda+ Aposentadoria Extra",
    "Tesouro XPTO",
];

fn csv_line(name: &str, maturity_year: i32, day: u32, price: &str) -> String {
    format!("{name};01/01/{maturity_year};{day:02}/01/2024;;;;;{price}")
}

fn csv(lines: &[String]) -> String {
    let mut text = String::from(HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    text
}

fn run(text: &str, query: VariationQuery) -> VariationOutcome {
    let reference = ReferenceTable::embedded().unwrap();
    let ingest = parse_prices_csv(text).unwrap();
    compute_variation(&ingest.quotes, &reference, query)
}

#[test]
fn simple_increase_is_ten_percent() {
    let text = csv(&[
        csv_line("Tesouro Selic", 2029, 1, "100,00"),
        csv_line("Tesouro Selic", 2029, 2, "110,00"),
    ]);
    let VariationOutcome::Computed(report) = run(&text, VariationQuery::default()) else {
        panic!("expected a computed report");
    };
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].group_key, "Tesouro Selic 2029");
    assert_eq!(report.records[0].percent_change.rounded(), Some(Decimal::new(1000, 2)));
}

#[test]
fn single_date_is_insufficient() {
    let text = csv(&[
        csv_line("Tesouro Selic", 2029, 1, "100,00"),
        csv_line("Tesouro Prefixado", 2031, 1, "700,00"),
    ]);
    assert_eq!(
        run(&text, VariationQuery::default()),
        VariationOutcome::InsufficientDates { distinct_dates: 1 }
    );
}

#[test]
fn group_missing_a_date_is_excluded() {
    let text = csv(&[
        csv_line("Tesouro Selic", 2029, 1, "100,00"),
        csv_line("Tesouro Selic", 2029, 2, "90,00"),
        csv_line("Tesouro Prefixado", 2031, 2, "700,00"),
    ]);
    let VariationOutcome::Computed(report) = run(&text, VariationQuery::default()) else {
        panic!("expected a computed report");
    };
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].percent_change.rounded(), Some(Decimal::new(-1000, 2)));
}

#[test]
fn unknown_title_gets_a_synthesized_abbreviation() {
    let reference = ReferenceTable::embedded().unwrap();
    let abbr = reference.lookup("Tesouro XPTO", 2099);
    assert_eq!(abbr.source, AbbreviationSource::Synthesized);
    assert_eq!(abbr.text, "Tesouro XPTO 2099");

    let text = csv(&[
        csv_line("Tesouro XPTO", 2099, 1, "1.000,00"),
        csv_line("Tesouro XPTO", 2099, 2, "1.010,00"),
    ]);
    let VariationOutcome::Computed(report) = run(&text, VariationQuery::default()) else {
        panic!("expected a computed report");
    };
    assert_eq!(report.records[0].instrument_type, InstrumentType::Outro);
    assert_eq!(report.records[0].abbreviation, "Tesouro XPTO 2099");
}

#[test]
fn thousands_separator_is_parsed() {
    let text = csv(&[csv_line("Tesouro Selic", 2029, 1, "1.234,56")]);
    let ingest = parse_prices_csv(&text).unwrap();
    assert_eq!(ingest.quotes[0].unit_price, Decimal::new(123456, 2));
}

#[test]
fn raw_row_values_survive_display_formatting() {
    for raw in ["1.234,56", "0,01", "14.000,00", "987,10"] {
        let value = parse_br_decimal(raw).unwrap();
        assert_eq!(format_br_decimal(value, 2), raw);
        assert_eq!(parse_br_decimal(&format_br_decimal(value, 2)).unwrap(), value);
    }
    for raw in ["02/01/2024", "29/02/2024", "31/12/1999"] {
        let date = parse_br_date(raw).unwrap();
        assert_eq!(format_br_date(date), raw);
    }
}

#[test]
fn out_of_range_change_is_reported_as_undefined() {
    let text = csv(&[
        csv_line("Tesouro Selic", 2029, 1, "0,01"),
        csv_line("Tesouro Selic", 2029, 2, "100000000000000000000000000"),
    ]);
    let VariationOutcome::Computed(report) = run(&text, VariationQuery::default()) else {
        panic!("expected a computed report");
    };
    assert_eq!(report.records[0].percent_change, PercentChange::Undefined);
    assert_eq!(report.undefined_count(), 1);
}

#[test]
fn type_filter_picks_dates_within_the_type() {
    // Selic has a newer date the Prefixado group never saw.
    let text = csv(&[
        csv_line("Tesouro Prefixado", 2031, 1, "700,00"),
        csv_line("Tesouro Prefixado", 2031, 2, "707,00"),
        csv_line("Tesouro Selic", 2029, 3, "100,00"),
    ]);
    let query = VariationQuery {
        instrument_type: Some(InstrumentType::Prefixado),
    };
    let VariationOutcome::Computed(report) = run(&text, query) else {
        panic!("expected a computed report");
    };
    assert_eq!(report.latest_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(report.records.len(), 1);
}

#[derive(Debug, Clone)]
struct Row {
    name: usize,
    maturity_year: i32,
    day: u32,
    cents: i64,
}

fn row() -> impl Strategy<Value = Row> {
    (0..NAMES.len(), 2030i32..2033, 1u32..5, 0i64..5_000_000).prop_map(|(name, maturity_year, day, cents)| Row {
        name,
        maturity_year,
        day,
        cents,
    })
}

fn rows_to_csv(rows: &[Row]) -> String {
    let lines: Vec<String> = rows
        .iter()
        .map(|r| {
            csv_line(
                NAMES[r.name],
                r.maturity_year,
                r.day,
                &format_br_decimal(Decimal::new(r.cents, 2), 2),
            )
        })
        .collect();
    csv(&lines)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn formatted_prices_parse_back(cents in 0i64..1_000_000_000) {
        let value = Decimal::new(cents, 2);
        prop_assert_eq!(parse_br_decimal(&format_br_decimal(value, 2)).unwrap(), value);
    }

    #[test]
    fn formatted_dates_parse_back(days in 0u64..60_000) {
        let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + chrono::Days::new(days);
        prop_assert_eq!(parse_br_date(&format_br_date(date)).unwrap(), date);
    }

    #[test]
    fn pipeline_is_idempotent(rows in prop::collection::vec(row(), 0..40)) {
        let text = rows_to_csv(&rows);
        prop_assert_eq!(
            run(&text, VariationQuery::default()),
            run(&text, VariationQuery::default())
        );
    }

    #[test]
    fn only_groups_seen_on_both_dates_are_reported(rows in prop::collection::vec(row(), 1..40)) {
        let text = rows_to_csv(&rows);
        let ingest = parse_prices_csv(&text).unwrap();
        let VariationOutcome::Computed(report) =
            run(&text, VariationQuery::default())
        else {
            return Ok(());
        };

        let keys_on = |date: NaiveDate| -> HashSet<String> {
            ingest
                .quotes
                .iter()
                .filter(|q| q.observation_date == date)
                .map(|q| q.group_key())
                .collect()
        };
        let latest = keys_on(report.latest_date);
        let previous = keys_on(report.previous_date);
        let expected: HashSet<String> = latest.intersection(&previous).cloned().collect();
        let reported: HashSet<String> = report.records.iter().map(|r| r.group_key.clone()).collect();

        prop_assert_eq!(reported.len(), report.records.len());
        prop_assert_eq!(reported, expected);
        for r in &report.records {
            if r.price_previous.is_zero() {
                prop_assert_eq!(r.percent_change, PercentChange::Undefined);
            }
        }
    }
}
