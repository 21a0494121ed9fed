//! Day-over-day price variation per instrument group.
//!
//! Stateless and deterministic: the only inputs are the quote snapshot, the
//! read-only reference table and the query. "Most recent" always means most
//! recent *in the snapshot*, never relative to the wall clock.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::classify::ReferenceTable;
use crate::domain::{
    BondQuote, InstrumentType, PercentChange, VariationOutcome, VariationRecord, VariationReport,
};

/// Request-scoped parameters for a variation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariationQuery {
    /// Restrict to one category before the dates are selected.
    pub instrument_type: Option<InstrumentType>,
}

/// The two most recent distinct dates, newest first.
pub fn latest_two_dates<'a>(quotes: impl IntoIterator<Item = &'a BondQuote>) -> Option<(NaiveDate, NaiveDate)> {
    let dates: BTreeSet<NaiveDate> = quotes.into_iter().map(|q| q.observation_date).collect();
    let mut newest_first = dates.into_iter().rev();
    let latest = newest_first.next()?;
    let previous = newest_first.next()?;
    Some((latest, previous))
}

/// Compute the percent change per group between the two latest dates.
pub fn compute_variation(
    quotes: &[BondQuote],
    reference: &ReferenceTable,
    query: VariationQuery,
) -> VariationOutcome {
    let selected: Vec<&BondQuote> = quotes
        .iter()
        .filter(|q| query.instrument_type.is_none_or(|t| q.instrument_type == t))
        .collect();

    let distinct_dates = selected
        .iter()
        .map(|q| q.observation_date)
        .collect::<BTreeSet<_>>()
        .len();

    let Some((latest, previous)) = latest_two_dates(selected.iter().copied()) else {
        return VariationOutcome::InsufficientDates { distinct_dates };
    };

    // group key -> (quote on latest date, quote on previous date); first row wins.
    let mut latest_by_group: HashMap<String, &BondQuote> = HashMap::new();
    let mut previous_by_group: HashMap<String, &BondQuote> = HashMap::new();
    let mut duplicates = 0usize;

    for &q in &selected {
        let slot = if q.observation_date == latest {
            &mut latest_by_group
        } else if q.observation_date == previous {
            &mut previous_by_group
        } else {
            continue;
        };
        match slot.entry(q.group_key()) {
            Entry::Occupied(_) => duplicates += 1,
            Entry::Vacant(vacant) => {
                vacant.insert(q);
            }
        }
    }
    if duplicates > 0 {
        tracing::debug!(duplicates, "ignored repeated group observations on a selected date");
    }

    // Inner join: a group must be observed on both dates.
    let mut records: Vec<VariationRecord> = latest_by_group
        .iter()
        .filter_map(|(key, now)| {
            let before = previous_by_group.get(key)?;
            Some(build_record(key, before, now, reference))
        })
        .collect();

    if records.is_empty() {
        return VariationOutcome::NoCommonGroups { latest, previous };
    }

    sort_records(&mut records);

    VariationOutcome::Computed(VariationReport {
        latest_date: latest,
        previous_date: previous,
        instrument_type: query.instrument_type,
        records,
    })
}

fn build_record(key: &str, before: &BondQuote, now: &BondQuote, reference: &ReferenceTable) -> VariationRecord {
    let maturity_year = now.maturity_year();
    VariationRecord {
        group_key: key.to_string(),
        instrument_name: now.instrument_name.clone(),
        maturity_year,
        instrument_type: now.instrument_type,
        abbreviation: reference.lookup(&now.instrument_name, maturity_year).text,
        price_previous: before.unit_price,
        price_latest: now.unit_price,
        percent_change: PercentChange::between(before.unit_price, now.unit_price),
    }
}

/// Descending percent change; undefined ratios last; ties by group key.
pub fn sort_records(records: &mut [VariationRecord]) {
    records.sort_by(|a, b| {
        compare_change(a.percent_change, b.percent_change).then_with(|| a.group_key.cmp(&b.group_key))
    });
}

fn compare_change(a: PercentChange, b: PercentChange) -> Ordering {
    match (a.value(), b.value()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Mean of the defined changes; undefined ratios are skipped.
///
/// `None` when nothing is defined or the sum leaves the `Decimal` range.
pub fn mean_change(records: &[VariationRecord]) -> Option<Decimal> {
    let values: Vec<Decimal> = records.iter().filter_map(|r| r.percent_change.value()).collect();
    if values.is_empty() {
        return None;
    }
    let total = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    total.checked_div(Decimal::from(values.len()))
}
