//! Current-market views built from the API snapshot.
//!
//! - family/side filtering of the flattened quotes
//! - rate signals against user-supplied reference rates
//! - current price vs the latest historical base price

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::{
    BondQuote, IndexFamily, MarketComparison, MarketQuote, PercentChange, RateSignal, Side,
};
use crate::variation::latest_two_dates;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketFilter {
    pub family: Option<IndexFamily>,
    pub side: Side,
}

impl MarketFilter {
    pub fn matches(&self, quote: &MarketQuote) -> bool {
        if let Some(family) = &self.family {
            if &quote.family != family {
                return false;
            }
        }
        match self.side {
            Side::Buy => quote.buy_price.is_some(),
            Side::Sell | Side::Both => true,
        }
    }
}

pub fn filter_quotes<'a>(quotes: &'a [MarketQuote], filter: &MarketFilter) -> Vec<&'a MarketQuote> {
    quotes.iter().filter(|q| filter.matches(q)).collect()
}

/// Compare a rate against a reference. A zero reference means "not set".
pub fn rate_signal(rate: Decimal, reference: Decimal) -> Option<RateSignal> {
    if reference.is_zero() {
        return None;
    }
    Some(match rate.cmp(&reference) {
        std::cmp::Ordering::Greater => RateSignal::Above,
        std::cmp::Ordering::Less => RateSignal::Below,
        std::cmp::Ordering::Equal => RateSignal::Equal,
    })
}

/// Reference rates per family, as typed on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceRates {
    rates: HashMap<IndexFamily, Decimal>,
}

impl ReferenceRates {
    pub fn with(mut self, family: IndexFamily, rate: Option<Decimal>) -> Self {
        if let Some(rate) = rate {
            self.rates.insert(family, rate);
        }
        self
    }

    pub fn signal_for(&self, quote: &MarketQuote) -> Option<RateSignal> {
        let reference = self.rates.get(&quote.family)?;
        rate_signal(quote.buy_rate, *reference)
    }
}

/// Current buy price vs the `PU Base Manha` on the latest historical date.
///
/// Instruments are matched by group key (base name + maturity year). Quotes
/// without a buy price or without a historical counterpart are skipped.
pub fn compare_market_to_history(
    market: &[&MarketQuote],
    history: &[BondQuote],
) -> Vec<MarketComparison> {
    let Some(latest) = history.iter().map(|q| q.observation_date).max() else {
        return Vec::new();
    };

    let mut latest_by_group: HashMap<String, &BondQuote> = HashMap::new();
    for q in history.iter().filter(|q| q.observation_date == latest) {
        latest_by_group.entry(q.group_key()).or_insert(q);
    }

    let mut out: Vec<MarketComparison> = market
        .iter()
        .filter_map(|m| {
            let current = m.buy_price?;
            let key = m.group_key();
            let past = latest_by_group.get(&key)?;
            Some(MarketComparison {
                family: m.family.clone(),
                name: m.name.clone(),
                percent_change: PercentChange::between(past.unit_price, current),
                current_price: current,
                historical_price: past.unit_price,
                historical_date: past.observation_date,
                group_key: key,
            })
        })
        .collect();

    out.sort_by(|a, b| a.group_key.cmp(&b.group_key));
    out
}

/// Latest date in the history, and the one before it when present.
pub fn history_dates(history: &[BondQuote]) -> Option<(chrono::NaiveDate, Option<chrono::NaiveDate>)> {
    if let Some((latest, previous)) = latest_two_dates(history) {
        return Some((latest, Some(previous)));
    }
    history.first().map(|q| (q.observation_date, None))
}
