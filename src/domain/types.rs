//! Shared domain types.
//!
//! These types are plain values: parsed once at the I/O edge, never mutated
//! afterwards, and serializable so computed reports can be exported and
//! reloaded later.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Coarse bond category derived from the instrument name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum InstrumentType {
    Prefixado,
    Selic,
    /// Inflation-linked (IPCA+ and IGPM+ families).
    #[serde(rename = "Inflação")]
    #[value(name = "inflacao")]
    Inflacao,
    Educa,
    Renda,
    Outro,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 6] = [
        InstrumentType::Prefixado,
        InstrumentType::Selic,
        InstrumentType::Inflacao,
        InstrumentType::Educa,
        InstrumentType::Renda,
        InstrumentType::Outro,
    ];

    /// Label as it appears in the reference table's `Tipo` column.
    pub fn label(self) -> &'static str {
        match self {
            InstrumentType::Prefixado => "Prefixado",
            InstrumentType::Selic => "Selic",
            InstrumentType::Inflacao => "Inflação",
            InstrumentType::Educa => "Educa",
            InstrumentType::Renda => "Renda",
            InstrumentType::Outro => "Outro",
        }
    }

    /// Parse a label, ignoring case and the Portuguese accents in "Inflação".
    pub fn from_label(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'ç' => 'c',
                'ã' | 'á' | 'â' => 'a',
                other => other,
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|t| format!("{t:?}").to_lowercase() == folded)
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One observation of one instrument on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondQuote {
    pub instrument_name: String,
    pub observation_date: NaiveDate,
    pub maturity_date: NaiveDate,
    /// Base unit price (`PU Base Manha`), never negative.
    pub unit_price: Decimal,
    /// Annual rates in percent.
    pub buy_rate: Option<Decimal>,
    pub sell_rate: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub instrument_type: InstrumentType,
}

impl BondQuote {
    pub fn maturity_year(&self) -> i32 {
        self.maturity_date.year()
    }

    /// Stable instrument identity: the same raw name recurs across maturities.
    pub fn group_key(&self) -> String {
        group_key(&self.instrument_name, self.maturity_year())
    }
}

pub fn group_key(name: &str, maturity_year: i32) -> String {
    format!("{} {maturity_year}", name.trim())
}

/// Static lookup row: full title (name + maturity year) to display abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    pub title: String,
    pub abbreviation: String,
    pub category: InstrumentType,
}

/// How an abbreviation was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbbreviationSource {
    Exact,
    Partial,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub text: String,
    pub source: AbbreviationSource,
}

/// Percentage change between two prices.
///
/// `Undefined` is returned when the previous price is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentChange {
    Defined(Decimal),
    Undefined,
}

impl PercentChange {
    /// `(latest - previous) / previous * 100`. Out-of-range ratios are `Undefined`.
    pub fn between(previous: Decimal, latest: Decimal) -> Self {
        if previous.is_zero() {
            return PercentChange::Undefined;
        }
        (latest - previous)
            .checked_div(previous)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(PercentChange::Undefined, PercentChange::Defined)
    }

    pub fn value(self) -> Option<Decimal> {
        match self {
            PercentChange::Defined(v) => Some(v),
            PercentChange::Undefined => None,
        }
    }

    /// Two decimal places, for display.
    pub fn rounded(self) -> Option<Decimal> {
        self.value().map(|v| v.round_dp(2))
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, PercentChange::Undefined)
    }
}

/// Per-group day-over-day price change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRecord {
    pub group_key: String,
    pub instrument_name: String,
    pub maturity_year: i32,
    pub instrument_type: InstrumentType,
    pub abbreviation: String,
    pub price_previous: Decimal,
    pub price_latest: Decimal,
    pub percent_change: PercentChange,
}

/// A computed variation table plus the two dates it compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationReport {
    pub latest_date: NaiveDate,
    pub previous_date: NaiveDate,
    pub instrument_type: Option<InstrumentType>,
    pub records: Vec<VariationRecord>,
}

impl VariationReport {
    pub fn undefined_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.percent_change.is_undefined())
            .count()
    }
}

/// Result of a variation computation. Only `Computed` carries records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariationOutcome {
    Computed(VariationReport),
    /// Fewer than two distinct observation dates in the (filtered) snapshot.
    InsufficientDates { distinct_dates: usize },
    /// Two dates exist but no group is observed on both.
    NoCommonGroups { latest: NaiveDate, previous: NaiveDate },
}

/// Instrument family as reported by the market API (`FinIndxs.nm`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexFamily {
    Selic,
    Prefixado,
    Ipca,
    Other(String),
}

impl IndexFamily {
    pub fn from_api(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "SELIC" => IndexFamily::Selic,
            "PREFIXADO" => IndexFamily::Prefixado,
            "IPCA" => IndexFamily::Ipca,
            _ => IndexFamily::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            IndexFamily::Selic => "SELIC",
            IndexFamily::Prefixado => "PREFIXADO",
            IndexFamily::Ipca => "IPCA",
            IndexFamily::Other(name) => name,
        }
    }
}

/// Families selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    Selic,
    Prefixado,
    Ipca,
}

impl From<FamilyArg> for IndexFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Selic => IndexFamily::Selic,
            FamilyArg::Prefixado => IndexFamily::Prefixado,
            FamilyArg::Ipca => IndexFamily::Ipca,
        }
    }
}

/// Which side of the market to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Side {
    /// Only instruments currently offered for purchase.
    Buy,
    Sell,
    #[default]
    Both,
}

/// One row of the market API, flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuote {
    pub family: IndexFamily,
    pub name: String,
    pub maturity_date: NaiveDate,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    /// `None` when the API reports a zero price (not offered for purchase).
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
}

impl MarketQuote {
    /// Name with a trailing maturity-year token removed.
    ///
    /// The API names carry the year ("Tesouro Selic 2029") while the
    /// historical CSV does not ("Tesouro Selic").
    pub fn base_name(&self) -> &str {
        let year = self.maturity_date.year().to_string();
        let trimmed = self.name.trim();
        match trimmed.rsplit_once(' ') {
            Some((head, tail)) if tail == year => head.trim_end(),
            _ => trimmed,
        }
    }

    pub fn group_key(&self) -> String {
        group_key(self.base_name(), self.maturity_date.year())
    }
}

/// Trading-session status reported by the market API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketStatus {
    pub status: String,
    pub opening: NaiveDateTime,
    pub closing: NaiveDateTime,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("aberto")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub status: MarketStatus,
    pub quotes: Vec<MarketQuote>,
}

/// Position of a current rate against a user-supplied reference rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSignal {
    Above,
    Below,
    Equal,
}

/// Current market price vs the latest historical base price of the same group.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketComparison {
    pub family: IndexFamily,
    pub name: String,
    pub group_key: String,
    pub current_price: Decimal,
    pub historical_price: Decimal,
    pub historical_date: NaiveDate,
    pub percent_change: PercentChange,
}
