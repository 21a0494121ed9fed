//! Tesouro Direto / Tesouro Transparente HTTP integration.
//!
//! Two public endpoints:
//! - the historical price CSV (semicolon-delimited, decimal comma)
//! - the market JSON API (current rates/prices + session status)
//!
//! Fetches are blocking with no retries. A failed fetch aborts the command.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{IndexFamily, MarketQuote, MarketSnapshot, MarketStatus};
use crate::error::AppError;

pub const DEFAULT_PRICES_CSV_URL: &str = "https://www.tesourotransparente.gov.br/ckan/dataset/df56aa42-484a-4a59-8184-7676580c81e3/resource/796d2059-14e9-44e3-80c9-2d9e30b405c1/download/PrecoTaxaTesouroDireto.csv";
pub const DEFAULT_MARKET_API_URL: &str =
    "https://www.tesourodireto.com.br/json/br/com/b3/tesourodireto/service/api/treasurybondsinfo.json";

const ENV_PRICES_CSV_URL: &str = "TD_PRICES_CSV_URL";
const ENV_MARKET_API_URL: &str = "TD_MARKET_API_URL";

pub struct TesouroClient {
    client: Client,
    prices_csv_url: String,
    market_api_url: String,
}

impl TesouroClient {
    /// Build a client, letting `.env` / environment override the endpoints.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let prices_csv_url =
            std::env::var(ENV_PRICES_CSV_URL).unwrap_or_else(|_| DEFAULT_PRICES_CSV_URL.to_string());
        let market_api_url =
            std::env::var(ENV_MARKET_API_URL).unwrap_or_else(|_| DEFAULT_MARKET_API_URL.to_string());
        Self::new(prices_csv_url, market_api_url)
    }

    pub fn new(prices_csv_url: impl Into<String>, market_api_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("td-variation/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            prices_csv_url: prices_csv_url.into(),
            market_api_url: market_api_url.into(),
        })
    }

    pub fn prices_csv_url(&self) -> &str {
        &self.prices_csv_url
    }

    pub fn market_api_url(&self) -> &str {
        &self.market_api_url
    }

    /// GET `url` and return the raw body. Non-2xx is an error.
    pub fn fetch_body(&self, url: &str) -> Result<Vec<u8>, AppError> {
        tracing::info!(url, "fetching");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::transport(format!("Request to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::transport(format!(
                "Request to {url} failed with status {}.",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::transport(format!("Failed to read response body from {url}: {e}")))?;
        tracing::debug!(url, bytes = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: ApiResponse,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "TrsrBondMkt")]
    market: ApiMarket,
    #[serde(rename = "TrsrBdTradgList")]
    trades: Vec<ApiTrade>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    #[serde(rename = "opngDtTm")]
    opening: String,
    #[serde(rename = "clsgDtTm")]
    closing: String,
    #[serde(rename = "sts")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrade {
    #[serde(rename = "TrsrBd")]
    bond: ApiBond,
}

#[derive(Debug, Deserialize)]
struct ApiBond {
    #[serde(rename = "nm")]
    name: String,
    #[serde(rename = "mtrtyDt")]
    maturity: String,
    #[serde(rename = "anulInvstmtRate")]
    buy_rate: f64,
    #[serde(rename = "anulRedRate")]
    sell_rate: f64,
    #[serde(rename = "untrInvstmtVal")]
    buy_price: f64,
    #[serde(rename = "untrRedVal")]
    sell_price: f64,
    #[serde(rename = "FinIndxs")]
    index: ApiIndex,
}

#[derive(Debug, Deserialize)]
struct ApiIndex {
    #[serde(rename = "nm")]
    name: String,
}

/// Flatten the nested market API response into typed rows.
///
/// Any missing key fails the whole parse.
pub fn parse_market_json(text: &str) -> Result<MarketSnapshot, AppError> {
    let envelope: ApiEnvelope = serde_json::from_str(text)
        .map_err(|e| AppError::input(format!("Unexpected market API response: {e}")))?;
    let response = envelope.response;

    let status = MarketStatus {
        status: response.market.status.trim().to_string(),
        opening: parse_api_datetime(&response.market.opening)?,
        closing: parse_api_datetime(&response.market.closing)?,
    };

    let mut quotes = Vec::with_capacity(response.trades.len());
    for trade in response.trades {
        let bond = trade.bond;
        quotes.push(MarketQuote {
            family: IndexFamily::from_api(&bond.index.name),
            maturity_date: parse_api_date(&bond.maturity)?,
            buy_rate: decimal_from_api(bond.buy_rate, "anulInvstmtRate")?,
            sell_rate: decimal_from_api(bond.sell_rate, "anulRedRate")?,
            buy_price: nonzero(decimal_from_api(bond.buy_price, "untrInvstmtVal")?),
            sell_price: nonzero(decimal_from_api(bond.sell_price, "untrRedVal")?),
            name: bond.name.trim().to_string(),
        });
    }

    Ok(MarketSnapshot { status, quotes })
}

/// `YYYY-MM-DDTHH:MM:SS`, ignoring any fractional seconds or offset suffix.
fn parse_api_datetime(raw: &str) -> Result<NaiveDateTime, AppError> {
    let head = raw.trim().get(..19).unwrap_or(raw);
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| AppError::input(format!("Invalid market API timestamp '{raw}': {e}")))
}

fn parse_api_date(raw: &str) -> Result<NaiveDate, AppError> {
    let head = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .map_err(|e| AppError::input(format!("Invalid market API date '{raw}': {e}")))
}

fn decimal_from_api(value: f64, field: &str) -> Result<Decimal, AppError> {
    if !value.is_finite() {
        return Err(AppError::input(format!("Non-finite `{field}` in market API response.")));
    }
    // `Display` for f64 prints the shortest round-tripping form, so 0.1 stays 0.1.
    Decimal::from_str(&value.to_string())
        .map_err(|e| AppError::input(format!("Invalid `{field}` value {value}: {e}")))
}

fn nonzero(value: Decimal) -> Option<Decimal> {
    if value.is_zero() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "responseStatus": 200,
      "response": {
        "TrsrBondMkt": {
          "opngDtTm": "2024-01-02T09:30:00",
          "clsgDtTm": "2024-01-02T18:00:00.000",
          "sts": "Aberto"
        },
        "TrsrBdTradgList": [
          {"TrsrBd": {"nm": "Tesouro Selic 2029", "mtrtyDt": "2029-03-01T00:00:00",
            "anulInvstmtRate": 0.05, "anulRedRate": 0.06,
            "untrInvstmtVal": 14123.45, "untrRedVal": 14100.1,
            "FinIndxs": {"nm": "SELIC"}}},
          {"TrsrBd": {"nm": "Tesouro IPCA+ 2035", "mtrtyDt": "2035-05-15T00:00:00",
            "anulInvstmtRate": 0.0, "anulRedRate": 5.91,
            "untrInvstmtVal": 0, "untrRedVal": 2210.77,
            "FinIndxs": {"nm": "IPCA"}}}
        ]
      }
    }"#;

    #[test]
    fn flattens_market_response() {
        let snap = parse_market_json(SAMPLE).unwrap();
        assert!(snap.status.is_open());
        assert_eq!(snap.status.closing.format("%H:%M").to_string(), "18:00");
        assert_eq!(snap.quotes.len(), 2);

        let selic = &snap.quotes[0];
        assert_eq!(selic.family, IndexFamily::Selic);
        assert_eq!(selic.maturity_date, NaiveDate::from_ymd_opt(2029, 3, 1).unwrap());
        assert_eq!(selic.buy_price, Some(Decimal::from_str("14123.45").unwrap()));
        assert_eq!(selic.buy_rate, Decimal::from_str("0.05").unwrap());

        let ipca = &snap.quotes[1];
        assert_eq!(ipca.buy_price, None);
        assert_eq!(ipca.sell_price, Some(Decimal::from_str("2210.77").unwrap()));
    }

    #[test]
    fn missing_key_is_schema_error() {
        let text = r#"{"response": {"TrsrBondMkt": {"opngDtTm": "2024-01-02T09:30:00", "clsgDtTm": "2024-01-02T18:00:00", "sts": "Fechado"},
            "TrsrBdTradgList": [{"TrsrBd": {"nm": "Tesouro Selic 2029"}}]}}"#;
        let err = parse_market_json(text).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let text = SAMPLE.replace("2024-01-02T09:30:00", "02/01/2024 09:30");
        assert!(parse_market_json(&text).is_err());
    }
}
