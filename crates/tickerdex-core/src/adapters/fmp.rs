use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{
    HealthStatus, Listing, ListingSource, SourceError, SourceFuture, SourceResult,
};
use crate::{MarketSegment, RawRecord, SourceId};

const STOCK_LIST_URL: &str = "https://financialmodelingprep.com/stable/stock-list";
const TIMEOUT_MS: u64 = 60_000;

pub const FMP_KEY_VARS: [&str; 2] = ["TICKERDEX_FMP_API_KEY", "FMP_API_KEY"];

const US_EXCHANGES: [&str; 7] = ["NYSE", "NASDAQ", "AMEX", "NYSE ARCA", "NYSE MKT", "BATS", "OTC"];

/// Paid global symbol list, filtered down to US venues.
pub struct FmpAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
}

impl Default for FmpAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            api_key: None,
        }
    }
}

impl FmpAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

impl ListingSource for FmpAdapter {
    fn id(&self) -> SourceId {
        SourceId::Fmp
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::Us]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }
            let Some(api_key) = self.api_key.as_deref() else {
                return Err(SourceError::auth("fmp api key is not configured"));
            };

            let url = format!("{STOCK_LIST_URL}?apikey={}", urlencoding::encode(api_key));
            let request = HttpRequest::get(url).with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;

            let items: Vec<FmpStock> = serde_json::from_str(&response.body)
                .map_err(|error| SourceError::malformed(format!("fmp payload: {error}")))?;
            let total = items.len();
            let records: Vec<RawRecord> = items.into_iter().filter_map(FmpStock::into_raw).collect();

            if records.is_empty() {
                return Err(SourceError::no_data(format!(
                    "fmp returned no US-listed symbols out of {total}"
                )));
            }
            info!(total, kept = records.len(), "parsed fmp stock list");
            Ok(Listing::new(self.id(), segment, records))
        })
    }

    fn health<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move {
            if self.api_key.is_some() {
                HealthStatus::ready()
            } else {
                HealthStatus::unavailable(format!("no api key in {}", FMP_KEY_VARS.join(" / ")))
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpStock {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    exchange_short_name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl FmpStock {
    /// Keeps only records listed on a US venue; the venue becomes the market.
    fn into_raw(self) -> Option<RawRecord> {
        let exchange = self
            .exchange_short_name
            .or(self.exchange)
            .map(|value| value.trim().to_owned())
            .filter(|value| is_us_exchange(value))?;
        let name = self.name.or(self.company_name).unwrap_or_default();

        let mut record = RawRecord::new()
            .with_field("symbol", self.symbol)
            .with_field("name", name)
            .with_field("market", exchange);
        if let Some(kind) = self.kind {
            record.push("type", kind);
        }
        Some(record)
    }
}

fn is_us_exchange(exchange: &str) -> bool {
    let upper = exchange.to_ascii_uppercase();
    US_EXCHANGES.iter().any(|venue| upper.contains(venue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_us_venues() {
        let body = r#"[
            {"symbol":"AAPL","name":"Apple Inc.","exchange":"NASDAQ","type":"stock"},
            {"symbol":"SPY","companyName":"SPDR S&P 500 ETF","exchangeShortName":"NYSE ARCA"},
            {"symbol":"7203.T","name":"Toyota","exchange":"JPX"},
            {"symbol":"NONAME","companyName":"No Exchange"}
        ]"#;
        let items: Vec<FmpStock> = serde_json::from_str(body).expect("valid payload");
        let kept: Vec<RawRecord> = items.into_iter().filter_map(FmpStock::into_raw).collect();

        assert_eq!(kept.len(), 2);
        assert!(kept[1]
            .fields()
            .any(|(field, value)| field == "market" && value == "NYSE ARCA"));
    }
}
