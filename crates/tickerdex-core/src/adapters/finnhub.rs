use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{
    HealthStatus, Listing, ListingSource, SourceError, SourceFuture, SourceResult,
};
use crate::{MarketSegment, RawRecord, SourceId};

const SYMBOL_URL: &str = "https://finnhub.io/api/v1/stock/symbol?exchange=US";
const TIMEOUT_MS: u64 = 30_000;

/// Environment variables checked for the API key, in order.
pub const FINNHUB_KEY_VARS: [&str; 3] = [
    "TICKERDEX_FINNHUB_API_KEY",
    "FINNHUB_API_KEY",
    "NEXT_PUBLIC_FINNHUB_API_KEY",
];

/// Paid US symbol list. Without a key the adapter reports itself unavailable
/// and is skipped.
pub struct FinnhubAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
}

impl Default for FinnhubAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            api_key: None,
        }
    }
}

impl FinnhubAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

impl ListingSource for FinnhubAdapter {
    fn id(&self) -> SourceId {
        SourceId::Finnhub
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
                return Err(SourceError::auth("finnhub api key is not configured"));
            };

            let url = format!("{SYMBOL_URL}&token={}", urlencoding::encode(api_key));
            let request = HttpRequest::get(url).with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;

            let symbols: Vec<FinnhubSymbol> = serde_json::from_str(&response.body)
                .map_err(|error| SourceError::malformed(format!("finnhub payload: {error}")))?;
            if symbols.is_empty() {
                return Err(SourceError::no_data("finnhub returned an empty symbol list"));
            }

            let records: Vec<RawRecord> = symbols
                .into_iter()
                .map(|symbol| {
                    RawRecord::new()
                        .with_field("symbol", symbol.symbol)
                        .with_field("description", symbol.description)
                        .with_field("type", symbol.kind)
                })
                .collect();
            info!(count = records.len(), "parsed finnhub symbols");
            Ok(Listing::new(self.id(), segment, records))
        })
    }

    fn health<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move {
            if self.api_key.is_some() {
                HealthStatus::ready()
            } else {
                HealthStatus::unavailable(format!(
                    "no api key in {}",
                    FINNHUB_KEY_VARS.join(" / ")
                ))
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubSymbol {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: String,
}
