use std::sync::Arc;

use tracing::{info, warn};

use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::{MarketSegment, RawRecord, SourceId};

const MIRROR_BASE: &str = "https://raw.githubusercontent.com/rreichel3/US-Stock-Symbols/main";
const TIMEOUT_MS: u64 = 15_000;

/// Exchange label and mirror directory.
const EXCHANGES: [(&str, &str); 3] = [("NASDAQ", "nasdaq"), ("NYSE", "nyse"), ("AMEX", "amex")];

/// Free plain-text ticker lists, one ticker per line.
///
/// The lists carry no company names, so each ticker doubles as its name and
/// any named source merged earlier or later wins the longer-name rule.
pub struct UsTickerMirrorAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for UsTickerMirrorAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl UsTickerMirrorAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl ListingSource for UsTickerMirrorAdapter {
    fn id(&self) -> SourceId {
        SourceId::UsTickerMirror
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::Us]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }

            let mut records = Vec::new();
            let mut warnings = Vec::new();
            let mut last_error = None;

            for (exchange, dir) in EXCHANGES {
                let url = format!("{MIRROR_BASE}/{dir}/{dir}_tickers.txt");
                let request = HttpRequest::get(url).with_timeout_ms(TIMEOUT_MS);
                match send_expecting_data(self.http_client.as_ref(), self.id(), request).await {
                    Ok(response) => {
                        let before = records.len();
                        records.extend(parse_tickers(&response.body, exchange));
                        info!(exchange, count = records.len() - before, "parsed ticker list");
                    }
                    Err(error) => {
                        let error = error.with_context(exchange);
                        warn!(%error, "ticker list unavailable");
                        warnings.push(error.to_string());
                        last_error = Some(error);
                    }
                }
            }

            if records.is_empty() {
                return Err(last_error
                    .unwrap_or_else(|| SourceError::no_data("ticker mirror lists were empty")));
            }
            Ok(Listing::new(self.id(), segment, records).with_warnings(warnings))
        })
    }
}

fn parse_tickers(body: &str, exchange: &str) -> Vec<RawRecord> {
    body.lines()
        .map(str::trim)
        .filter(|ticker| !ticker.is_empty())
        .map(|ticker| {
            RawRecord::new()
                .with_field("symbol", ticker)
                .with_field("name", ticker)
                .with_field("market", exchange)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_record_per_non_blank_line() {
        let records = parse_tickers("AAPL\r\nMSFT\n\n  BRK.B \n", "NASDAQ");
        assert_eq!(records.len(), 3);
        assert!(records[2]
            .fields()
            .any(|(field, value)| field == "symbol" && value == "BRK.B"));
    }
}
