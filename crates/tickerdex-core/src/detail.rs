//! Per-symbol price history and indicator snapshot.
//!
//! Korean codes (`005930`, `005930.KS`, `005930.KQ`) are served from the
//! portal's daily chart feed, everything else from the Yahoo chart API.

use std::sync::Arc;

use serde::Serialize;
use time::Date;
use tracing::{debug, info};

use crate::adapters::{NaverChartSource, YahooChartSource};
use crate::error::DetailError;
use crate::http_client::HttpClient;
use crate::indicators::{disparity, rsi, round2, MovingAverages, RSI_PERIOD};
use crate::listing_source::{SourceError, SourceFuture};
use crate::SourceId;

pub const HISTORY_DAYS: usize = 120;

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily price history provider.
pub trait HistorySource: Send + Sync {
    fn id(&self) -> SourceId;

    fn supports(&self, symbol: &str) -> bool;

    /// Returns up to `days` bars, oldest first.
    fn history<'a>(
        &'a self,
        symbol: &'a str,
        days: usize,
    ) -> SourceFuture<'a, Result<Vec<DailyBar>, SourceError>>;
}

/// Splits an optional `.KS` / `.KQ` suffix and checks for a 6-digit code.
pub fn korean_code(symbol: &str) -> Option<&str> {
    let trimmed = symbol.trim();
    let upper_suffix = trimmed
        .get(trimmed.len().saturating_sub(3)..)
        .map(str::to_ascii_uppercase);
    let code = match upper_suffix.as_deref() {
        Some(".KS") | Some(".KQ") => &trimmed[..trimmed.len() - 3],
        _ => trimmed,
    };
    (code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())).then_some(code)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub rsi: f64,
    pub moving_averages: MovingAverages,
    pub disparity: f64,
    pub historical_data: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub close: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
}

impl StockDetail {
    /// Builds the snapshot from bars sorted oldest first.
    pub fn from_history(symbol: &str, bars: &[DailyBar]) -> Result<Self, DetailError> {
        let Some(latest) = bars.last() else {
            return Err(DetailError::NoData {
                symbol: symbol.to_owned(),
            });
        };
        let previous = bars.len().checked_sub(2).and_then(|i| bars.get(i)).unwrap_or(latest);

        let price = latest.close;
        let change = price - previous.close;
        let change_percent = if previous.close > 0.0 {
            change / previous.close * 100.0
        } else {
            0.0
        };

        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let moving_averages = MovingAverages::from_closes(&closes);
        let rsi = rsi(&closes, RSI_PERIOD);

        Ok(Self {
            symbol: symbol.to_owned(),
            price: round2(price),
            change: round2(change),
            change_percent: round2(change_percent),
            volume: latest.volume,
            rsi,
            disparity: disparity(price, moving_averages.ma20),
            moving_averages,
            historical_data: bars
                .iter()
                .map(|bar| HistoryPoint {
                    date: bar.date.to_string(),
                    close: bar.close,
                    volume: bar.volume,
                    high: bar.high,
                    low: bar.low,
                    open: bar.open,
                })
                .collect(),
        })
    }
}

/// Routes a symbol to the first history source that supports it.
pub struct DetailService {
    sources: Vec<Arc<dyn HistorySource>>,
    days: usize,
}

impl DetailService {
    pub fn new(sources: Vec<Arc<dyn HistorySource>>) -> Self {
        Self {
            sources,
            days: HISTORY_DAYS,
        }
    }

    /// Portal chart feed for Korean codes, Yahoo for the rest.
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self::new(vec![
            Arc::new(NaverChartSource::with_http_client(Arc::clone(&http_client))),
            Arc::new(YahooChartSource::with_http_client(http_client)),
        ])
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days.max(1);
        self
    }

    pub async fn detail(&self, symbol: &str) -> Result<StockDetail, DetailError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(DetailError::EmptySymbol);
        }

        let source = self
            .sources
            .iter()
            .find(|source| source.supports(symbol))
            .ok_or_else(|| DetailError::Unsupported {
                symbol: symbol.to_owned(),
            })?;
        debug!(symbol, source = %source.id(), "fetching price history");

        let mut bars = source.history(symbol, self.days).await?;
        bars.sort_by_key(|bar| bar.date);
        info!(symbol, source = %source.id(), bars = bars.len(), "loaded price history");

        StockDetail::from_history(symbol, &bars)
    }
}

#[cfg(test)]
mod tests {
    use time::Month;

    use super::*;

    fn bar(day: u8, close: f64) -> DailyBar {
        DailyBar {
            date: Date::from_calendar_date(2026, Month::October, day).expect("valid date"),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn recognizes_korean_codes_with_suffixes() {
        assert_eq!(korean_code("005930"), Some("005930"));
        assert_eq!(korean_code("005930.KS"), Some("005930"));
        assert_eq!(korean_code("035720.kq"), Some("035720"));
        assert_eq!(korean_code("AAPL"), None);
        assert_eq!(korean_code("5930.KS"), None);
    }

    #[test]
    fn snapshot_from_short_history() {
        let detail = StockDetail::from_history("AAPL", &[bar(1, 200.0), bar(2, 210.0)])
            .expect("snapshot");

        assert_eq!(detail.price, 210.0);
        assert_eq!(detail.change, 10.0);
        assert_eq!(detail.change_percent, 5.0);
        assert_eq!(detail.rsi, 50.0);
        assert_eq!(detail.moving_averages.ma20, 210.0);
        assert_eq!(detail.disparity, 100.0);
        assert_eq!(detail.historical_data[0].date, "2026-10-01");
    }

    #[test]
    fn empty_history_is_an_error() {
        assert!(matches!(
            StockDetail::from_history("AAPL", &[]),
            Err(DetailError::NoData { .. })
        ));
    }

    #[test]
    fn serializes_camel_case_fields() {
        let detail = StockDetail::from_history("005930", &[bar(1, 100.0)]).expect("snapshot");
        let json = serde_json::to_value(&detail).expect("serializes");
        assert!(json.get("changePercent").is_some());
        assert!(json["movingAverages"].get("ma120").is_some());
        assert!(json["historicalData"][0].get("open").is_some());
    }
}
