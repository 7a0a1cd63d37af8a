use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;

use super::send_expecting_data;
use crate::detail::{korean_code, DailyBar, HistorySource};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{SourceError, SourceFuture};
use crate::SourceId;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const TIMEOUT_MS: u64 = 10_000;

/// Yahoo chart API for everything that is not a Korean item code.
pub struct YahooChartSource {
    http_client: Arc<dyn HttpClient>,
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl YahooChartSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl HistorySource for YahooChartSource {
    fn id(&self) -> SourceId {
        SourceId::YahooChart
    }

    fn supports(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        !symbol.is_empty() && korean_code(symbol).is_none()
    }

    fn history<'a>(
        &'a self,
        symbol: &'a str,
        days: usize,
    ) -> SourceFuture<'a, Result<Vec<DailyBar>, SourceError>> {
        Box::pin(async move {
            let endpoint = format!(
                "{CHART_URL}/{}?range={}&interval=1d",
                urlencoding::encode(symbol.trim()),
                range_for_days(days)
            );
            let request = HttpRequest::get(endpoint)
                .with_header("referer", "https://finance.yahoo.com/")
                .with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;

            let mut bars = parse_chart(&response.body)?;
            if bars.len() > days {
                bars.drain(..bars.len() - days);
            }
            Ok(bars)
        })
    }
}

/// Smallest Yahoo range covering `days` trading days.
fn range_for_days(days: usize) -> &'static str {
    match days {
        0..=20 => "1mo",
        21..=60 => "3mo",
        61..=125 => "6mo",
        126..=250 => "1y",
        _ => "2y",
    }
}

fn parse_chart(body: &str) -> Result<Vec<DailyBar>, SourceError> {
    let chart_response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart_response.chart.error {
        let description = error.description.unwrap_or_default();
        return Err(SourceError::no_data(format!("yahoo chart error: {description}")));
    }

    let Some(result) = chart_response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(SourceError::no_data("no chart data in response"));
    };
    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Err(SourceError::no_data("no quote data in chart"));
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(Some(close)) = quote.close.get(i).copied() else {
            continue;
        };
        let Ok(moment) = OffsetDateTime::from_unix_timestamp(ts) else {
            continue;
        };
        let value = |series: &[Option<f64>]| series.get(i).copied().flatten().unwrap_or(close);

        bars.push(DailyBar {
            date: moment.date(),
            open: value(&quote.open),
            high: value(&quote.high),
            low: value(&quote.low),
            close,
            volume: quote
                .volume
                .get(i)
                .copied()
                .flatten()
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(0),
        });
    }
    Ok(bars)
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
