use std::sync::Arc;

use time::{Date, Month};

use super::{send, NAVER_FINANCE_REFERER};
use crate::detail::{korean_code, DailyBar, HistorySource};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{SourceError, SourceFuture};
use crate::SourceId;

const CHART_URL: &str = "https://fchart.stock.naver.com/sise.nhn";
const TIMEOUT_MS: u64 = 10_000;

/// Portal daily chart feed for Korean codes.
///
/// The feed is XML with one `<item data="YYYYMMDD|open|high|low|close|volume"/>`
/// element per trading day.
pub struct NaverChartSource {
    http_client: Arc<dyn HttpClient>,
}

impl Default for NaverChartSource {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl NaverChartSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl HistorySource for NaverChartSource {
    fn id(&self) -> SourceId {
        SourceId::NaverChart
    }

    fn supports(&self, symbol: &str) -> bool {
        korean_code(symbol).is_some()
    }

    fn history<'a>(
        &'a self,
        symbol: &'a str,
        days: usize,
    ) -> SourceFuture<'a, Result<Vec<DailyBar>, SourceError>> {
        Box::pin(async move {
            let code = korean_code(symbol).ok_or_else(|| {
                SourceError::no_data(format!("'{symbol}' is not a korean item code"))
            })?;

            let request = HttpRequest::get(format!(
                "{CHART_URL}?symbol={code}&timeframe=day&count={days}&requestType=0"
            ))
            .with_browser_headers(NAVER_FINANCE_REFERER)
            .with_charset("euc-kr")
            .with_timeout_ms(TIMEOUT_MS);
            let response = send(self.http_client.as_ref(), self.id(), request).await?;

            let bars = parse_chart(&response.body);
            if bars.is_empty() {
                return Err(SourceError::no_data(format!("no chart data for {code}")));
            }
            Ok(bars)
        })
    }
}

fn parse_chart(body: &str) -> Vec<DailyBar> {
    body.split("<item")
        .skip(1)
        .filter_map(|chunk| {
            let (_, rest) = chunk.split_once("data=\"")?;
            let (data, _) = rest.split_once('"')?;
            parse_item(data)
        })
        .collect()
}

fn parse_item(data: &str) -> Option<DailyBar> {
    let mut parts = data.split('|').map(str::trim);
    let date = parse_compact_date(parts.next()?)?;
    let open = parts.next()?.parse().ok()?;
    let high = parts.next()?.parse().ok()?;
    let low = parts.next()?.parse().ok()?;
    let close = parts.next()?.parse().ok()?;
    let volume = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);

    Some(DailyBar {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// `YYYYMMDD`
fn parse_compact_date(value: &str) -> Option<Date> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[..4].parse().ok()?;
    let month = Month::try_from(value[4..6].parse::<u8>().ok()?).ok()?;
    let day = value[6..].parse().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
