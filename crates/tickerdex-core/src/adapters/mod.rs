mod finnhub;
mod fmp;
mod krx_csv;
mod krx_etf;
mod krx_listing;
mod naver_chart;
mod naver_etf;
mod naver_item;
mod naver_market;
mod naver_search;
mod us_ticker_mirror;
mod yahoo_chart;

pub use finnhub::{FinnhubAdapter, FINNHUB_KEY_VARS};
pub use fmp::{FmpAdapter, FMP_KEY_VARS};
pub use krx_csv::KrxCsvAdapter;
pub use krx_etf::KrxEtfAdapter;
pub use krx_listing::KrxListingAdapter;
pub use naver_chart::NaverChartSource;
pub use naver_etf::NaverEtfAdapter;
pub use naver_item::NaverItemAdapter;
pub use naver_market::NaverMarketAdapter;
pub use naver_search::{rank_candidates, NaverSearchAdapter};
pub use us_ticker_mirror::UsTickerMirrorAdapter;
pub use yahoo_chart::YahooChartSource;

use scraper::Selector;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::listing_source::SourceError;
use crate::SourceId;

pub(crate) const NAVER_FINANCE_REFERER: &str = "https://finance.naver.com/";

/// Sends one request and maps transport failures and non-2xx statuses onto
/// the source error taxonomy.
pub(crate) async fn send(
    http_client: &dyn HttpClient,
    source: SourceId,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    let response = http_client
        .execute(request)
        .await
        .map_err(|error| SourceError::from_http(source, &error))?;

    if !response.is_success() {
        return Err(SourceError::from_status(source, response.status));
    }
    Ok(response)
}

/// Like [`send`], for endpoints that must not answer with an HTML page.
pub(crate) async fn send_expecting_data(
    http_client: &dyn HttpClient,
    source: SourceId,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    let response = send(http_client, source, request).await?;
    if response.looks_like_html() {
        return Err(SourceError::malformed(format!(
            "{source} returned an HTML page instead of data"
        )));
    }
    Ok(response)
}

pub(crate) fn selector(source: SourceId, css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|error| SourceError::malformed(format!("{source} selector '{css}': {error}")))
}

/// Extracts a 6-digit item code from portal links like
/// `/item/main.naver?code=005930&foo=bar`.
pub(crate) fn code_from_href(href: &str) -> Option<&str> {
    let (_, tail) = href.rsplit_once("code=")?;
    let code = tail
        .split(|ch| ch == '&' || ch == '#')
        .next()
        .unwrap_or_default()
        .trim();
    (code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())).then_some(code)
}

/// Collapses the whitespace that scraped text nodes carry.
pub(crate) fn clean_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
