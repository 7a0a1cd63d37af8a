use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, warn};

use super::{clean_text, code_from_href, selector, send, NAVER_FINANCE_REFERER};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::throttling::HostThrottle;
use crate::{MarketSegment, RawRecord, SourceId};

const MARKET_SUM_URL: &str = "https://finance.naver.com/sise/sise_market_sum.naver";
const TIMEOUT_MS: u64 = 15_000;
const PAGE_CEILING: usize = 50;
const PAGE_INTERVAL: Duration = Duration::from_millis(300);

/// `sosok` query value and market label for each board.
const BOARDS: [(u8, &str); 2] = [(0, "KOSPI"), (1, "KOSDAQ")];

/// Portal market-cap ranking pages for KOSPI and KOSDAQ.
///
/// Reflects what is actually trading, so it picks up fresh listings that the
/// exchange master files have not caught up with yet.
pub struct NaverMarketAdapter {
    http_client: Arc<dyn HttpClient>,
    throttle: HostThrottle,
    page_ceiling: usize,
}

impl Default for NaverMarketAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            throttle: HostThrottle::per_interval(PAGE_INTERVAL),
            page_ceiling: PAGE_CEILING,
        }
    }
}

impl NaverMarketAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            ..Self::default()
        }
    }

    pub fn with_throttle(mut self, throttle: HostThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_page_ceiling(mut self, page_ceiling: usize) -> Self {
        self.page_ceiling = page_ceiling.max(1);
        self
    }

    async fn fetch_board(
        &self,
        sosok: u8,
        market: &str,
        seen: &mut HashSet<String>,
        records: &mut Vec<RawRecord>,
    ) -> Result<(), SourceError> {
        for page in 1..=self.page_ceiling {
            self.throttle.until_ready().await;

            let request = HttpRequest::get(format!("{MARKET_SUM_URL}?sosok={sosok}&page={page}"))
                .with_browser_headers(NAVER_FINANCE_REFERER)
                .with_charset("euc-kr")
                .with_timeout_ms(TIMEOUT_MS);
            let response = send(self.http_client.as_ref(), SourceId::NaverMarket, request)
                .await
                .map_err(|error| error.with_context(format_args!("{market} page {page}")))?;

            let parsed = parse_market_page(&response.body)?;
            let Some(rows) = parsed.rows else {
                debug!(market, page, "no ranking table, stopping");
                break;
            };

            let mut fresh = 0;
            for (code, name) in rows {
                if seen.insert(code.clone()) {
                    records.push(
                        RawRecord::new()
                            .with_field("code", code)
                            .with_field("name", name)
                            .with_field("market", market),
                    );
                    fresh += 1;
                }
            }
            debug!(market, page, fresh, "fetched ranking page");

            if fresh == 0 || !parsed.has_next {
                break;
            }
        }
        Ok(())
    }
}

impl ListingSource for NaverMarketAdapter {
    fn id(&self) -> SourceId {
        SourceId::NaverMarket
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::Korea]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }

            let mut seen = HashSet::new();
            let mut records = Vec::new();
            let mut warnings = Vec::new();
            let mut last_error = None;

            for (sosok, market) in BOARDS {
                let before = records.len();
                match self.fetch_board(sosok, market, &mut seen, &mut records).await {
                    Ok(()) => {}
                    Err(error) => {
                        warn!(market, %error, "board fetch stopped early");
                        warnings.push(error.to_string());
                        last_error = Some(error);
                    }
                }
                info!(market, count = records.len() - before, "collected board listings");
            }

            if records.is_empty() {
                return Err(last_error.unwrap_or_else(|| {
                    SourceError::no_data("naver_market returned no ranking rows")
                }));
            }
            Ok(Listing::new(self.id(), segment, records).with_warnings(warnings))
        })
    }
}

struct MarketPage {
    /// `None` when the page has no ranking table at all.
    rows: Option<Vec<(String, String)>>,
    has_next: bool,
}

fn parse_market_page(body: &str) -> Result<MarketPage, SourceError> {
    let table_selector = selector(SourceId::NaverMarket, "table.type_2")?;
    let link_selector = selector(SourceId::NaverMarket, "a.tltle")?;
    let next_selector = selector(SourceId::NaverMarket, "td.pgRR")?;

    let document = Html::parse_document(body);
    let Some(table) = document.select(&table_selector).next() else {
        return Ok(MarketPage {
            rows: None,
            has_next: false,
        });
    };

    let rows = table
        .select(&link_selector)
        .filter_map(|link| {
            let code = code_from_href(link.value().attr("href")?)?;
            let name = clean_text(link.text());
            (!name.is_empty()).then(|| (code.to_owned(), name))
        })
        .collect();

    Ok(MarketPage {
        rows: Some(rows),
        has_next: document.select(&next_selector).next().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <table class="type_2">
          <tr><th>종목명</th></tr>
          <tr><td><a href="/item/main.naver?code=005930" class="tltle">삼성전자</a></td></tr>
          <tr><td><a href="/item/main.naver?code=000660" class="tltle">SK하이닉스</a></td></tr>
          <tr><td><a href="/item/main.naver?code=12345" class="tltle">broken</a></td></tr>
        </table>
        <table class="Nnavi"><tr><td class="pgRR"><a href="?page=2">맨뒤</a></td></tr></table>
    </body></html>"#;

    #[test]
    fn parses_ranking_rows_and_next_link() {
        let page = parse_market_page(PAGE).expect("parses");
        assert!(page.has_next);
        assert_eq!(
            page.rows.expect("table present"),
            vec![
                ("005930".to_owned(), "삼성전자".to_owned()),
                ("000660".to_owned(), "SK하이닉스".to_owned()),
            ]
        );
    }

    #[test]
    fn missing_table_means_no_rows() {
        let page = parse_market_page("<html><body>점검중</body></html>").expect("parses");
        assert!(page.rows.is_none());
        assert!(!page.has_next);
    }
}
