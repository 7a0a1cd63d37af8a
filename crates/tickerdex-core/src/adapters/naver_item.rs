use std::sync::Arc;

use scraper::Html;
use tracing::debug;

use super::{clean_text, selector, send, NAVER_FINANCE_REFERER};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{SourceError, SourceFuture, TickerLookup};
use crate::{Country, SourceId, SymbolCode, SymbolRecord};

const ITEM_URL: &str = "https://finance.naver.com/item/main.naver";
const TIMEOUT_MS: u64 = 10_000;
const NAME_SELECTORS: [&str; 3] = ["h2.wrap_company", "div.wrap_company h2", "h2.company_name"];

/// Reverse lookup of a Korean item code on the portal's item page.
pub struct NaverItemAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for NaverItemAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl NaverItemAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl TickerLookup for NaverItemAdapter {
    fn id(&self) -> SourceId {
        SourceId::NaverItem
    }

    fn lookup<'a>(
        &'a self,
        code: &'a str,
    ) -> SourceFuture<'a, Result<Option<SymbolRecord>, SourceError>> {
        Box::pin(async move {
            let Ok(code) = SymbolCode::parse(Country::Kr, code) else {
                debug!(code, "not a korean item code, skipping lookup");
                return Ok(None);
            };

            let request = HttpRequest::get(format!("{ITEM_URL}?code={code}"))
                .with_browser_headers(NAVER_FINANCE_REFERER)
                .with_charset("euc-kr")
                .with_timeout_ms(TIMEOUT_MS);
            let response = send(self.http_client.as_ref(), self.id(), request).await?;

            let Some(page) = parse_item_page(&response.body)? else {
                return Ok(None);
            };
            Ok(SymbolRecord::new(Country::Kr, code.as_str(), page.name, page.market, None).ok())
        })
    }
}

struct ItemPage {
    name: String,
    market: &'static str,
}

fn parse_item_page(body: &str) -> Result<Option<ItemPage>, SourceError> {
    let document = Html::parse_document(body);

    let mut name = None;
    for css in NAME_SELECTORS {
        let found = document
            .select(&selector(SourceId::NaverItem, css)?)
            .next()
            .map(|element| clean_text(element.text()))
            .filter(|text| !text.is_empty());
        if found.is_some() {
            name = found;
            break;
        }
    }
    let Some(name) = name else {
        return Ok(None);
    };

    // The market badge is an image, so its alt text counts too.
    let image = selector(SourceId::NaverItem, "img")?;
    let description = document
        .select(&selector(SourceId::NaverItem, "div.description")?)
        .next()
        .map(|element| {
            let mut text: String = element.text().collect();
            for alt in element.select(&image).filter_map(|img| img.value().attr("alt")) {
                text.push(' ');
                text.push_str(alt);
            }
            text
        })
        .unwrap_or_default();

    Ok(Some(ItemPage {
        name,
        market: market_from_description(&description),
    }))
}

fn market_from_description(text: &str) -> &'static str {
    if text.contains("코스닥") || text.contains("KOSDAQ") {
        "KOSDAQ"
    } else if text.contains("코스피") || text.contains("KOSPI") {
        "KOSPI"
    } else {
        "KRX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_name_and_market_from_item_page() {
        let body = r#"<html><body>
            <div class="wrap_company"><h2><a href="/item/main.naver?code=064400">LG씨엔에스</a></h2>
              <div class="description"><img alt="코스피"> 064400</div>
            </div></body></html>"#;
        let page = parse_item_page(body).expect("parses").expect("found");
        assert_eq!(page.name, "LG씨엔에스");
        assert_eq!(page.market, "KOSPI");
    }

    #[test]
    fn classifies_market_badges() {
        assert_eq!(market_from_description("코스닥 종목"), "KOSDAQ");
        assert_eq!(market_from_description("KOSPI 200"), "KOSPI");
        assert_eq!(market_from_description("코넥스"), "KRX");
    }

    #[test]
    fn page_without_name_is_not_found() {
        assert!(parse_item_page("<html><body></body></html>")
            .expect("parses")
            .is_none());
    }
}
