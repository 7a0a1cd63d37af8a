use std::collections::HashSet;
use std::sync::Arc;

use scraper::Html;
use tracing::debug;

use super::{clean_text, code_from_href, selector, send, NaverItemAdapter, NAVER_FINANCE_REFERER};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{NameResolver, SourceError, SourceFuture, TickerLookup};
use crate::{Country, SourceId, SymbolRecord};

const SEARCH_URL: &str = "https://finance.naver.com/search/searchList.naver";
const TIMEOUT_MS: u64 = 10_000;
const ITEM_LINK: &str = r#"a[href*="/item/main.naver?code="]"#;

/// Name to code resolution through the portal search page.
pub struct NaverSearchAdapter {
    http_client: Arc<dyn HttpClient>,
    item: NaverItemAdapter,
}

impl Default for NaverSearchAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl NaverSearchAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            item: NaverItemAdapter::with_http_client(Arc::clone(&http_client)),
            http_client,
        }
    }
}

impl NameResolver for NaverSearchAdapter {
    fn id(&self) -> SourceId {
        SourceId::NaverSearch
    }

    fn resolve<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> SourceFuture<'a, Result<Vec<SymbolRecord>, SourceError>> {
        Box::pin(async move {
            let query = query.trim();
            if query.is_empty() || limit == 0 {
                return Ok(Vec::new());
            }

            if query.len() == 6 && query.bytes().all(|b| b.is_ascii_digit()) {
                if let Some(record) = self.item.lookup(query).await? {
                    return Ok(vec![record]);
                }
                debug!(query, "code lookup found nothing, falling back to search");
            }

            let request = HttpRequest::get(format!(
                "{SEARCH_URL}?query={}",
                urlencoding::encode(query)
            ))
            .with_browser_headers(NAVER_FINANCE_REFERER)
            .with_header("accept-language", "ko-KR,ko;q=0.9,en-US;q=0.8")
            .with_charset("euc-kr")
            .with_timeout_ms(TIMEOUT_MS);
            let response = send(self.http_client.as_ref(), self.id(), request).await?;

            let candidates = parse_search_page(&response.body)?;
            debug!(query, candidates = candidates.len(), "parsed search results");
            Ok(rank_candidates(query, candidates, limit))
        })
    }
}

fn parse_search_page(body: &str) -> Result<Vec<(String, String)>, SourceError> {
    let document = Html::parse_document(body);
    let links = selector(SourceId::NaverSearch, ITEM_LINK)?;

    let mut seen = HashSet::new();
    Ok(document
        .select(&links)
        .filter_map(|link| {
            let code = code_from_href(link.value().attr("href")?)?;
            let name = clean_text(link.text());
            (!name.is_empty() && seen.insert(code.to_owned())).then(|| (code.to_owned(), name))
        })
        .collect())
}

/// Orders `(code, name)` candidates against a query: exact name matches
/// first, then names containing the query. Matching ignores whitespace and
/// the `㈜` / `(주)` corporate markers. Anything else is dropped.
pub fn rank_candidates(
    query: &str,
    candidates: Vec<(String, String)>,
    limit: usize,
) -> Vec<SymbolRecord> {
    let needle = comparable(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut exact = Vec::new();
    let mut partial = Vec::new();
    for (code, name) in candidates {
        let hay = comparable(&name);
        let bucket = if hay == needle {
            &mut exact
        } else if hay.contains(&needle) {
            &mut partial
        } else {
            continue;
        };
        if let Ok(record) = SymbolRecord::new(Country::Kr, &code, &name, "KRX", None) {
            bucket.push(record);
        }
    }

    exact.into_iter().chain(partial).take(limit).collect()
}

fn comparable(text: &str) -> String {
    text.replace('㈜', "")
        .replace("(주)", "")
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str, name: &str) -> (String, String) {
        (code.to_owned(), name.to_owned())
    }

    #[test]
    fn exact_match_comes_first() {
        let ranked = rank_candidates(
            "삼성전자",
            vec![
                candidate("005935", "삼성전자우"),
                candidate("009150", "삼성전기"),
                candidate("005930", "삼성 전자"),
            ],
            5,
        );

        let codes: Vec<_> = ranked.iter().map(|record| record.code.as_str()).collect();
        assert_eq!(codes, vec!["005930", "005935"]);
    }

    #[test]
    fn ignores_corporate_markers_and_caps_results() {
        let candidates = (0..8)
            .map(|n| candidate(&format!("00000{n}"), &format!("㈜테스트{n}")))
            .collect();
        let ranked = rank_candidates("테스트", candidates, 5);
        assert_eq!(ranked.len(), 5);

        let exact = rank_candidates("카카오", vec![candidate("035720", "(주)카카오")], 5);
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn parses_unique_item_links() {
        let body = r#"<table class="tbl_search">
            <tr><td class="tit"><a href="/item/main.naver?code=005930">삼성전자</a></td></tr>
            <tr><td class="tit"><a href="/item/main.naver?code=005930">삼성전자</a></td></tr>
            <tr><td class="tit"><a href="/item/main.naver?code=005935">삼성전자우</a></td></tr>
        </table>"#;
        let parsed = parse_search_page(body).expect("parses");
        assert_eq!(parsed.len(), 2);
    }
}
