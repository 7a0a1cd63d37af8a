use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::{send_expecting_data, NAVER_FINANCE_REFERER};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::{MarketSegment, RawRecord, SourceId};

const ETF_LIST_URL: &str =
    "https://finance.naver.com/api/sise/etfItemList.nhn?etfType=0&targetColumn=market_sum&sortOrder=desc";
const TIMEOUT_MS: u64 = 15_000;

/// Portal ETF list, collected separately so ETFs missing from stock masters
/// still make it into the collection.
pub struct NaverEtfAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for NaverEtfAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl NaverEtfAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl ListingSource for NaverEtfAdapter {
    fn id(&self) -> SourceId {
        SourceId::NaverEtf
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::KoreaEtf]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }

            let request = HttpRequest::get(ETF_LIST_URL)
                .with_browser_headers(NAVER_FINANCE_REFERER)
                .with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;

            let payload: EtfListResponse = serde_json::from_str(&response.body)
                .map_err(|error| SourceError::malformed(format!("naver_etf payload: {error}")))?;
            let records: Vec<RawRecord> = payload
                .result
                .etf_item_list
                .into_iter()
                .map(|item| {
                    RawRecord::new()
                        .with_field("itemcode", item.itemcode)
                        .with_field("itemname", item.itemname)
                })
                .collect();

            if records.is_empty() {
                return Err(SourceError::no_data("naver_etf returned an empty list"));
            }
            info!(count = records.len(), "parsed etf list");
            Ok(Listing::new(self.id(), segment, records))
        })
    }
}

#[derive(Debug, Deserialize)]
struct EtfListResponse {
    result: EtfListResult,
}

#[derive(Debug, Deserialize)]
struct EtfListResult {
    #[serde(rename = "etfItemList", default)]
    etf_item_list: Vec<EtfItem>,
}

#[derive(Debug, Deserialize)]
struct EtfItem {
    #[serde(default)]
    itemcode: String,
    #[serde(default)]
    itemname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_etf_items() {
        let body = r#"{"resultCode":"success","result":{"etfItemList":[
            {"itemcode":"069500","etfTabCode":1,"itemname":"KODEX 200","nowVal":41250}
        ]}}"#;
        let payload: EtfListResponse = serde_json::from_str(body).expect("valid payload");
        assert_eq!(payload.result.etf_item_list[0].itemname, "KODEX 200");
    }
}
