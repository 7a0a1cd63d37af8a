use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::{MarketSegment, RawRecord, SourceId};

pub(super) const KRX_ENDPOINT: &str = "http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd";
const REFERER: &str =
    "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader/index.cmd?menuId=MDC0201020101";
/// All-market listing screen: KOSPI, KOSDAQ and KONEX in one payload.
const FORM: &str =
    "bld=dbms/MDC/STAT/standard/MDCSTAT01901&locale=ko_KR&mktId=ALL&share=1&csvxls_isNo=false";
const TIMEOUT_MS: u64 = 30_000;

/// Exchange-backed JSON listing endpoint.
pub struct KrxListingAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for KrxListingAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl KrxListingAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl ListingSource for KrxListingAdapter {
    fn id(&self) -> SourceId {
        SourceId::KrxListing
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::Korea]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }

            let request = HttpRequest::post_form(KRX_ENDPOINT, FORM)
                .with_browser_headers(REFERER)
                .with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;
            let records = parse_block(&response.body, "OutBlock_1")?;
            if records.is_empty() {
                return Err(SourceError::no_data("krx_listing returned an empty OutBlock_1"));
            }

            info!(count = records.len(), "parsed exchange listing");
            Ok(Listing::new(self.id(), segment, records))
        })
    }
}

/// Rows of one named array in a `getJsonData.cmd` payload, keeping the
/// string-valued columns under their upper-case KRX names.
pub(super) fn parse_block(body: &str, block: &str) -> Result<Vec<RawRecord>, SourceError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|error| SourceError::malformed(format!("krx payload: {error}")))?;
    let rows = payload
        .get(block)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::malformed(format!("krx payload has no {block} array")))?;

    Ok(rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| {
            row.iter()
                .filter_map(|(field, value)| value.as_str().map(|value| (field.as_str(), value)))
                .collect::<RawRecord>()
        })
        .filter(|record| !record.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_out_block_rows() {
        let body = r#"{"OutBlock_1":[
            {"ISU_SRT_CD":"064400","ISU_ABBRV":"LG씨엔에스","MKT_TP_NM":"KOSPI","LIST_SHRS":"96,874,211"},
            {"ISU_SRT_CD":"278990","ISU_ABBRV":"엠에이치에탄올","MKT_TP_NM":"KONEX"}
        ],"CURRENT_DATETIME":"2026.10.19 PM 03:30:00"}"#;

        let records = parse_block(body, "OutBlock_1").expect("valid payload");
        assert_eq!(records.len(), 2);
        assert!(records[1]
            .fields()
            .any(|(field, value)| field == "MKT_TP_NM" && value == "KONEX"));
    }

    #[test]
    fn missing_block_is_malformed() {
        let error = parse_block(r#"{"error":"LOGOUT"}"#, "OutBlock_1").expect_err("must fail");
        assert!(error.retryable());
    }
}
