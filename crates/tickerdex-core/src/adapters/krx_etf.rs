use std::sync::Arc;

use tracing::info;

use super::krx_listing::{parse_block, KRX_ENDPOINT};
use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::{MarketSegment, SourceId};

const REFERER: &str =
    "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader/index.cmd?menuId=MDC0201030104";
/// ETF basic-information screen, every listed fund in one payload.
const FORM: &str = "bld=dbms/MDC/STAT/standard/MDCSTAT04601&locale=ko_KR&share=1&csvxls_isNo=false";
const TIMEOUT_MS: u64 = 30_000;

/// Exchange ETF listing, queried after the portal list so funds the portal
/// misses still make it into the artifact.
pub struct KrxEtfAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for KrxEtfAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl KrxEtfAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl ListingSource for KrxEtfAdapter {
    fn id(&self) -> SourceId {
        SourceId::KrxEtf
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::KoreaEtf]
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
            let records = parse_block(&response.body, "output")?;
            if records.is_empty() {
                return Err(SourceError::no_data("krx_etf returned an empty output block"));
            }

            info!(count = records.len(), "parsed exchange etf listing");
            Ok(Listing::new(self.id(), segment, records))
        })
    }
}
