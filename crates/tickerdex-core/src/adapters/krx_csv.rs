use std::sync::Arc;

use tracing::info;

use super::send_expecting_data;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::listing_source::{Listing, ListingSource, SourceError, SourceFuture, SourceResult};
use crate::{MarketSegment, RawRecord, SourceId};

const CSV_URL: &str = "https://raw.githubusercontent.com/corazzon/finance-data-analysis/main/krx.csv";
const TIMEOUT_MS: u64 = 30_000;

/// Community CSV mirror of the KRX master list.
///
/// Column names vary between snapshots, so records keep the raw headers and
/// the normalizer resolves them by alias.
pub struct KrxCsvAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for KrxCsvAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
        }
    }
}

impl KrxCsvAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

impl ListingSource for KrxCsvAdapter {
    fn id(&self) -> SourceId {
        SourceId::KrxCsv
    }

    fn segments(&self) -> &'static [MarketSegment] {
        &[MarketSegment::Korea]
    }

    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult> {
        Box::pin(async move {
            if !self.supports(segment) {
                return Err(SourceError::unsupported_segment(self.id(), segment));
            }

            let request = HttpRequest::get(CSV_URL).with_timeout_ms(TIMEOUT_MS);
            let response = send_expecting_data(self.http_client.as_ref(), self.id(), request).await?;
            let records = parse_csv(&response.body)?;
            if records.is_empty() {
                return Err(SourceError::no_data("krx_csv mirror contained no rows"));
            }

            info!(count = records.len(), "parsed csv mirror");
            Ok(Listing::new(self.id(), segment, records))
        })
    }
}

fn parse_csv(body: &str) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| SourceError::malformed(format!("krx_csv header row: {error}")))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|error| SourceError::malformed(format!("krx_csv row: {error}")))?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .collect();
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_raw_headers_per_row() {
        let body = "\u{feff}Symbol,Market,Name,Sector\n005930,KOSPI,삼성전자,전기전자\n035720,KOSPI,카카오\n";
        let records = parse_csv(body).expect("valid csv");

        assert_eq!(records.len(), 2);
        let first: Vec<_> = records[0].fields().collect();
        assert_eq!(
            first,
            vec![
                ("Symbol", "005930"),
                ("Market", "KOSPI"),
                ("Name", "삼성전자"),
                ("Sector", "전기전자"),
            ]
        );
        assert_eq!(records[1].fields().count(), 3);
    }
}
