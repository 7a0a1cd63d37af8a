use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical source identifiers used in logs, summaries and priority lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    NaverMarket,
    KrxCsv,
    KrxListing,
    NaverEtf,
    KrxEtf,
    Finnhub,
    Fmp,
    UsTickerMirror,
    NaverItem,
    NaverSearch,
    NaverChart,
    YahooChart,
}

impl SourceId {
    /// Listing sources in default merge priority order.
    pub const LISTING_PRIORITY: [Self; 8] = [
        Self::NaverMarket,
        Self::KrxCsv,
        Self::KrxListing,
        Self::NaverEtf,
        Self::KrxEtf,
        Self::Finnhub,
        Self::Fmp,
        Self::UsTickerMirror,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NaverMarket => "naver_market",
            Self::KrxCsv => "krx_csv",
            Self::KrxListing => "krx_listing",
            Self::NaverEtf => "naver_etf",
            Self::KrxEtf => "krx_etf",
            Self::Finnhub => "finnhub",
            Self::Fmp => "fmp",
            Self::UsTickerMirror => "us_ticker_mirror",
            Self::NaverItem => "naver_item",
            Self::NaverSearch => "naver_search",
            Self::NaverChart => "naver_chart",
            Self::YahooChart => "yahoo_chart",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "naver_market" => Ok(Self::NaverMarket),
            "krx_csv" => Ok(Self::KrxCsv),
            "krx_listing" => Ok(Self::KrxListing),
            "naver_etf" => Ok(Self::NaverEtf),
            "krx_etf" => Ok(Self::KrxEtf),
            "finnhub" => Ok(Self::Finnhub),
            "fmp" => Ok(Self::Fmp),
            "us_ticker_mirror" => Ok(Self::UsTickerMirror),
            "naver_item" => Ok(Self::NaverItem),
            "naver_search" => Ok(Self::NaverSearch),
            "naver_chart" => Ok(Self::NaverChart),
            "yahoo_chart" => Ok(Self::YahooChart),
            _ => Err(ValidationError::InvalidSource {
                value: value.to_owned(),
            }),
        }
    }
}

/// Slice of the listing universe an adapter is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSegment {
    /// KOSPI, KOSDAQ and KONEX stocks.
    Korea,
    KoreaEtf,
    Us,
}

impl MarketSegment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Korea => "korea",
            Self::KoreaEtf => "korea_etf",
            Self::Us => "us",
        }
    }

}

impl Display for MarketSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketSegment {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "korea" | "kr" => Ok(Self::Korea),
            "korea_etf" | "etf" => Ok(Self::KoreaEtf),
            "us" => Ok(Self::Us),
            _ => Err(ValidationError::InvalidSegment {
                value: value.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_round_trip_through_labels() {
        for source in SourceId::LISTING_PRIORITY {
            assert_eq!(source.as_str().parse::<SourceId>(), Ok(source));
        }
        assert_eq!("us-ticker-mirror".parse::<SourceId>(), Ok(SourceId::UsTickerMirror));
        assert!("pykrx".parse::<SourceId>().is_err());
    }
}
