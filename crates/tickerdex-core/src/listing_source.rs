//! Source adapter contract and result types.
//!
//! Every external listing source implements [`ListingSource`]. The pipeline
//! only ever sees `Ok(Listing)` or `Err(SourceError)`; adapter internals
//! (pagination, payload parsing, encodings) stay behind the trait.
//!
//! | Trait | Used by | Description |
//! |-------|---------|-------------|
//! | [`ListingSource`] | listing pipeline | Bulk symbol listing per segment |
//! | [`TickerLookup`] | overlay resolution, `lookup` command | Code to name/market |
//! | [`NameResolver`] | `search` command | Name to ranked code candidates |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::http_client::HttpError;
use crate::{MarketSegment, RawRecord, SourceId, SymbolRecord};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Timeout, connection reset, throttling or upstream 5xx.
    TransientNetwork,
    /// Payload did not have the expected shape (HTML where JSON was expected).
    MalformedResponse,
    /// Missing or rejected credentials.
    Auth,
    /// Source reachable but returned nothing usable.
    NoData,
    UnsupportedSegment,
}

/// Structured source error consumed by the retry controller and pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::TransientNetwork,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedResponse,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Auth,
            message: message.into(),
        }
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NoData,
            message: message.into(),
        }
    }

    pub fn unsupported_segment(source: SourceId, segment: MarketSegment) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedSegment,
            message: format!("segment '{segment}' is not supported by source '{source}'"),
        }
    }

    /// Maps a non-success HTTP status to the error taxonomy.
    pub fn from_status(source: SourceId, status: u16) -> Self {
        let message = format!("{source} upstream returned status {status}");
        match status {
            401 | 403 => Self::auth(message),
            404 => Self::no_data(message),
            _ => Self::transient(message),
        }
    }

    pub fn from_http(source: SourceId, error: &HttpError) -> Self {
        Self::transient(format!("{source} transport error: {}", error.message()))
    }

    /// Prefixes the message, keeping the classification.
    pub fn with_context(self, context: impl Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{context}: {}", self.message),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::TransientNetwork | SourceErrorKind::MalformedResponse
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::TransientNetwork => "source.transient_network",
            SourceErrorKind::MalformedResponse => "source.malformed_response",
            SourceErrorKind::Auth => "source.auth",
            SourceErrorKind::NoData => "source.no_data",
            SourceErrorKind::UnsupportedSegment => "source.unsupported_segment",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Records produced by one adapter invocation.
///
/// `warnings` carries errors hit after some records were already collected,
/// so a partially successful fetch still contributes what it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub source: SourceId,
    pub segment: MarketSegment,
    pub records: Vec<RawRecord>,
    pub warnings: Vec<String>,
}

impl Listing {
    pub fn new(source: SourceId, segment: MarketSegment, records: Vec<RawRecord>) -> Self {
        Self {
            source,
            segment,
            records,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub type SourceResult = Result<Listing, SourceError>;

/// Capability probe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Ready,
    /// Adapter cannot run this session (missing API key).
    Unavailable,
}

/// Capability probe result reported before an adapter is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthStatus {
    pub const fn ready() -> Self {
        Self {
            state: HealthState::Ready,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unavailable,
            reason: Some(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == HealthState::Ready
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bulk listing adapter contract.
///
/// Implementations must never panic across this boundary: every failure is
/// reported as a [`SourceError`], and every network call carries its own
/// timeout.
pub trait ListingSource: Send + Sync {
    /// Returns the unique source identifier.
    fn id(&self) -> SourceId;

    /// Returns the segments this adapter can list.
    fn segments(&self) -> &'static [MarketSegment];

    /// Lists raw symbol records for one segment.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when nothing could be retrieved. Failures after
    /// a partial retrieval are reported as [`Listing::warnings`] instead.
    fn fetch<'a>(&'a self, segment: MarketSegment) -> SourceFuture<'a, SourceResult>;

    /// Capability probe used to skip adapters that cannot run.
    fn health<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async { HealthStatus::ready() })
    }

    fn supports(&self, segment: MarketSegment) -> bool {
        self.segments().contains(&segment)
    }
}

/// Reverse lookup from an exact code to its canonical record.
pub trait TickerLookup: Send + Sync {
    fn id(&self) -> SourceId;

    /// Returns `Ok(None)` when the code is well-formed but unknown upstream.
    fn lookup<'a>(
        &'a self,
        code: &'a str,
    ) -> SourceFuture<'a, Result<Option<SymbolRecord>, SourceError>>;
}

/// Name to code resolution returning a small ranked candidate list.
pub trait NameResolver: Send + Sync {
    fn id(&self) -> SourceId;

    fn resolve<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> SourceFuture<'a, Result<Vec<SymbolRecord>, SourceError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_format_errors_are_retryable() {
        assert!(SourceError::transient("timeout").retryable());
        assert!(SourceError::malformed("html page").retryable());
        assert!(!SourceError::auth("no key").retryable());
        assert!(!SourceError::no_data("empty").retryable());
        assert!(
            !SourceError::unsupported_segment(SourceId::Fmp, MarketSegment::Korea).retryable()
        );
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_eq!(
            SourceError::from_status(SourceId::Finnhub, 401).kind(),
            SourceErrorKind::Auth
        );
        assert_eq!(
            SourceError::from_status(SourceId::Finnhub, 429).kind(),
            SourceErrorKind::TransientNetwork
        );
        assert_eq!(
            SourceError::from_status(SourceId::Finnhub, 503).kind(),
            SourceErrorKind::TransientNetwork
        );
        assert_eq!(
            SourceError::from_status(SourceId::KrxCsv, 404).kind(),
            SourceErrorKind::NoData
        );
    }
}
