//! Core contracts for tickerdex.
//!
//! This crate contains:
//! - Canonical symbol records and validation
//! - Source identifiers and the listing adapter contract
//! - Adapters for portal, exchange and US ticker sources
//! - Normalization, retry, merge and overlay stages of the listing pipeline
//! - The `symbols.json` artifact writer
//! - Per-symbol price history with technical indicators

pub mod adapters;
pub mod artifact;
pub mod detail;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod listing_source;
pub mod merge;
pub mod normalizer;
pub mod overlay;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod throttling;

pub use adapters::{
    FinnhubAdapter, FmpAdapter, KrxCsvAdapter, KrxEtfAdapter, KrxListingAdapter, NaverChartSource,
    NaverEtfAdapter, NaverItemAdapter, NaverMarketAdapter, NaverSearchAdapter,
    UsTickerMirrorAdapter, YahooChartSource,
};
pub use artifact::{write_artifact, SymbolsArtifact};
pub use detail::{DailyBar, DetailService, HistorySource, StockDetail};
pub use domain::{Country, RawRecord, SymbolCode, SymbolKey, SymbolRecord};
pub use error::{CoreError, DetailError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use indicators::MovingAverages;
pub use listing_source::{
    HealthState, HealthStatus, Listing, ListingSource, NameResolver, SourceError,
    SourceErrorKind, SourceFuture, SourceResult, TickerLookup,
};
pub use merge::{merge, MergeEngine, MergeOutcome, SourceContribution};
pub use normalizer::{normalize, normalize_all, SourceSchema};
pub use overlay::{
    apply_overlay, load_overlay, load_overlay_if_present, resolve_overlay, OverlayReport,
    OverlaySpec, ResolvedOverlay,
};
pub use pipeline::{
    ListingPipeline, PipelineRun, RunSummary, SourceRegistry, SourceReport, SourceSnapshot,
    StepStatus,
};
pub use retry::{with_retry, RetryOutcome, RetryPolicy};
pub use source::{MarketSegment, SourceId};
pub use throttling::HostThrottle;
