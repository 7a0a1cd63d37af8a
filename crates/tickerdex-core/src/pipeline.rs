//! Listing pipeline orchestration.
//!
//! Sources run strictly one after another in priority order. Each step is
//! `health probe -> retry controller -> normalizer -> merge`; a failing step
//! is logged, reported and contributes nothing. The overlay is applied after
//! the last step.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{
    FinnhubAdapter, FmpAdapter, KrxCsvAdapter, KrxEtfAdapter, KrxListingAdapter, NaverEtfAdapter,
    NaverMarketAdapter, UsTickerMirrorAdapter, FINNHUB_KEY_VARS, FMP_KEY_VARS,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::listing_source::{HealthStatus, ListingSource, TickerLookup};
use crate::merge::MergeEngine;
use crate::normalizer::{normalize_all, SourceSchema};
use crate::overlay::{apply_overlay, resolve_overlay, OverlayReport, OverlaySpec};
use crate::retry::{with_retry, RetryPolicy};
use crate::{Country, MarketSegment, SourceId, SymbolRecord, ValidationError};

/// First non-blank value among `vars`.
pub fn api_key_from_env(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

/// Source snapshot used by the `sources` CLI command.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub id: SourceId,
    pub segments: Vec<MarketSegment>,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn status_label(&self) -> &'static str {
        if self.health.is_ready() {
            "ready"
        } else {
            "unavailable"
        }
    }
}

/// Registered listing adapters in default priority order.
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ListingSource>>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::from_env(Arc::new(ReqwestHttpClient::new()))
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn ListingSource>>) -> Self {
        Self { sources }
    }

    /// Every built-in listing adapter sharing `http_client`, with API keys
    /// read from the environment.
    pub fn from_env(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_api_keys(
            http_client,
            api_key_from_env(&FINNHUB_KEY_VARS),
            api_key_from_env(&FMP_KEY_VARS),
        )
    }

    pub fn with_api_keys(
        http_client: Arc<dyn HttpClient>,
        finnhub_key: Option<String>,
        fmp_key: Option<String>,
    ) -> Self {
        Self::new(vec![
            Arc::new(NaverMarketAdapter::with_http_client(Arc::clone(&http_client))),
            Arc::new(KrxCsvAdapter::with_http_client(Arc::clone(&http_client))),
            Arc::new(KrxListingAdapter::with_http_client(Arc::clone(&http_client))),
            Arc::new(NaverEtfAdapter::with_http_client(Arc::clone(&http_client))),
            Arc::new(KrxEtfAdapter::with_http_client(Arc::clone(&http_client))),
            Arc::new(FinnhubAdapter::with_http_client(
                Arc::clone(&http_client),
                finnhub_key,
            )),
            Arc::new(FmpAdapter::with_http_client(Arc::clone(&http_client), fmp_key)),
            Arc::new(UsTickerMirrorAdapter::with_http_client(http_client)),
        ])
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    /// Adapters for `priority`, in that order.
    ///
    /// # Errors
    ///
    /// Fails on an empty list or an id with no registered listing adapter.
    pub fn select(
        &self,
        priority: &[SourceId],
    ) -> Result<Vec<Arc<dyn ListingSource>>, ValidationError> {
        if priority.is_empty() {
            return Err(ValidationError::EmptyPriority);
        }

        priority
            .iter()
            .map(|id| {
                self.sources
                    .iter()
                    .find(|source| source.id() == *id)
                    .cloned()
                    .ok_or_else(|| ValidationError::InvalidSource {
                        value: id.to_string(),
                    })
            })
            .collect()
    }

    pub async fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut snapshots = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            snapshots.push(SourceSnapshot {
                id: source.id(),
                segments: source.segments().to_vec(),
                health: source.health().await,
            });
        }
        snapshots
    }
}

/// Outcome label of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    /// Records were returned together with warnings.
    Partial,
    Failed,
    /// Capability probe reported the adapter unusable.
    Skipped,
}

/// Per-step entry of the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub segment: MarketSegment,
    pub status: StepStatus,
    pub attempts: u32,
    /// Raw records returned by the adapter.
    pub fetched: usize,
    /// Records that survived normalization.
    pub accepted: usize,
    pub added: usize,
    pub refined: usize,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: SourceId, segment: MarketSegment, status: StepStatus) -> Self {
        Self {
            source,
            segment,
            status,
            attempts: 0,
            fetched: 0,
            accepted: 0,
            added: 0,
            refined: 0,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// A step contributes only when at least one of its records survived
    /// normalization.
    fn contributed(&self) -> bool {
        matches!(self.status, StepStatus::Ok | StepStatus::Partial) && self.accepted > 0
    }
}

/// Machine-readable summary printed by `generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub run_id: Uuid,
    pub korea_count: usize,
    pub us_count: usize,
    pub total_count: usize,
    /// Set by the caller once the artifact is written.
    pub output_file: Option<String>,
    pub sources: Vec<SourceReport>,
    pub overlay: OverlayReport,
    /// Record counts per country, then per market label.
    pub market_stats: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Merged records plus the run summary.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub summary: RunSummary,
    pub records: Vec<SymbolRecord>,
}

struct PipelineStep {
    source: Arc<dyn ListingSource>,
    segment: MarketSegment,
}

/// Sequential multi-source listing run.
pub struct ListingPipeline {
    steps: Vec<PipelineStep>,
    retry_policy: RetryPolicy,
    overlay: Vec<OverlaySpec>,
    lookup: Option<Arc<dyn TickerLookup>>,
}

impl ListingPipeline {
    /// One step per (source, segment) pair, in the order given.
    pub fn new(sources: Vec<Arc<dyn ListingSource>>) -> Self {
        let steps = sources
            .into_iter()
            .flat_map(|source| {
                source
                    .segments()
                    .iter()
                    .map(move |&segment| PipelineStep {
                        source: Arc::clone(&source),
                        segment,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            steps,
            retry_policy: RetryPolicy::default(),
            overlay: Vec::new(),
            lookup: None,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_overlay(mut self, overlay: Vec<OverlaySpec>) -> Self {
        self.overlay = overlay;
        self
    }

    /// Reverse lookup used for overlay entries without a name.
    pub fn with_lookup(mut self, lookup: Arc<dyn TickerLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub async fn run(&self) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("listing_run", %run_id);
        self.run_steps(run_id).instrument(span).await
    }

    async fn run_steps(&self, run_id: Uuid) -> PipelineRun {
        info!(steps = self.steps.len(), "starting listing run");
        let mut engine = MergeEngine::new();
        let mut reports = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let report = self.run_step(step, &mut engine).await;
            reports.push(report);
        }
        if engine.is_empty() {
            warn!("no listing records survived normalization");
        } else {
            info!(merged = engine.len(), "merge complete");
        }

        let resolved = resolve_overlay(&self.overlay, self.lookup.as_deref()).await;
        let (records, mut overlay_report) = apply_overlay(engine.into_records(), &resolved.entries);
        overlay_report.unresolved = resolved.unresolved.len();
        if overlay_report.applied > 0 {
            info!(
                inserted = overlay_report.inserted,
                replaced = overlay_report.replaced,
                "applied overlay"
            );
        }

        let success = (reports.iter().any(SourceReport::contributed) || !resolved.is_empty())
            && !records.is_empty();
        if !success {
            warn!("no source produced usable records and the overlay is empty");
        }

        let korea_count = records
            .iter()
            .filter(|record| record.country == Country::Kr)
            .count();
        let market_stats = market_stats(&records);
        for (country, markets) in &market_stats {
            for (market, count) in markets {
                info!(country = %country, market = %market, count, "market statistics");
            }
        }

        let summary = RunSummary {
            success,
            run_id,
            korea_count,
            us_count: records.len() - korea_count,
            total_count: records.len(),
            output_file: None,
            sources: reports,
            overlay: overlay_report,
            market_stats,
        };
        info!(
            success,
            korea = summary.korea_count,
            us = summary.us_count,
            total = summary.total_count,
            "listing run finished"
        );

        PipelineRun { summary, records }
    }

    async fn run_step(&self, step: &PipelineStep, engine: &mut MergeEngine) -> SourceReport {
        let source = step.source.id();
        let segment = step.segment;

        let health = step.source.health().await;
        if !health.is_ready() {
            let reason = health.reason.unwrap_or_else(|| String::from("unavailable"));
            info!(%source, %segment, reason = %reason, "skipping source");
            let mut report = SourceReport::new(source, segment, StepStatus::Skipped);
            report.error = Some(reason);
            return report;
        }

        info!(%source, %segment, "fetching listing");
        let outcome = with_retry(|| step.source.fetch(segment), &self.retry_policy).await;

        let listing = match outcome.result {
            Ok(listing) => listing,
            Err(error) => {
                warn!(%source, %segment, attempts = outcome.attempts, code = error.code(), "source failed: {}", error.message());
                let mut report = SourceReport::new(source, segment, StepStatus::Failed);
                report.attempts = outcome.attempts;
                report.error = Some(error.to_string());
                return report;
            }
        };

        for warning in &listing.warnings {
            warn!(%source, %segment, "partial listing: {warning}");
        }

        let schema = SourceSchema::for_source(source);
        let accepted = normalize_all(&listing.records, &schema);
        let discarded = listing.records.len() - accepted.len();
        if discarded > 0 {
            debug!(%source, discarded, "discarded malformed records");
        }

        let accepted_count = accepted.len();
        let contribution = engine.ingest(source, accepted);
        info!(
            %source,
            %segment,
            fetched = listing.records.len(),
            accepted = accepted_count,
            added = contribution.added,
            refined = contribution.refined,
            "merged source"
        );

        let status = if listing.warnings.is_empty() {
            StepStatus::Ok
        } else {
            StepStatus::Partial
        };
        SourceReport {
            source,
            segment,
            status,
            attempts: outcome.attempts,
            fetched: listing.records.len(),
            accepted: accepted_count,
            added: contribution.added,
            refined: contribution.refined,
            warnings: listing.warnings,
            error: None,
        }
    }
}

fn market_stats(records: &[SymbolRecord]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut stats: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for record in records {
        *stats
            .entry(record.country.to_string())
            .or_default()
            .entry(record.market.clone())
            .or_default() += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use crate::HealthState;

    fn registry() -> SourceRegistry {
        SourceRegistry::with_api_keys(Arc::new(ScriptedHttpClient::new()), None, None)
    }

    #[test]
    fn registry_keeps_default_priority_order() {
        assert_eq!(registry().ids(), SourceId::LISTING_PRIORITY.to_vec());
    }

    #[test]
    fn select_rejects_empty_and_non_listing_ids() {
        let registry = registry();
        assert_eq!(
            registry.select(&[]).err(),
            Some(ValidationError::EmptyPriority)
        );
        assert!(matches!(
            registry.select(&[SourceId::NaverChart]),
            Err(ValidationError::InvalidSource { .. })
        ));

        let selected = registry
            .select(&[SourceId::UsTickerMirror, SourceId::KrxCsv])
            .expect("known sources");
        let ids: Vec<_> = selected.iter().map(|source| source.id()).collect();
        assert_eq!(ids, vec![SourceId::UsTickerMirror, SourceId::KrxCsv]);
    }

    #[tokio::test]
    async fn snapshots_report_keyless_sources_unavailable() {
        let snapshots = registry().snapshots().await;
        let finnhub = snapshots
            .iter()
            .find(|snapshot| snapshot.id == SourceId::Finnhub)
            .expect("registered");
        assert_eq!(finnhub.health.state, HealthState::Unavailable);
        assert_eq!(finnhub.status_label(), "unavailable");

        let krx = snapshots
            .iter()
            .find(|snapshot| snapshot.id == SourceId::KrxCsv)
            .expect("registered");
        assert_eq!(krx.status_label(), "ready");
        assert_eq!(krx.segments, vec![MarketSegment::Korea]);
    }

    #[test]
    fn market_stats_group_by_country_then_market() {
        let records = vec![
            SymbolRecord::new(Country::Kr, "005930", "삼성전자", "KOSPI", None).expect("valid"),
            SymbolRecord::new(Country::Kr, "000660", "SK하이닉스", "KOSPI", None).expect("valid"),
            SymbolRecord::new(Country::Us, "AAPL", "Apple", "NASDAQ", None).expect("valid"),
        ];
        let stats = market_stats(&records);
        assert_eq!(stats["KR"]["KOSPI"], 2);
        assert_eq!(stats["US"]["NASDAQ"], 1);
    }

    #[test]
    fn blank_env_keys_are_ignored() {
        assert_eq!(api_key_from_env(&["TICKERDEX_TEST_KEY_THAT_IS_NEVER_SET"]), None);
    }
}
