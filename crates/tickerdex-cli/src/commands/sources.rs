use std::sync::Arc;

use serde::Serialize;
use tickerdex_core::{HttpClient, MarketSegment, SourceId, SourceRegistry};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: SourceId,
    priority: usize,
    available: bool,
    status: &'static str,
    segments: Vec<MarketSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
}

pub async fn run(http_client: Arc<dyn HttpClient>) -> Result<CommandResult, CliError> {
    let registry = SourceRegistry::from_env(http_client);

    let sources = registry
        .snapshots()
        .await
        .into_iter()
        .enumerate()
        .map(|(index, snapshot)| SourceStatus {
            id: snapshot.id,
            priority: index + 1,
            available: snapshot.health.is_ready(),
            status: snapshot.status_label(),
            segments: snapshot.segments,
            reason: snapshot.health.reason,
        })
        .collect::<Vec<_>>();

    let data = serde_json::to_value(SourcesResponseData { sources })?;
    Ok(CommandResult::ok(data))
}
