use std::sync::Arc;
use std::time::Duration;

use tickerdex_core::{
    load_overlay_if_present, write_artifact, HttpClient, ListingPipeline, NaverItemAdapter,
    PipelineRun, RetryPolicy, SourceRegistry, SymbolsArtifact,
};
use tracing::{error, info};

use crate::cli::GenerateArgs;
use crate::error::CliError;

use super::CommandResult;

/// Exit status when every source failed and the overlay was empty.
const TOTAL_FAILURE_EXIT: u8 = 3;

pub async fn run(
    args: &GenerateArgs,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    let retry_policy =
        RetryPolicy::new(args.max_attempts, Duration::from_millis(args.base_delay_ms))?;
    let registry = SourceRegistry::from_env(Arc::clone(&http_client));
    let priority = args.sources.clone().unwrap_or_else(|| registry.ids());
    let sources = registry.select(&priority)?;

    let overlay = load_overlay_if_present(&args.overlay)?;
    info!(entries = overlay.len(), path = %args.overlay.display(), "loaded overlay");

    let mut pipeline = ListingPipeline::new(sources)
        .with_retry_policy(retry_policy)
        .with_overlay(overlay);
    if !args.no_lookup {
        pipeline = pipeline.with_lookup(Arc::new(NaverItemAdapter::with_http_client(http_client)));
    }

    let PipelineRun {
        mut summary,
        records,
    } = pipeline.run().await;

    if !summary.success {
        error!("no source produced data; artifact not written");
        return Ok(
            CommandResult::ok(serde_json::to_value(&summary)?).with_exit_code(TOTAL_FAILURE_EXIT)
        );
    }

    write_artifact(&args.output, &SymbolsArtifact::generated_now(records))?;
    summary.output_file = Some(args.output.display().to_string());

    Ok(CommandResult::ok(serde_json::to_value(&summary)?))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tickerdex_core::{HttpResponse, ScriptedHttpClient, SourceId};

    use super::*;

    fn args(output: PathBuf, overlay: PathBuf) -> GenerateArgs {
        GenerateArgs {
            output,
            overlay,
            max_attempts: 1,
            base_delay_ms: 0,
            sources: Some(vec![SourceId::KrxCsv]),
            no_lookup: true,
        }
    }

    #[tokio::test]
    async fn writes_artifact_and_summary() {
        // Given: the CSV mirror answers with two rows and no overlay file exists
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("public").join("symbols.json");
        let http = ScriptedHttpClient::new().route(
            "krx.csv",
            HttpResponse::ok("종목코드,종목명,시장구분\n005930,삼성전자,KOSPI\n035720,카카오,KOSPI\n"),
        );

        // When: generate runs with only that source
        let result = run(
            &args(output.clone(), dir.path().join("missing.json")),
            Arc::new(http),
        )
        .await
        .expect("generate succeeds");

        // Then: the artifact holds both records and the summary points at it
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.data["success"], true);
        assert_eq!(result.data["korea_count"], 2);
        assert_eq!(result.data["sources"][0]["status"], "ok");
        let artifact: SymbolsArtifact =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("written"))
                .expect("valid artifact");
        assert_eq!(artifact.korea.count, 2);
        assert_eq!(artifact.total, 2);
    }

    #[tokio::test]
    async fn total_failure_skips_artifact() {
        // Given: the CSV mirror is down and there is no overlay
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("symbols.json");
        let http = ScriptedHttpClient::new().route("krx.csv", HttpResponse::with_status(503, ""));

        // When: generate runs
        let result = run(
            &args(output.clone(), dir.path().join("missing.json")),
            Arc::new(http),
        )
        .await
        .expect("summary is still produced");

        // Then: the failure is reported and nothing is written
        assert_eq!(result.exit_code, TOTAL_FAILURE_EXIT);
        assert_eq!(result.data["success"], false);
        assert_eq!(result.data["total_count"], 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn unusable_rows_leave_the_previous_artifact_in_place() {
        // Given: an existing artifact and a mirror whose codes are all malformed
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("symbols.json");
        std::fs::write(&output, "{\"previous\":true}").expect("seed artifact");
        let http = ScriptedHttpClient::new().route(
            "krx.csv",
            HttpResponse::ok("종목코드,종목명,시장구분\n5930,삼성전자,KOSPI\n660,SK하이닉스,KOSPI\n"),
        );

        // When: generate runs
        let result = run(
            &args(output.clone(), dir.path().join("missing.json")),
            Arc::new(http),
        )
        .await
        .expect("summary is still produced");

        // Then: the run fails and the old file is untouched
        assert_eq!(result.exit_code, TOTAL_FAILURE_EXIT);
        assert_eq!(result.data["success"], false);
        assert_eq!(
            std::fs::read_to_string(&output).expect("still there"),
            "{\"previous\":true}"
        );
    }

    #[tokio::test]
    async fn invalid_overlay_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let overlay = dir.path().join("overlay.json");
        std::fs::write(&overlay, "{not json").expect("write overlay");

        let result = run(
            &args(dir.path().join("symbols.json"), overlay),
            Arc::new(ScriptedHttpClient::new()),
        )
        .await;

        assert!(matches!(result, Err(CliError::Core(_))));
    }
}
