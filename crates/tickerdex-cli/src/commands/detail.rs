use std::sync::Arc;

use serde_json::json;
use tickerdex_core::{DetailService, HttpClient};
use tracing::warn;

use crate::cli::DetailArgs;
use crate::error::CliError;

use super::CommandResult;

/// Failures are reported as `{"error": ...}` on stdout with status 1.
const DETAIL_ERROR_EXIT: u8 = 1;

pub async fn run(
    args: &DetailArgs,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    let service = DetailService::with_http_client(http_client).with_days(args.days);

    match service.detail(&args.symbol).await {
        Ok(detail) => Ok(CommandResult::ok(serde_json::to_value(detail)?)),
        Err(error) => {
            warn!(symbol = %args.symbol, %error, "detail lookup failed");
            Ok(CommandResult::ok(json!({ "error": error.to_string() }))
                .with_exit_code(DETAIL_ERROR_EXIT))
        }
    }
}

#[cfg(test)]
mod tests {
    use tickerdex_core::ScriptedHttpClient;

    use super::*;

    #[tokio::test]
    async fn unknown_symbol_reports_error_object() {
        // Given: Yahoo answers 404 for every chart request
        let http = ScriptedHttpClient::new();
        let args = DetailArgs {
            symbol: String::from("NOPE"),
            days: 120,
        };

        // When: the detail command runs
        let result = run(&args, Arc::new(http)).await.expect("rendered");

        // Then: the payload is an error object with exit status 1
        assert_eq!(result.exit_code, DETAIL_ERROR_EXIT);
        assert!(result.data["error"].as_str().is_some());
    }
}
