use std::sync::Arc;

use serde::Serialize;
use tickerdex_core::{HttpClient, NameResolver, NaverSearchAdapter, SymbolRecord};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData {
    query: String,
    results: Vec<SymbolRecord>,
}

pub async fn run(
    args: &SearchArgs,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let resolver = NaverSearchAdapter::with_http_client(http_client);
    let results = resolver.resolve(query, args.limit).await?;

    let data = serde_json::to_value(SearchResponseData {
        query: query.to_owned(),
        results,
    })?;
    Ok(CommandResult::ok(data))
}
