use std::sync::Arc;

use serde::Serialize;
use tickerdex_core::{
    Country, HttpClient, NaverItemAdapter, SymbolCode, SymbolRecord, TickerLookup,
};

use crate::cli::LookupArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct LookupResponseData {
    code: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<SymbolRecord>,
}

pub async fn run(
    args: &LookupArgs,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    let code = SymbolCode::parse(Country::Kr, &args.code)?;

    let record = NaverItemAdapter::with_http_client(http_client)
        .lookup(code.as_str())
        .await?;

    let data = serde_json::to_value(LookupResponseData {
        code: code.to_string(),
        found: record.is_some(),
        record,
    })?;
    Ok(CommandResult::ok(data))
}
