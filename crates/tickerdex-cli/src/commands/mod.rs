mod detail;
mod generate;
mod lookup;
mod search;
mod sources;

use std::sync::Arc;

use serde_json::Value;
use tickerdex_core::{HttpClient, ReqwestHttpClient};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Rendered command payload and the process exit status.
#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub exit_code: u8,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self { data, exit_code: 0 }
    }

    pub fn with_exit_code(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    match &cli.command {
        Command::Generate(args) => generate::run(args, http_client).await,
        Command::Search(args) => search::run(args, http_client).await,
        Command::Lookup(args) => lookup::run(args, http_client).await,
        Command::Detail(args) => detail::run(args, http_client).await,
        Command::Sources => sources::run(http_client).await,
    }
}
