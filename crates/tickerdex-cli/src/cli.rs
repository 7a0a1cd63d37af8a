//! CLI argument definitions for tickerdex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Run the listing pipeline and write `symbols.json` |
//! | `search` | Resolve a Korean company name to item codes |
//! | `lookup` | Resolve a Korean item code to its name and market |
//! | `detail` | Price history, RSI and moving averages for one symbol |
//! | `sources` | List listing sources and whether they can run |
//!
//! Logs are written to stderr and filtered with `RUST_LOG` (default `info`).
//!
//! # Examples
//!
//! ```bash
//! tickerdex generate --output public/data/symbols.json
//! tickerdex generate --sources naver_market,krx_csv --max-attempts 1
//! tickerdex search 삼성전자 --pretty
//! tickerdex detail 005930.KS
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tickerdex_core::SourceId;

/// Korean and US symbol listing toolkit.
#[derive(Debug, Parser)]
#[command(
    name = "tickerdex",
    author,
    version,
    about = "Multi-source KR/US symbol listing and per-symbol detail"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every listing source, merge, apply the overlay and write the
    /// artifact.
    ///
    /// API keys are read from the environment: TICKERDEX_FINNHUB_API_KEY,
    /// FINNHUB_API_KEY or NEXT_PUBLIC_FINNHUB_API_KEY for Finnhub, and
    /// TICKERDEX_FMP_API_KEY or FMP_API_KEY for FMP. Sources without a key
    /// are skipped.
    Generate(GenerateArgs),

    /// Resolve a company name to at most `--limit` Korean item codes.
    ///
    ///   tickerdex search 카카오
    ///   tickerdex search 005930
    Search(SearchArgs),

    /// Look up the name and market of a 6-digit Korean item code.
    Lookup(LookupArgs),

    /// Price history and indicator snapshot for one symbol.
    ///
    /// Six-digit codes (optionally suffixed `.KS` or `.KQ`) use the Korean
    /// portal chart feed; anything else goes to Yahoo.
    Detail(DetailArgs),

    /// List listing sources with their segments and readiness.
    Sources,
}

/// Arguments for the `generate` command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Artifact path.
    #[arg(long, default_value = "public/data/symbols.json")]
    pub output: PathBuf,

    /// Overlay file; a missing file means no overlay.
    #[arg(long, default_value = "config/overlay.json")]
    pub overlay: PathBuf,

    /// Attempts per source before giving up.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Base retry delay; attempt `n` waits `n` times this.
    #[arg(long, default_value_t = 2_000)]
    pub base_delay_ms: u64,

    /// Comma-separated source priority list, e.g. `naver_market,krx_csv,us_ticker_mirror`.
    #[arg(long, value_delimiter = ',')]
    pub sources: Option<Vec<SourceId>>,

    /// Skip the reverse lookup for overlay entries without a name.
    #[arg(long, default_value_t = false)]
    pub no_lookup: bool,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Company name or 6-digit code.
    pub query: String,

    /// Maximum number of candidates.
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

/// Arguments for the `lookup` command.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Six-digit Korean item code.
    pub code: String,
}

/// Arguments for the `detail` command.
#[derive(Debug, Args)]
pub struct DetailArgs {
    /// Ticker (`AAPL`) or Korean code (`005930`, `005930.KS`).
    pub symbol: String,

    /// Trading days of history.
    #[arg(long, default_value_t = 120)]
    pub days: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_defaults() {
        let cli = Cli::try_parse_from(["tickerdex", "generate"]).expect("parses");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.output, PathBuf::from("public/data/symbols.json"));
        assert_eq!(args.max_attempts, 3);
        assert_eq!(args.base_delay_ms, 2_000);
        assert!(args.sources.is_none());
    }

    #[test]
    fn parses_source_priority_list() {
        let cli = Cli::try_parse_from([
            "tickerdex",
            "generate",
            "--sources",
            "krx_csv,us-ticker-mirror",
        ])
        .expect("parses");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            args.sources,
            Some(vec![SourceId::KrxCsv, SourceId::UsTickerMirror])
        );
    }

    #[test]
    fn rejects_unknown_source() {
        assert!(Cli::try_parse_from(["tickerdex", "generate", "--sources", "pykrx"]).is_err());
    }

    #[test]
    fn pretty_is_global() {
        let cli = Cli::try_parse_from(["tickerdex", "detail", "AAPL", "--pretty"]).expect("parses");
        assert!(cli.pretty);
    }
}
