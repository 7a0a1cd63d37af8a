//! Raw source records to canonical [`SymbolRecord`]s.
//!
//! Each source presents fields under its own names (CSV headers, JSON keys,
//! Korean column titles). A [`SourceSchema`] lists the aliases to try for
//! every canonical field; resolution is case-insensitive, an exact alias
//! match beats a substring match and earlier raw fields win ties.

use tracing::trace;

use crate::{Country, RawRecord, SourceId, SymbolRecord};

const CODE_ALIASES: &[&str] = &["symbol", "code", "ticker"];
const NAME_ALIASES: &[&str] = &["name", "종목명"];
const MARKET_ALIASES: &[&str] = &["market", "시장"];
const TYPE_ALIASES: &[&str] = &["type"];

/// Field-name mapping for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub country: Country,
    /// Used when the market field is absent or blank.
    pub default_market: &'static str,
    /// Used when the type field is absent or blank.
    pub default_type: Option<&'static str>,
    pub code: Vec<&'static str>,
    pub name: Vec<&'static str>,
    pub market: Vec<&'static str>,
    pub kind: Vec<&'static str>,
}

impl SourceSchema {
    /// Default aliases for a country.
    pub fn new(country: Country, default_market: &'static str) -> Self {
        Self {
            country,
            default_market,
            default_type: None,
            code: CODE_ALIASES.to_vec(),
            name: NAME_ALIASES.to_vec(),
            market: MARKET_ALIASES.to_vec(),
            kind: TYPE_ALIASES.to_vec(),
        }
    }

    pub fn with_code_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.code.extend_from_slice(aliases);
        self
    }

    pub fn with_name_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.name.extend_from_slice(aliases);
        self
    }

    pub fn with_market_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.market.extend_from_slice(aliases);
        self
    }

    pub fn with_type_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.kind.extend_from_slice(aliases);
        self
    }

    pub fn with_default_type(mut self, kind: &'static str) -> Self {
        self.default_type = Some(kind);
        self
    }

    /// Schema for records produced by a listing source.
    pub fn for_source(source: SourceId) -> Self {
        match source {
            SourceId::NaverMarket | SourceId::NaverItem | SourceId::NaverSearch => {
                Self::new(Country::Kr, "KRX")
            }
            SourceId::KrxCsv => Self::new(Country::Kr, "KRX")
                .with_code_aliases(&["단축코드", "종목코드"])
                .with_name_aliases(&["한글 종목약명", "종목약명"])
                .with_market_aliases(&["시장구분"]),
            SourceId::KrxListing => Self::new(Country::Kr, "KRX")
                .with_code_aliases(&["isu_srt_cd"])
                .with_name_aliases(&["isu_abbrv"])
                .with_market_aliases(&["mkt_tp_nm"])
                .with_type_aliases(&["kind_stkcert_tp_nm"]),
            SourceId::NaverEtf => Self::new(Country::Kr, "ETF")
                .with_code_aliases(&["itemcode"])
                .with_name_aliases(&["itemname"])
                .with_default_type("ETF"),
            SourceId::KrxEtf => Self::new(Country::Kr, "ETF")
                .with_code_aliases(&["isu_srt_cd"])
                .with_name_aliases(&["isu_abbrv"])
                .with_default_type("ETF"),
            SourceId::Finnhub => Self::new(Country::Us, "US")
                .with_code_aliases(&["displaysymbol"])
                .with_name_aliases(&["description"]),
            SourceId::Fmp => Self::new(Country::Us, "US")
                .with_name_aliases(&["companyname"])
                .with_market_aliases(&["exchangeshortname", "exchange"]),
            SourceId::UsTickerMirror => Self::new(Country::Us, "US")
                .with_default_type("Common Stock"),
            SourceId::NaverChart | SourceId::YahooChart => Self::new(Country::Us, "US"),
        }
    }
}

/// Maps a raw record into a [`SymbolRecord`]; `None` means the record is
/// discarded (missing or malformed code, blank name).
pub fn normalize(raw: &RawRecord, schema: &SourceSchema) -> Option<SymbolRecord> {
    let code = resolve_field(raw, &schema.code)?;
    let name = resolve_field(raw, &schema.name)?;
    let market = resolve_field(raw, &schema.market).unwrap_or(schema.default_market);
    let kind = resolve_field(raw, &schema.kind).or(schema.default_type);

    match SymbolRecord::new(schema.country, code, name, market, kind) {
        Ok(record) => Some(record),
        Err(error) => {
            trace!(code, %error, "discarding raw record");
            None
        }
    }
}

/// Normalizes a batch, returning the accepted records in input order.
pub fn normalize_all(records: &[RawRecord], schema: &SourceSchema) -> Vec<SymbolRecord> {
    records
        .iter()
        .filter_map(|raw| normalize(raw, schema))
        .collect()
}

/// Finds the value for the first alias hit. Exact (case-insensitive) name
/// matches are tried before substring matches; blank values do not count.
fn resolve_field<'r>(raw: &'r RawRecord, aliases: &[&str]) -> Option<&'r str> {
    let aliases: Vec<String> = aliases.iter().map(|alias| alias.to_lowercase()).collect();
    let present = |value: &str| !value.trim().is_empty();

    let exact = raw.fields().find(|(field, value)| {
        let field = field.trim().to_lowercase();
        present(value) && aliases.iter().any(|alias| *alias == field)
    });
    if let Some((_, value)) = exact {
        return Some(value);
    }

    raw.fields()
        .find(|(field, value)| {
            let field = field.trim().to_lowercase();
            present(value) && aliases.iter().any(|alias| field.contains(alias.as_str()))
        })
        .map(|(_, value)| value)
}
