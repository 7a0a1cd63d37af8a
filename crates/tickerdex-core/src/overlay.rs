//! Manual corrections applied after the merge.
//!
//! The overlay file is a JSON array of `{country, code, name?, market?,
//! type?}` entries. An entry replaces the merged record with the same key in
//! place, or is appended when the key is missing. Entries without a name are
//! resolved through a [`TickerLookup`] first; unresolvable ones are dropped.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::listing_source::TickerLookup;
use crate::{Country, SymbolRecord};

/// One overlay entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub country: Country,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl OverlaySpec {
    pub fn new(country: Country, code: impl Into<String>) -> Self {
        Self {
            country,
            code: code.into(),
            name: None,
            market: None,
            kind: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    fn label(&self) -> String {
        format!("{}:{}", self.country, self.code.trim())
    }
}

/// Reads overlay entries from a JSON file.
pub fn load_overlay(path: &Path) -> Result<Vec<OverlaySpec>, CoreError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CoreError::Overlay {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

/// Like [`load_overlay`], but a missing file means an empty overlay.
pub fn load_overlay_if_present(path: &Path) -> Result<Vec<OverlaySpec>, CoreError> {
    if !path.exists() {
        info!(path = %path.display(), "no overlay file, skipping overlay");
        return Ok(Vec::new());
    }
    load_overlay(path)
}

/// Overlay entries ready to apply, plus the labels of dropped entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOverlay {
    pub entries: Vec<SymbolRecord>,
    pub unresolved: Vec<String>,
}

impl ResolvedOverlay {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns specs into canonical records, looking up missing names.
pub async fn resolve_overlay(
    specs: &[OverlaySpec],
    lookup: Option<&dyn TickerLookup>,
) -> ResolvedOverlay {
    let mut resolved = ResolvedOverlay::default();

    for spec in specs {
        match resolve_one(spec, lookup).await {
            Some(record) => resolved.entries.push(record),
            None => {
                warn!(entry = %spec.label(), "dropping unresolved overlay entry");
                resolved.unresolved.push(spec.label());
            }
        }
    }

    resolved
}

async fn resolve_one(spec: &OverlaySpec, lookup: Option<&dyn TickerLookup>) -> Option<SymbolRecord> {
    let default_market = match spec.country {
        Country::Kr => "KRX",
        Country::Us => "US",
    };

    if let Some(name) = spec.name.as_deref() {
        let market = spec.market.as_deref().unwrap_or(default_market);
        return match SymbolRecord::new(spec.country, &spec.code, name, market, spec.kind.as_deref())
        {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(entry = %spec.label(), %error, "invalid overlay entry");
                None
            }
        };
    }

    let lookup = lookup.filter(|_| spec.country == Country::Kr)?;
    let code = spec.code.trim();
    match lookup.lookup(code).await {
        Ok(Some(mut record)) => {
            if let Some(market) = spec.market.as_deref() {
                record.market = market.trim().to_owned();
            }
            if let Some(kind) = spec.kind.as_deref() {
                record.kind = Some(kind.trim().to_owned());
            }
            info!(entry = %spec.label(), name = %record.name, source = %lookup.id(), "resolved overlay name");
            Some(record)
        }
        Ok(None) => None,
        Err(error) => {
            warn!(entry = %spec.label(), %error, "overlay lookup failed");
            None
        }
    }
}

/// Counters reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReport {
    pub applied: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub unresolved: usize,
}

/// Applies overlay entries: existing key is replaced in place, missing key
/// is appended. Later entries for the same key win.
pub fn apply_overlay(
    mut records: Vec<SymbolRecord>,
    overlay: &[SymbolRecord],
) -> (Vec<SymbolRecord>, OverlayReport) {
    let mut index: HashMap<_, usize> = records
        .iter()
        .enumerate()
        .map(|(slot, record)| (record.key(), slot))
        .collect();
    let mut report = OverlayReport::default();

    for entry in overlay {
        let key = entry.key();
        match index.get(&key) {
            Some(&slot) => {
                records[slot] = entry.clone();
                report.replaced += 1;
            }
            None => {
                index.insert(key, records.len());
                records.push(entry.clone());
                report.inserted += 1;
            }
        }
        report.applied += 1;
    }

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing_source::{SourceError, SourceFuture};
    use crate::SourceId;

    struct FixedLookup;

    impl TickerLookup for FixedLookup {
        fn id(&self) -> SourceId {
            SourceId::NaverItem
        }

        fn lookup<'a>(
            &'a self,
            code: &'a str,
        ) -> SourceFuture<'a, Result<Option<SymbolRecord>, SourceError>> {
            Box::pin(async move {
                if code == "064400" {
                    Ok(SymbolRecord::new(Country::Kr, code, "LG씨엔에스", "KOSPI", None).ok())
                } else {
                    Ok(None)
                }
            })
        }
    }

    fn kr(code: &str, name: &str) -> SymbolRecord {
        SymbolRecord::new(Country::Kr, code, name, "KOSPI", None).expect("valid record")
    }

    #[test]
    fn replaces_in_place_and_appends_missing() {
        let merged = vec![kr("005930", "삼성전자"), kr("000660", "SK하이닉스")];
        let overlay = vec![kr("000660", "에스케이하이닉스"), kr("064400", "LG씨엔에스")];

        let (records, report) = apply_overlay(merged, &overlay);

        let names: Vec<_> = records.iter().map(|record| record.name.as_str()).collect();
        assert_eq!(names, vec!["삼성전자", "에스케이하이닉스", "LG씨엔에스"]);
        assert_eq!(
            report,
            OverlayReport {
                applied: 2,
                inserted: 1,
                replaced: 1,
                unresolved: 0
            }
        );
    }

    #[test]
    fn overlay_overrides_even_shorter_names() {
        let (records, _) = apply_overlay(vec![kr("005930", "삼성전자보통주")], &[kr("005930", "삼성전자")]);
        assert_eq!(records, vec![kr("005930", "삼성전자")]);
    }

    #[test]
    fn parses_overlay_file_shape() {
        let json = r#"[
            {"country": "KR", "code": "064400", "name": "LG씨엔에스", "market": "KOSPI"},
            {"country": "US", "code": "brk.b", "name": "Berkshire Hathaway B", "type": "Common Stock"}
        ]"#;
        let specs: Vec<OverlaySpec> = serde_json::from_str(json).expect("valid overlay");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].kind.as_deref(), Some("Common Stock"));
    }

    #[test]
    fn load_reports_invalid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("overlay.json");
        std::fs::write(&path, "{not json").expect("write");

        assert!(matches!(load_overlay(&path), Err(CoreError::Overlay { .. })));
        assert_eq!(
            load_overlay_if_present(&dir.path().join("missing.json")).expect("empty"),
            Vec::new()
        );
    }

    #[tokio::test]
    async fn resolves_nameless_entries_through_lookup() {
        let specs = vec![
            OverlaySpec::new(Country::Kr, "064400"),
            OverlaySpec::new(Country::Kr, "999999"),
            OverlaySpec::new(Country::Us, "AAPL").with_name("Apple Inc."),
        ];

        let resolved = resolve_overlay(&specs, Some(&FixedLookup)).await;

        assert_eq!(resolved.entries.len(), 2);
        assert_eq!(resolved.entries[0].name, "LG씨엔에스");
        assert_eq!(resolved.entries[1].market, "US");
        assert_eq!(resolved.unresolved, vec!["KR:999999".to_owned()]);
    }

    #[tokio::test]
    async fn nameless_entry_without_lookup_is_dropped() {
        let resolved = resolve_overlay(&[OverlaySpec::new(Country::Kr, "064400")], None).await;
        assert!(resolved.is_empty());
        assert_eq!(resolved.unresolved.len(), 1);
    }
}
