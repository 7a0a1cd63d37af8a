//! Keyed merge of normalized records across sources.
//!
//! Records are keyed by `(country, code)`. A new key is appended and counts
//! as *added* by the source that introduced it. A repeated key keeps
//! whichever record has the strictly longer name (in characters); a
//! replacement counts as *refined* for the later source. Ties keep the
//! record seen first, so feeding sources in priority order makes the
//! earlier source win. Output order is first-seen order.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::{SourceId, SymbolKey, SymbolRecord};

/// What one source changed in the merged collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceContribution {
    pub added: usize,
    pub refined: usize,
}

/// Accumulating merge state owned by the orchestrator.
#[derive(Debug, Default)]
pub struct MergeEngine {
    index: HashMap<SymbolKey, usize>,
    records: Vec<SymbolRecord>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one source's records into the collection.
    pub fn ingest(
        &mut self,
        source: SourceId,
        records: impl IntoIterator<Item = SymbolRecord>,
    ) -> SourceContribution {
        let mut contribution = SourceContribution::default();

        for record in records {
            let key = record.key();
            match self.index.get(&key) {
                Some(&slot) => {
                    let existing = &mut self.records[slot];
                    if record.name_len() > existing.name_len() {
                        debug!(%source, %key, from = %existing.name, to = %record.name, "refined name");
                        *existing = record;
                        contribution.refined += 1;
                    }
                }
                None => {
                    self.index.insert(key, self.records.len());
                    self.records.push(record);
                    contribution.added += 1;
                }
            }
        }

        contribution
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SymbolRecord> {
        self.records
    }
}

/// Merged records plus per-source contributions, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub records: Vec<SymbolRecord>,
    pub contributions: Vec<(SourceId, SourceContribution)>,
}

/// One-shot merge of per-source record batches given in priority order.
pub fn merge<'a, I>(batches: I) -> MergeOutcome
where
    I: IntoIterator<Item = &'a (SourceId, Vec<SymbolRecord>)>,
{
    let mut engine = MergeEngine::new();
    let contributions = batches
        .into_iter()
        .map(|(source, records)| (*source, engine.ingest(*source, records.iter().cloned())))
        .collect();

    MergeOutcome {
        records: engine.into_records(),
        contributions,
    }
}
