//! `symbols.json` artifact consumed by the search front end.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::error::CoreError;
use crate::{Country, SymbolRecord};

pub const ARTIFACT_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySection {
    pub count: usize,
    pub stocks: Vec<SymbolRecord>,
}

impl CountrySection {
    fn new(stocks: Vec<SymbolRecord>) -> Self {
        Self {
            count: stocks.len(),
            stocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolsArtifact {
    pub version: String,
    /// RFC 3339
    pub generated_at: String,
    pub korea: CountrySection,
    pub us: CountrySection,
    pub total: usize,
}

impl SymbolsArtifact {
    /// Artifact stamped with the current UTC time.
    pub fn generated_now(records: Vec<SymbolRecord>) -> Self {
        Self::from_records(records, OffsetDateTime::now_utc())
    }

    /// Splits records by country, keeping their order.
    pub fn from_records(records: Vec<SymbolRecord>, generated_at: OffsetDateTime) -> Self {
        let (korea, us): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|record| record.country == Country::Kr);
        let total = korea.len() + us.len();

        Self {
            version: String::from(ARTIFACT_VERSION),
            generated_at: generated_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| generated_at.unix_timestamp().to_string()),
            korea: CountrySection::new(korea),
            us: CountrySection::new(us),
            total,
        }
    }
}

/// Writes the artifact as pretty JSON, replacing `path` atomically: the
/// document goes to a temporary file in the same directory which is then
/// persisted over the target.
pub fn write_artifact(path: &Path, artifact: &SymbolsArtifact) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_vec_pretty(artifact)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(&json)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| CoreError::Artifact {
        path: path.display().to_string(),
        message: error.error.to_string(),
    })?;

    info!(path = %path.display(), total = artifact.total, "wrote symbols artifact");
    Ok(())
}
