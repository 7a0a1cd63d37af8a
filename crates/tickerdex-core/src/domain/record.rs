use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{Country, SymbolCode};
use crate::ValidationError;

/// Uniqueness key of a listing within the merged collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub country: Country,
    pub code: SymbolCode,
}

impl SymbolKey {
    pub fn new(country: Country, code: SymbolCode) -> Self {
        Self { country, code }
    }

    pub fn parse(country: Country, code: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(country, SymbolCode::parse(country, code)?))
    }
}

impl Display for SymbolKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.country, self.code)
    }
}

/// Canonical listing record shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub code: SymbolCode,
    pub name: String,
    pub market: String,
    pub country: Country,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl SymbolRecord {
    pub fn new(
        country: Country,
        code: &str,
        name: impl AsRef<str>,
        market: impl AsRef<str>,
        kind: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let code = SymbolCode::parse(country, code)?;
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let kind = kind
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        Ok(Self {
            code,
            name: name.to_owned(),
            market: market.as_ref().trim().to_owned(),
            country,
            kind,
        })
    }

    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(self.country, self.code.clone())
    }

    /// Name length in characters, the unit the merge rule compares.
    pub fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

/// Source-shaped record: field names and values exactly as the source
/// presented them, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        let err = SymbolRecord::new(Country::Kr, "005930", "  ", "KOSPI", None)
            .expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyName);
    }

    #[test]
    fn serializes_type_only_when_present() {
        let plain = SymbolRecord::new(Country::Kr, "005930", "삼성전자", "KOSPI", None)
            .expect("valid record");
        let json = serde_json::to_value(&plain).expect("serializes");
        assert_eq!(json["code"], "005930");
        assert_eq!(json["country"], "KR");
        assert!(json.get("type").is_none());

        let typed = SymbolRecord::new(Country::Us, "spy", "SPDR S&P 500", "NYSE ARCA", Some("ETF"))
            .expect("valid record");
        let json = serde_json::to_value(&typed).expect("serializes");
        assert_eq!(json["code"], "SPY");
        assert_eq!(json["type"], "ETF");
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let record = SymbolRecord::new(Country::Kr, "005935", "삼성전자우", "KOSPI", None)
            .expect("valid record");
        assert_eq!(record.name_len(), 5);
    }
}
