use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const KR_CODE_LEN: usize = 6;
const MAX_TICKER_LEN: usize = 15;

/// Country namespace a listing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "KR")]
    Kr,
    #[serde(rename = "US")]
    Us,
}

impl Country {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kr => "KR",
            Self::Us => "US",
        }
    }
}

impl Display for Country {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Country {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KR" | "KOREA" => Ok(Self::Kr),
            "US" | "USA" => Ok(Self::Us),
            _ => Err(ValidationError::InvalidCountry {
                value: value.to_owned(),
            }),
        }
    }
}

/// Exchange code or ticker, shape-checked for its country.
///
/// Korean codes are exactly six ASCII digits. US tickers are uppercased and
/// may carry internal `.` or `-` share-class separators (`BRK.A`, `BF-B`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolCode(String);

impl SymbolCode {
    pub fn parse(country: Country, input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        match country {
            Country::Kr => parse_kr_code(trimmed),
            Country::Us => parse_us_ticker(trimmed),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SymbolCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SymbolCode> for String {
    fn from(value: SymbolCode) -> Self {
        value.0
    }
}

fn parse_kr_code(trimmed: &str) -> Result<SymbolCode, ValidationError> {
    let valid = trimmed.len() == KR_CODE_LEN && trimmed.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(ValidationError::InvalidKrCode {
            value: trimmed.to_owned(),
        });
    }
    Ok(SymbolCode(trimmed.to_owned()))
}

fn parse_us_ticker(trimmed: &str) -> Result<SymbolCode, ValidationError> {
    let normalized = trimmed.to_ascii_uppercase();
    let len = normalized.chars().count();
    if len > MAX_TICKER_LEN {
        return Err(ValidationError::TickerTooLong {
            len,
            max: MAX_TICKER_LEN,
        });
    }

    let last = len - 1;
    for (index, ch) in normalized.chars().enumerate() {
        let separator = ch == '.' || ch == '-';
        let valid = ch.is_ascii_alphanumeric() || (separator && index != 0 && index != last);
        if !valid {
            return Err(ValidationError::TickerInvalidChar { ch, index });
        }
    }

    Ok(SymbolCode(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_korean_code() {
        let code = SymbolCode::parse(Country::Kr, " 005930 ").expect("valid code");
        assert_eq!(code.as_str(), "005930");
    }

    #[test]
    fn rejects_five_digit_korean_code() {
        let err = SymbolCode::parse(Country::Kr, "00593").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidKrCode { .. }));
    }

    #[test]
    fn rejects_alphanumeric_korean_code() {
        assert!(SymbolCode::parse(Country::Kr, "00593A").is_err());
    }

    #[test]
    fn uppercases_us_ticker() {
        let code = SymbolCode::parse(Country::Us, "aapl").expect("valid ticker");
        assert_eq!(code.as_str(), "AAPL");
    }

    #[test]
    fn keeps_share_class_separators() {
        assert_eq!(
            SymbolCode::parse(Country::Us, "brk.a").expect("valid").as_str(),
            "BRK.A"
        );
        assert_eq!(
            SymbolCode::parse(Country::Us, "BF-B").expect("valid").as_str(),
            "BF-B"
        );
    }

    #[test]
    fn rejects_dangling_separator_and_symbols() {
        assert!(matches!(
            SymbolCode::parse(Country::Us, "AAPL."),
            Err(ValidationError::TickerInvalidChar { .. })
        ));
        assert!(matches!(
            SymbolCode::parse(Country::Us, "AA$L"),
            Err(ValidationError::TickerInvalidChar { ch: '$', index: 2 })
        ));
    }

    #[test]
    fn rejects_whitespace_only_code() {
        assert_eq!(
            SymbolCode::parse(Country::Us, "   "),
            Err(ValidationError::EmptyCode)
        );
    }

    #[test]
    fn parses_country_labels() {
        assert_eq!("kr".parse::<Country>().expect("valid"), Country::Kr);
        assert_eq!("US".parse::<Country>().expect("valid"), Country::Us);
        assert!("JP".parse::<Country>().is_err());
    }
}
