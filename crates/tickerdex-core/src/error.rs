use thiserror::Error;

/// Validation and contract errors exposed by `tickerdex-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol code cannot be empty")]
    EmptyCode,
    #[error("symbol name cannot be empty")]
    EmptyName,
    #[error("korean code must be exactly 6 ASCII digits: '{value}'")]
    InvalidKrCode { value: String },
    #[error("us ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("us ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid country '{value}', expected one of KR, US")]
    InvalidCountry { value: String },
    #[error("invalid source '{value}'")]
    InvalidSource { value: String },
    #[error("invalid segment '{value}', expected one of korea, korea_etf, us")]
    InvalidSegment { value: String },

    #[error("retry policy requires at least one attempt")]
    ZeroAttempts,
    #[error("source priority list must contain at least one source")]
    EmptyPriority,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("overlay file '{path}' is invalid: {message}")]
    Overlay { path: String, message: String },

    #[error("failed to persist artifact '{path}': {message}")]
    Artifact { path: String, message: String },
}

/// Failures of the per-symbol detail lookup.
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("symbol is required")]
    EmptySymbol,

    #[error("no history source supports symbol '{symbol}'")]
    Unsupported { symbol: String },

    #[error("no price history found for '{symbol}'")]
    NoData { symbol: String },

    #[error(transparent)]
    Source(#[from] crate::listing_source::SourceError),
}
