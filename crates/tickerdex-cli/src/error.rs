use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickerdex_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Core(#[from] tickerdex_core::CoreError),

    #[error(transparent)]
    Source(#[from] tickerdex_core::SourceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Core(tickerdex_core::CoreError::Validation(_)) => 2,
            Self::Core(tickerdex_core::CoreError::Overlay { .. }) => 2,
            Self::Core(tickerdex_core::CoreError::Serialization(_)) => 4,
            Self::Core(_) => 10,
            Self::Source(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_categories_to_exit_codes() {
        assert_eq!(CliError::Command(String::from("bad")).exit_code(), 2);
        assert_eq!(
            CliError::Validation(tickerdex_core::ValidationError::EmptyPriority).exit_code(),
            2
        );
        assert_eq!(
            CliError::Source(tickerdex_core::SourceError::transient("down")).exit_code(),
            3
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(CliError::Io(io).exit_code(), 10);
        let overlay = tickerdex_core::CoreError::Overlay {
            path: String::from("config/overlay.json"),
            message: String::from("expected array"),
        };
        assert_eq!(CliError::Core(overlay).exit_code(), 2);
    }
}
