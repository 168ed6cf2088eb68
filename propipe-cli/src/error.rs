//! CLI error type.

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Library error.
    #[error(transparent)]
    Pipe(#[from] propipe::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] propipe::ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to render config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
