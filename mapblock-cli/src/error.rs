//! CLI error type.

use std::fmt;

use mapblock::MapError;

/// Errors surfaced to the user by a command.
#[derive(Debug)]
pub enum CliError {
    /// A library operation failed.
    Map(MapError),

    /// Configuration could not be read, validated or saved.
    Config(String),

    /// A command-line argument could not be interpreted.
    InvalidArgument(String),

    /// Failed to install the logging subscriber.
    Logging(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::Map(MapError::OutOfBounds { .. }) => 3,
            CliError::Map(MapError::MissingAsset { .. }) => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Map(e) => write!(f, "{}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Map(e) => Some(e),
            CliError::Config(_) | CliError::InvalidArgument(_) | CliError::Logging(_) => None,
        }
    }
}

impl From<MapError> for CliError {
    fn from(e: MapError) -> Self {
        match e {
            MapError::Config(msg) => CliError::Config(msg),
            MapError::Logging(msg) => CliError::Logging(msg),
            other => CliError::Map(other),
        }
    }
}
