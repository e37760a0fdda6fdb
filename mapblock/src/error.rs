//! Error types for blockdata, tileset and project operations.
//!
//! Only conditions that abort an operation live here. Recoverable render
//! conditions (undefined metatiles, atlas overruns) are recorded in
//! [`crate::render::RenderReport`] instead.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for mapblock operations.
pub type MapResult<T> = Result<T, MapError>;

/// Which slot a tileset bundle fills for a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    Primary,
    Secondary,
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRole::Primary => write!(f, "primary"),
            AssetRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// Errors that can occur while decoding, rendering or editing a map.
#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed binary input.
    #[error("Malformed blockdata: {0}")]
    Format(String),

    /// A tileset bundle could not be located or loaded.
    #[error("Missing {role} tileset '{tileset}': {reason}")]
    MissingAsset {
        role: AssetRole,
        tileset: String,
        reason: String,
    },

    /// Edit coordinates fall outside the layout.
    #[error("Cell ({x}, {y}) is outside the {width}x{height} layout")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// Layout dimensions produce a canvas too large to allocate.
    #[error("Layout {width}x{height} is too large to render")]
    CanvasTooLarge { width: u32, height: u32 },

    /// Filesystem failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Image decode or encode failure.
    #[error("Image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    /// A project descriptor file is missing or malformed.
    #[error("Invalid descriptor {}: {reason}", path.display())]
    Descriptor { path: PathBuf, reason: String },

    /// The project has no map with this name.
    #[error("Unknown map: {0}")]
    UnknownMap(String),

    /// The project has no layout with this id.
    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),
}

impl MapError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MapError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a missing-asset error.
    pub fn missing_asset(
        role: AssetRole,
        tileset: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MapError::MissingAsset {
            role,
            tileset: tileset.into(),
            reason: reason.into(),
        }
    }
}
