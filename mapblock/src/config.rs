//! INI configuration file.
//!
//! Settings live in `<config dir>/mapblock/config.ini`:
//!
//! ```ini
//! [project]
//! root = /home/me/pokeemerald
//! tilesets_dir = /home/me/pokeemerald/data/tilesets
//!
//! [render]
//! background = 0,0,0,255
//!
//! [logging]
//! level = info
//! file = /tmp/mapblock.log
//! ```
//!
//! A missing file yields the defaults. Command-line arguments override any
//! value read here.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;

use crate::error::{MapError, MapResult};

/// Default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default render background, opaque black.
pub const DEFAULT_BACKGROUND: [u8; 4] = [0, 0, 0, 255];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Path of the user configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapblock")
        .join("config.ini")
}

/// `[project]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Project root; the current directory when unset.
    pub root: Option<PathBuf>,
    /// Tilesets folder; `<root>/data/tilesets` when unset.
    pub tilesets_dir: Option<PathBuf>,
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// RGBA colour left in unpainted pixels.
    pub background: [u8; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    /// Also write logs to this file when set.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub project: ProjectSettings,
    pub render: RenderSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> MapResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, returning defaults if the file does not exist.
    pub fn load_from(path: &Path) -> MapResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)
            .map_err(|e| MapError::Config(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)
                    .map_err(|e| MapError::Config(format!("{}: {}", path.display(), e)))?;
            }
        }
        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> MapResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> MapResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MapError::io(parent, e))?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini.write_to_file(path).map_err(|e| MapError::io(path, e))
    }

    /// Project root, falling back to the current directory.
    pub fn project_root(&self) -> PathBuf {
        self.project
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Every settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ProjectRoot,
    ProjectTilesetsDir,
    RenderBackground,
    LoggingLevel,
    LoggingFile,
}

/// Error for an unrecognized `section.key` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfigKey(pub String);

impl fmt::Display for UnknownConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown configuration key '{}'", self.0)
    }
}

impl std::error::Error for UnknownConfigKey {}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ProjectRoot,
            ConfigKey::ProjectTilesetsDir,
            ConfigKey::RenderBackground,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingFile,
        ]
    }

    /// INI section holding the key.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ProjectRoot | ConfigKey::ProjectTilesetsDir => "project",
            ConfigKey::RenderBackground => "render",
            ConfigKey::LoggingLevel | ConfigKey::LoggingFile => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ProjectRoot => "root",
            ConfigKey::ProjectTilesetsDir => "tilesets_dir",
            ConfigKey::RenderBackground => "background",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn path_str(path: &Option<PathBuf>) -> String {
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        }

        match self {
            ConfigKey::ProjectRoot => path_str(&config.project.root),
            ConfigKey::ProjectTilesetsDir => path_str(&config.project.tilesets_dir),
            ConfigKey::RenderBackground => format_background(config.render.background),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => path_str(&config.logging.file),
        }
    }

    /// Validate and store `value`. An empty value clears optional paths.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), String> {
        let value = value.trim();
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));

        match self {
            ConfigKey::ProjectRoot => config.project.root = optional_path(),
            ConfigKey::ProjectTilesetsDir => config.project.tilesets_dir = optional_path(),
            ConfigKey::RenderBackground => config.render.background = parse_background(value)?,
            ConfigKey::LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(format!(
                        "invalid log level '{}', expected one of: {}",
                        value,
                        LOG_LEVELS.join(", ")
                    ));
                }
                config.logging.level = level;
            }
            ConfigKey::LoggingFile => config.logging.file = optional_path(),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = UnknownConfigKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s.trim().to_lowercase())
            .ok_or_else(|| UnknownConfigKey(s.to_string()))
    }
}

/// Parse `r,g,b,a` into an RGBA array.
pub fn parse_background(value: &str) -> Result<[u8; 4], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "invalid background '{}', expected r,g,b,a",
            value
        ));
    }

    let mut rgba = [0u8; 4];
    for (channel, part) in rgba.iter_mut().zip(&parts) {
        *channel = part
            .parse()
            .map_err(|_| format!("invalid colour channel '{}' in '{}'", part, value))?;
    }
    Ok(rgba)
}

/// Format an RGBA array as `r,g,b,a`.
pub fn format_background(rgba: [u8; 4]) -> String {
    format!("{},{},{},{}", rgba[0], rgba[1], rgba[2], rgba[3])
}
