//! Shared setup for commands that operate on a project.
//!
//! `CliRunner` reads the configuration file once, installs logging and
//! builds a [`MapService`] for the selected project.

use std::path::PathBuf;

use image::Rgba;
use mapblock::config::{config_file_path, ConfigFile};
use mapblock::logging::{init_logging, LoggingGuard};
use mapblock::project::Project;
use mapblock::render::Compositor;
use mapblock::service::MapService;
use mapblock::tileset::DirectoryTilesetResolver;
use tracing::info;

use crate::error::CliError;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub verbose: bool,
}

impl GlobalArgs {
    /// Configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }
}

pub struct CliRunner {
    config: ConfigFile,
    project_root: PathBuf,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration and install logging.
    pub fn new(args: &GlobalArgs) -> Result<Self, CliError> {
        let config = ConfigFile::load_from(&args.config_path())?;

        let level = if args.verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let logging = init_logging(level, config.logging.file.as_deref())?;

        let project_root = args
            .project
            .clone()
            .unwrap_or_else(|| config.project_root());

        Ok(Self {
            config,
            project_root,
            _logging: logging,
        })
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            project = %self.project_root.display(),
            "mapblock starting"
        );
    }

    /// Open the project and wire up tileset lookup and rendering settings.
    pub fn create_service(&self) -> Result<MapService, CliError> {
        let project = Project::open(&self.project_root)?;
        let tilesets_dir = self
            .config
            .project
            .tilesets_dir
            .clone()
            .unwrap_or_else(|| project.tilesets_dir());

        let compositor = Compositor::new().with_background(Rgba(self.config.render.background));
        Ok(MapService::new(project, Box::new(DirectoryTilesetResolver::new(tilesets_dir)))
            .with_compositor(compositor))
    }
}
