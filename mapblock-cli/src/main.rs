//! mapblock CLI - render, edit and inspect blockdata maps.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::analyze::AnalyzeArgs;
use commands::common::{parse_tile_reference, Region};
use commands::config::ConfigCommands;
use commands::edit::SetBlockArgs;
use commands::inspect::InspectArgs;
use commands::render::RenderArgs;
use error::CliError;
use runner::GlobalArgs;

#[derive(Parser)]
#[command(name = "mapblock")]
#[command(version, about = "Render and edit metatile blockdata maps", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project root (overrides project.root from the config file)
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a map to an image file (format from the extension)
    Render {
        /// Map name as listed in map_groups.json
        map: String,

        /// Output image path, e.g. town.png
        output: PathBuf,
    },

    /// Replace the tile reference of one cell, keeping collision and elevation
    SetBlock {
        /// Map name
        map: String,

        /// Column
        #[arg(allow_hyphen_values = true)]
        x: i64,

        /// Row
        #[arg(allow_hyphen_values = true)]
        y: i64,

        /// New tile reference: decimal, 0x, 0o or 0b (0..=1023; larger values
        /// are rejected, not masked to 10 bits)
        #[arg(value_parser = parse_tile_reference)]
        metatile: u16,
    },

    /// Show secondary-bank block usage, or the cells of a region
    Analyze {
        /// Map name
        map: String,

        /// Dump the cells of the window X,Y,W,H instead
        #[arg(long, value_name = "X,Y,W,H")]
        region: Option<Region>,
    },

    /// Decode a raw blockdata file and print its cells
    Inspect {
        /// Blockdata file
        file: PathBuf,

        /// Cells per row
        #[arg(long)]
        width: u32,

        /// Print collision and elevation alongside the reference
        #[arg(long)]
        fields: bool,
    },

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config,
        project: cli.project,
        verbose: cli.verbose,
    };

    let result = run(&global, cli.command);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(global: &GlobalArgs, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Render { map, output } => {
            commands::render::run(global, RenderArgs { map, output })
        }
        Commands::SetBlock {
            map,
            x,
            y,
            metatile,
        } => commands::edit::run(
            global,
            SetBlockArgs {
                map,
                x,
                y,
                tile_reference: metatile,
            },
        ),
        Commands::Analyze { map, region } => {
            commands::analyze::run(global, AnalyzeArgs { map, region })
        }
        Commands::Inspect {
            file,
            width,
            fields,
        } => commands::inspect::run(InspectArgs {
            file,
            width,
            fields,
        }),
        Commands::Config { command } => commands::config::run(global, command),
    }
}
