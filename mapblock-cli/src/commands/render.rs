//! Render command - composite a map into an image file.

use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the render command.
pub struct RenderArgs {
    pub map: String,
    pub output: PathBuf,
}

/// Run the render command.
pub fn run(global: &GlobalArgs, args: RenderArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("render");
    let service = runner.create_service()?;

    let report = service.render_map(&args.map, &args.output)?;

    println!("Rendered {} to {}", args.map, args.output.display());
    println!(
        "  Cells painted: {}/{}",
        report.cells_painted, report.cells_total
    );
    if report.secondary_fallback {
        println!("  Secondary tileset missing, primary used in its place");
    }
    if !report.is_complete() {
        println!("  Undefined metatiles: {}", report.undefined_metatiles());
        println!("  Atlas faults:        {}", report.atlas_faults());
        println!("  Missing grid cells:  {}", report.grid_faults());
    }
    Ok(())
}
