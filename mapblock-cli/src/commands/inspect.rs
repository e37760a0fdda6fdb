//! Inspect command - decode a raw blockdata file without a project.

use std::fs;
use std::path::PathBuf;

use mapblock::codec::{decode, encode, Grid};
use mapblock::MapError;

use crate::error::CliError;

/// Arguments for the inspect command.
pub struct InspectArgs {
    pub file: PathBuf,
    pub width: u32,
    /// Print full field breakdown instead of the reference table.
    pub fields: bool,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    if args.width == 0 {
        return Err(CliError::InvalidArgument(
            "--width must be at least 1".to_string(),
        ));
    }

    let bytes = fs::read(&args.file).map_err(|e| MapError::io(&args.file, e))?;
    let grid = decode(&bytes).map_err(|e| match e {
        MapError::Format(reason) => {
            MapError::Format(format!("{}: {}", args.file.display(), reason))
        }
        other => other,
    })?;

    let rows = grid.len().div_ceil(args.width as usize);
    println!(
        "{}: {} cells, width {} ({} rows)",
        args.file.display(),
        grid.len(),
        args.width,
        rows
    );
    if grid.len() % args.width as usize != 0 {
        println!("  warning: cell count is not a multiple of the width");
    }
    println!(
        "  re-encode: {}",
        if encode(&grid) == bytes {
            "identical"
        } else {
            "DIFFERS"
        }
    );
    println!();

    for line in format_grid(&grid, args.width, args.fields) {
        println!("{}", line);
    }
    Ok(())
}

/// Lay out a grid row by row, as tile references or full fields.
pub fn format_grid(grid: &Grid, width: u32, fields: bool) -> Vec<String> {
    let cells = grid.cells();
    cells
        .chunks(width as usize)
        .enumerate()
        .map(|(y, row)| {
            let columns: Vec<String> = row
                .iter()
                .map(|cell| {
                    if fields {
                        format!(
                            "{:03x}:{}:{:x}",
                            cell.tile_reference(),
                            cell.collision(),
                            cell.elevation()
                        )
                    } else {
                        format!("{:03x}", cell.tile_reference())
                    }
                })
                .collect();
            format!("{:>4} | {}", y, columns.join(" "))
        })
        .collect()
}
