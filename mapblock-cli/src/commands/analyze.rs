//! Analyze command - report secondary block usage or dump a region.

use mapblock::cell::SECONDARY_BANK_THRESHOLD;
use mapblock::service::MapService;

use crate::commands::common::{describe_cell, Region};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the analyze command.
pub struct AnalyzeArgs {
    pub map: String,
    pub region: Option<Region>,
}

/// Run the analyze command.
pub fn run(global: &GlobalArgs, args: AnalyzeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("analyze");
    let service = runner.create_service()?;

    let layout = service.project().map_layout(&args.map)?;
    println!(
        "{}: {}x{} ({} / {})",
        args.map, layout.width, layout.height, layout.primary_tileset, layout.secondary_tileset
    );

    match args.region {
        Some(region) => print_region(&service, &args.map, region),
        None => print_usage(&service, &args.map),
    }
}

fn print_usage(service: &MapService, map: &str) -> Result<(), CliError> {
    let usage = service.secondary_block_usage(map)?;
    if usage.is_empty() {
        println!("No secondary-bank blocks used");
        return Ok(());
    }

    println!();
    println!("Secondary blocks (reference / local id / count)");
    for entry in usage {
        println!(
            "  {:#06x}  {:>4}  {}",
            entry.tile_reference,
            entry.tile_reference - SECONDARY_BANK_THRESHOLD,
            entry.count
        );
    }
    Ok(())
}

fn print_region(
    service: &MapService,
    map: &str,
    region: Region,
) -> Result<(), CliError> {
    let rows = service.region(map, region.x, region.y, region.width, region.height)?;
    if rows.is_empty() {
        println!("Region lies outside the map");
        return Ok(());
    }

    println!();
    for (dy, row) in rows.iter().enumerate() {
        for (dx, cell) in row.iter().enumerate() {
            let (x, y) = (region.x as usize + dx, region.y as usize + dy);
            match cell {
                Some(cell) => println!("  ({:>3}, {:>3}) {}", x, y, describe_cell(*cell)),
                None => println!("  ({:>3}, {:>3}) <missing>", x, y),
            }
        }
    }
    Ok(())
}
