//! Set-block command - replace one cell's tile reference.

use crate::commands::common::describe_cell;
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalArgs};

/// Arguments for the set-block command.
pub struct SetBlockArgs {
    pub map: String,
    pub x: i64,
    pub y: i64,
    pub tile_reference: u16,
}

/// Run the set-block command.
pub fn run(global: &GlobalArgs, args: SetBlockArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(global)?;
    runner.log_startup("set-block");
    let service = runner.create_service()?;

    let edit = service.edit_cell(&args.map, args.x, args.y, args.tile_reference)?;

    println!("{} ({}, {})", args.map, edit.x, edit.y);
    println!("  before: {}", describe_cell(edit.before));
    println!("  after:  {}", describe_cell(edit.after));
    Ok(())
}
