//! Single-cell edits.
//!
//! Only the tile-reference field is rewritten; collision and elevation bits
//! survive bit-for-bit.

use crate::cell::{CellField, TILE_REFERENCE_MASK};
use crate::codec::Grid;
use crate::error::{MapError, MapResult};

/// Return a copy of `grid` with the tile reference at `(x, y)` replaced.
///
/// `new_ref` is masked to 10 bits. Coordinates are signed so that callers
/// can pass unchecked user input straight through.
///
/// # Errors
///
/// Returns [`MapError::OutOfBounds`] if `(x, y)` lies outside the
/// `width` x `height` layout, or if the grid holds fewer cells than the
/// layout requires at that position. `grid` is never modified.
///
/// # Examples
///
/// ```
/// use mapblock::editor::set_tile_reference;
/// use mapblock::{Cell, Grid};
///
/// let grid = Grid::filled(100, Cell::new(0x1005));
/// let edited = set_tile_reference(&grid, 10, 10, 2, 3, 0x20).unwrap();
/// assert_eq!(edited.get(32), Some(Cell::new(0x1020)));
/// assert!(set_tile_reference(&grid, 10, 10, -1, 0, 0x20).is_err());
/// ```
pub fn set_tile_reference(
    grid: &Grid,
    width: u32,
    height: u32,
    x: i64,
    y: i64,
    new_ref: u16,
) -> MapResult<Grid> {
    let out_of_bounds = || MapError::OutOfBounds {
        x,
        y,
        width,
        height,
    };

    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return Err(out_of_bounds());
    }

    let index = y as usize * width as usize + x as usize;
    let current = grid.get(index).ok_or_else(out_of_bounds)?;

    let mut edited = grid.clone();
    edited.set(
        index,
        current.set_field(CellField::TileReference, new_ref & TILE_REFERENCE_MASK),
    );
    Ok(edited)
}
