//! Blockdata encoding and decoding.
//!
//! A blockdata file is a headerless run of little-endian `u16` cells in
//! row-major order. Dimensions come from the layout descriptor, so the codec
//! itself only deals in flat cell sequences.

use crate::cell::Cell;
use crate::error::{MapError, MapResult};

/// Bytes per encoded cell.
pub const CELL_BYTES: usize = 2;

/// Row-major sequence of cells for one layout.
///
/// The length is whatever the file contained; it is not assumed to equal
/// `width * height`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap cells already in row-major order.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// A grid of `len` copies of `cell`.
    pub fn filled(len: usize, cell: Cell) -> Self {
        Self {
            cells: vec![cell; len],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at a linear index.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Cell at `(x, y)` for a grid `width` cells wide, or `None` when the
    /// linear index runs past the stored cells.
    pub fn cell_at(&self, x: u32, y: u32, width: u32) -> Option<Cell> {
        let index = y as usize * width as usize + x as usize;
        self.get(index)
    }

    pub(crate) fn set(&mut self, index: usize, cell: Cell) -> bool {
        match self.cells.get_mut(index) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

impl FromIterator<Cell> for Grid {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Decode a byte buffer into a grid.
///
/// # Errors
///
/// Returns [`MapError::Format`] when the buffer has an odd length.
///
/// # Examples
///
/// ```
/// use mapblock::{decode, encode};
///
/// let grid = decode(&[0x05, 0x10, 0x58, 0x02]).unwrap();
/// assert_eq!(grid.get(0).unwrap().raw(), 0x1005);
/// assert_eq!(grid.get(1).unwrap().tile_reference(), 600);
/// assert_eq!(encode(&grid), vec![0x05, 0x10, 0x58, 0x02]);
/// ```
pub fn decode(bytes: &[u8]) -> MapResult<Grid> {
    if bytes.len() % CELL_BYTES != 0 {
        return Err(MapError::Format(format!(
            "blockdata length {} is not a multiple of {}",
            bytes.len(),
            CELL_BYTES
        )));
    }

    Ok(bytes
        .chunks_exact(CELL_BYTES)
        .map(|pair| Cell::new(u16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Encode a grid back to its on-disk form.
pub fn encode(grid: &Grid) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(grid.len() * CELL_BYTES);
    for cell in grid.iter() {
        bytes.extend_from_slice(&cell.raw().to_le_bytes());
    }
    bytes
}
