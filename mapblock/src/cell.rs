//! Bit-packed blockdata cells.
//!
//! Every grid position is one little-endian `u16`:
//!
//! ```text
//!  15      12 11  10 9                  0
//! ┌──────────┬──────┬────────────────────┐
//! │elevation │coll. │   tile reference   │
//! └──────────┴──────┴────────────────────┘
//! ```
//!
//! Field updates never touch bits outside the target field.

use std::fmt;

/// Mask of the tile-reference field (bits 0-9).
pub const TILE_REFERENCE_MASK: u16 = 0x03FF;

/// Mask of the collision field (bits 10-11).
pub const COLLISION_MASK: u16 = 0x0C00;

/// Mask of the elevation field (bits 12-15).
pub const ELEVATION_MASK: u16 = 0xF000;

/// Tile references at or above this value address the secondary bank.
pub const SECONDARY_BANK_THRESHOLD: u16 = 512;

/// One of the three sub-fields packed into a [`Cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellField {
    TileReference,
    Collision,
    Elevation,
}

impl CellField {
    /// All fields, low bits first.
    pub const ALL: [CellField; 3] = [
        CellField::TileReference,
        CellField::Collision,
        CellField::Elevation,
    ];

    /// Bit mask of this field within the raw word.
    pub const fn mask(self) -> u16 {
        match self {
            CellField::TileReference => TILE_REFERENCE_MASK,
            CellField::Collision => COLLISION_MASK,
            CellField::Elevation => ELEVATION_MASK,
        }
    }

    /// Position of the field's lowest bit.
    pub const fn shift(self) -> u32 {
        self.mask().trailing_zeros()
    }

    /// Largest value the field can hold.
    pub const fn max_value(self) -> u16 {
        self.mask() >> self.shift()
    }

    /// Field name as printed in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            CellField::TileReference => "tile_reference",
            CellField::Collision => "collision",
            CellField::Elevation => "elevation",
        }
    }
}

/// A single packed grid entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell(u16);

impl Cell {
    /// Wrap a raw 16-bit grid word.
    ///
    /// # Examples
    ///
    /// ```
    /// use mapblock::Cell;
    ///
    /// let cell = Cell::new(0x1C05);
    /// assert_eq!(cell.tile_reference(), 5);
    /// assert_eq!(cell.collision(), 3);
    /// assert_eq!(cell.elevation(), 1);
    /// ```
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Pack the three fields into a cell. Values wider than their field are
    /// truncated to the field width.
    pub fn from_fields(tile_reference: u16, collision: u16, elevation: u16) -> Self {
        Cell::default()
            .set_field(CellField::TileReference, tile_reference)
            .set_field(CellField::Collision, collision)
            .set_field(CellField::Elevation, elevation)
    }

    /// The packed word as stored on disk.
    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Extract a field value, shifted down to bit 0.
    #[inline(always)]
    pub const fn get_field(self, field: CellField) -> u16 {
        (self.0 & field.mask()) >> field.shift()
    }

    /// Replace one field, preserving every other bit.
    ///
    /// `value` is not range checked: bits that do not fit the field are
    /// dropped by the mask.
    #[inline(always)]
    pub const fn set_field(self, field: CellField, value: u16) -> Self {
        let packed = value.wrapping_shl(field.shift()) & field.mask();
        Self((self.0 & !field.mask()) | packed)
    }

    /// Global metatile reference, `0..=1023`.
    pub const fn tile_reference(self) -> u16 {
        self.get_field(CellField::TileReference)
    }

    /// Collision class, `0..=3`.
    pub const fn collision(self) -> u16 {
        self.get_field(CellField::Collision)
    }

    /// Elevation level, `0..=15`.
    pub const fn elevation(self) -> u16 {
        self.get_field(CellField::Elevation)
    }
}

impl From<u16> for Cell {
    fn from(raw: u16) -> Self {
        Cell(raw)
    }
}

impl From<Cell> for u16 {
    fn from(cell: Cell) -> Self {
        cell.0
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Free-function form of [`Cell::get_field`].
pub fn get_field(cell: Cell, field: CellField) -> u16 {
    cell.get_field(field)
}

/// Free-function form of [`Cell::set_field`].
pub fn set_field(cell: Cell, field: CellField, value: u16) -> Cell {
    cell.set_field(field, value)
}
