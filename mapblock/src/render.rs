//! Metatile compositing.
//!
//! The [`Compositor`] walks a grid row by row, resolves every cell to a
//! metatile definition and paints its eight 8x8 slots into the cell's 16x16
//! footprint:
//!
//! ```text
//!  cell footprint        slot order
//! ┌────┬────┐          layer 0: 0 1    layer 1: 4 5
//! │ 0/4│ 1/5│                   2 3             6 7
//! ├────┼────┤
//! │ 2/6│ 3/7│          layer 1 is painted over layer 0
//! └────┴────┘
//! ```
//!
//! Conditions that only affect part of the image (a grid shorter than its
//! layout, an undefined metatile, an atlas tile past the image edge) do not
//! fail the render. Each one is recorded as a [`RenderSkip`] in the
//! [`RenderReport`] so callers can inspect exactly what was left blank.

use image::{imageops, Rgba, RgbaImage};
use tracing::debug;

use crate::codec::Grid;
use crate::error::{MapError, MapResult};
use crate::metatile::{self, Bank, TileSlot, SLOTS_PER_LAYER};
use crate::tileset::{TileAtlas, TilesetBundle, TILE_SIZE};

/// Edge length of one rendered cell in pixels.
pub const CELL_PIXELS: u32 = 16;

/// Largest canvas the compositor will allocate, in pixels (256 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// Default canvas colour: opaque black.
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Why part of a render was left unpainted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cell's linear index is past the end of the grid.
    GridIndexOutOfRange { index: usize, grid_len: usize },
    /// The resolved local id has no record in the definitions blob.
    UndefinedMetatile { bank: Bank, local_id: u16 },
    /// The slot's atlas tile lies outside the atlas image.
    AtlasOutOfBounds { bank: Bank, tile_index: u16 },
}

/// One skipped cell or slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSkip {
    pub x: u32,
    pub y: u32,
    /// Slot within the metatile, `None` when the whole cell was skipped.
    pub slot: Option<u8>,
    pub reason: SkipReason,
}

/// Result of painting a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Painted,
    Skipped(SkipReason),
}

/// Tally of what a render painted and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Grid positions visited (`width * height`).
    pub cells_total: usize,
    /// Cells that resolved to a definition.
    pub cells_painted: usize,
    /// Slots composited onto the canvas.
    pub slots_painted: usize,
    pub skips: Vec<RenderSkip>,
    /// The secondary bundle was replaced by the primary.
    pub secondary_fallback: bool,
}

impl RenderReport {
    /// Cells past the end of a short grid.
    pub fn grid_faults(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::GridIndexOutOfRange { .. }))
    }

    /// Cells whose metatile has no definition.
    pub fn undefined_metatiles(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::UndefinedMetatile { .. }))
    }

    /// Slots whose atlas tile lies outside the image.
    pub fn atlas_faults(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::AtlasOutOfBounds { .. }))
    }

    /// True when every cell and slot was painted.
    pub fn is_complete(&self) -> bool {
        self.skips.is_empty()
    }

    fn count(&self, predicate: impl Fn(&SkipReason) -> bool) -> usize {
        self.skips.iter().filter(|s| predicate(&s.reason)).count()
    }
}

/// Rendered raster plus its report.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: RgbaImage,
    pub report: RenderReport,
}

/// Paints grids of metatiles onto an RGBA canvas.
#[derive(Debug, Clone)]
pub struct Compositor {
    background: Rgba<u8>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the colour unpainted pixels keep.
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    /// Render a `width` x `height` layout into a `(width*16) x (height*16)`
    /// image.
    ///
    /// # Arguments
    ///
    /// * `grid` - Cells in row-major order; a short grid leaves its missing
    ///   cells unpainted
    /// * `width`, `height` - Layout dimensions in cells
    /// * `primary`, `secondary` - Bundles for references below and at or
    ///   above 512
    ///
    /// # Errors
    ///
    /// Returns [`MapError::CanvasTooLarge`] if the canvas would exceed
    /// [`MAX_CANVAS_PIXELS`]. Per-cell problems never fail the render.
    pub fn render(
        &self,
        grid: &Grid,
        width: u32,
        height: u32,
        primary: &TilesetBundle,
        secondary: &TilesetBundle,
    ) -> MapResult<RenderOutput> {
        let (canvas_width, canvas_height) = canvas_size(width, height)?;
        let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, self.background);
        let mut report = RenderReport {
            cells_total: width as usize * height as usize,
            ..Default::default()
        };

        for y in 0..height {
            for x in 0..width {
                self.render_cell(&mut canvas, &mut report, grid, x, y, width, primary, secondary);
            }
        }

        debug!(
            width,
            height,
            cells_painted = report.cells_painted,
            slots_painted = report.slots_painted,
            skipped = report.skips.len(),
            "Composited grid"
        );

        Ok(RenderOutput {
            image: canvas,
            report,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn render_cell(
        &self,
        canvas: &mut RgbaImage,
        report: &mut RenderReport,
        grid: &Grid,
        x: u32,
        y: u32,
        width: u32,
        primary: &TilesetBundle,
        secondary: &TilesetBundle,
    ) {
        let index = y as usize * width as usize + x as usize;
        let Some(cell) = grid.get(index) else {
            report.skips.push(RenderSkip {
                x,
                y,
                slot: None,
                reason: SkipReason::GridIndexOutOfRange {
                    index,
                    grid_len: grid.len(),
                },
            });
            return;
        };

        let (bank, _) = metatile::resolve(cell.tile_reference());
        let (bundle, local_id) = metatile::resolve_bundle(cell.tile_reference(), primary, secondary);
        let Some(definition) = bundle.definition(local_id) else {
            report.skips.push(RenderSkip {
                x,
                y,
                slot: None,
                reason: SkipReason::UndefinedMetatile { bank, local_id },
            });
            return;
        };

        report.cells_painted += 1;
        for (i, slot) in definition.slots().iter().enumerate() {
            let sub = (i % SLOTS_PER_LAYER) as u32;
            let dest_x = x * CELL_PIXELS + (sub % 2) * TILE_SIZE;
            let dest_y = y * CELL_PIXELS + (sub / 2) * TILE_SIZE;

            match paint_slot(canvas, bundle.atlas(), *slot, dest_x, dest_y, bank) {
                SlotOutcome::Painted => report.slots_painted += 1,
                SlotOutcome::Skipped(reason) => report.skips.push(RenderSkip {
                    x,
                    y,
                    slot: Some(i as u8),
                    reason,
                }),
            }
        }
    }
}

/// Pixel dimensions of the canvas for a `width` x `height` layout.
///
/// Rejects layouts whose pixel size overflows `u32` or whose area exceeds
/// [`MAX_CANVAS_PIXELS`].
pub fn canvas_size(width: u32, height: u32) -> MapResult<(u32, u32)> {
    let too_large = || MapError::CanvasTooLarge { width, height };
    let canvas_width = width.checked_mul(CELL_PIXELS).ok_or_else(too_large)?;
    let canvas_height = height.checked_mul(CELL_PIXELS).ok_or_else(too_large)?;
    if canvas_width as u64 * canvas_height as u64 > MAX_CANVAS_PIXELS {
        return Err(too_large());
    }
    Ok((canvas_width, canvas_height))
}

/// Composite one slot's atlas tile at `(dest_x, dest_y)`.
///
/// Horizontal mirroring is applied before vertical. Source pixels are alpha
/// blended, so fully transparent pixels leave the canvas untouched.
pub fn paint_slot(
    canvas: &mut RgbaImage,
    atlas: &TileAtlas,
    slot: TileSlot,
    dest_x: u32,
    dest_y: u32,
    bank: Bank,
) -> SlotOutcome {
    let Some(mut tile) = atlas.tile(slot.tile_index()) else {
        return SlotOutcome::Skipped(SkipReason::AtlasOutOfBounds {
            bank,
            tile_index: slot.tile_index(),
        });
    };

    if slot.h_flip() {
        imageops::flip_horizontal_in_place(&mut tile);
    }
    if slot.v_flip() {
        imageops::flip_vertical_in_place(&mut tile);
    }

    imageops::overlay(canvas, &tile, dest_x as i64, dest_y as i64);
    SlotOutcome::Painted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// Atlas of `rows` rows; tile 0 red, tile 1 green, tile 2 transparent,
    /// tile 3 red with a green top-left pixel, everything else clear.
    fn test_atlas(rows: u32) -> TileAtlas {
        let mut image = RgbaImage::from_pixel(128, rows * 8, CLEAR);
        for y in 0..8 {
            for x in 0..8 {
                image.put_pixel(x, y, RED);
                image.put_pixel(8 + x, y, GREEN);
                image.put_pixel(24 + x, y, RED);
            }
        }
        image.put_pixel(24, 0, GREEN);
        TileAtlas::new(image)
    }

    fn blob(definitions: &[[u16; 8]]) -> Vec<u8> {
        definitions
            .iter()
            .flat_map(|slots| slots.iter().flat_map(|s| s.to_le_bytes()))
            .collect()
    }

    fn bundle(name: &str, definitions: &[[u16; 8]]) -> TilesetBundle {
        TilesetBundle::new(name, test_atlas(2), blob(definitions))
    }

    fn single(raw: u16) -> Grid {
        Grid::from_cells(vec![Cell::new(raw)])
    }

    #[test]
    fn test_output_dimensions() {
        let primary = bundle("p", &[[0; 8]]);
        let grid = Grid::filled(6, Cell::default());
        let output = Compositor::new().render(&grid, 3, 2, &primary, &primary).unwrap();
        assert_eq!(output.image.dimensions(), (48, 32));
        assert_eq!(output.report.cells_total, 6);
        assert_eq!(output.report.cells_painted, 6);
        assert_eq!(output.report.slots_painted, 48);
        assert!(output.report.is_complete());
    }

    #[test]
    fn test_sub_tile_placement() {
        // layer 0: red, green / transparent, red
        let primary = bundle("p", &[[0, 1, 2, 0, 2, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        let image = &output.image;
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(8, 0), GREEN);
        assert_eq!(*image.get_pixel(0, 8), DEFAULT_BACKGROUND);
        assert_eq!(*image.get_pixel(15, 15), RED);
    }

    #[test]
    fn test_layer_one_overrides_layer_zero() {
        let primary = bundle("p", &[[0, 0, 0, 0, 1, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        // opaque layer 1 wins
        assert_eq!(*output.image.get_pixel(0, 0), GREEN);
        // transparent layer 1 leaves layer 0
        assert_eq!(*output.image.get_pixel(8, 0), RED);
        assert_eq!(*output.image.get_pixel(8, 8), RED);
    }

    #[test]
    fn test_transparent_pixels_keep_background() {
        let primary = bundle("p", &[[2; 8]]);
        let compositor = Compositor::new().with_background(Rgba([1, 2, 3, 255]));
        let output = compositor.render(&single(0), 1, 1, &primary, &primary).unwrap();
        assert!(output.image.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
        assert_eq!(output.report.slots_painted, 8);
    }

    #[test]
    fn test_horizontal_flip() {
        let primary = bundle("p", &[[0x0400 | 3, 2, 2, 2, 2, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        assert_eq!(*output.image.get_pixel(7, 0), GREEN);
        assert_eq!(*output.image.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_vertical_flip() {
        let primary = bundle("p", &[[0x0800 | 3, 2, 2, 2, 2, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        assert_eq!(*output.image.get_pixel(0, 7), GREEN);
        assert_eq!(*output.image.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_both_flips() {
        let primary = bundle("p", &[[0x0C00 | 3, 2, 2, 2, 2, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        assert_eq!(*output.image.get_pixel(7, 7), GREEN);
        assert_eq!(*output.image.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_secondary_bank_selected() {
        let primary = bundle("p", &[[0; 8]]);
        let secondary = bundle("s", &[[1; 8]]);
        let output = Compositor::new().render(&single(512), 1, 1, &primary, &secondary).unwrap();
        assert_eq!(*output.image.get_pixel(0, 0), GREEN);
    }

    #[test]
    fn test_undefined_metatile_is_skipped() {
        let primary = bundle("p", &[[0; 8]]);
        let output = Compositor::new().render(&single(1), 1, 1, &primary, &primary).unwrap();
        assert!(output.image.pixels().all(|p| *p == DEFAULT_BACKGROUND));
        assert_eq!(output.report.undefined_metatiles(), 1);
        assert_eq!(
            output.report.skips[0],
            RenderSkip {
                x: 0,
                y: 0,
                slot: None,
                reason: SkipReason::UndefinedMetatile {
                    bank: Bank::Primary,
                    local_id: 1
                },
            }
        );
    }

    #[test]
    fn test_short_grid_records_faults() {
        let primary = bundle("p", &[[0; 8]]);
        let grid = Grid::filled(3, Cell::default());
        let output = Compositor::new().render(&grid, 2, 2, &primary, &primary).unwrap();
        assert_eq!(output.report.cells_painted, 3);
        assert_eq!(output.report.grid_faults(), 1);
        assert_eq!(*output.image.get_pixel(20, 20), DEFAULT_BACKGROUND);
        assert_eq!(*output.image.get_pixel(4, 20), RED);
    }

    #[test]
    fn test_atlas_out_of_bounds_slot_skipped() {
        // 2-row atlas holds tiles 0..32; tile 40 is past the bottom edge.
        let primary = bundle("p", &[[0, 40, 0, 0, 2, 2, 2, 2]]);
        let output = Compositor::new().render(&single(0), 1, 1, &primary, &primary).unwrap();
        assert_eq!(output.report.atlas_faults(), 1);
        assert_eq!(output.report.slots_painted, 7);
        assert_eq!(output.report.skips[0].slot, Some(1));
        assert_eq!(*output.image.get_pixel(8, 0), DEFAULT_BACKGROUND);
        assert_eq!(*output.image.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_paint_slot_outcome() {
        let atlas = test_atlas(1);
        let mut canvas = RgbaImage::from_pixel(8, 8, CLEAR);
        assert_eq!(
            paint_slot(&mut canvas, &atlas, TileSlot::new(1), 0, 0, Bank::Primary),
            SlotOutcome::Painted
        );
        assert_eq!(*canvas.get_pixel(3, 3), GREEN);
        assert_eq!(
            paint_slot(&mut canvas, &atlas, TileSlot::new(16), 0, 0, Bank::Secondary),
            SlotOutcome::Skipped(SkipReason::AtlasOutOfBounds {
                bank: Bank::Secondary,
                tile_index: 16
            })
        );
    }

    #[test]
    fn test_overflowing_width_is_rejected() {
        let primary = bundle("p", &[[0; 8]]);
        let result = Compositor::new().render(&Grid::new(), 1 << 28, 0, &primary, &primary);
        assert!(matches!(
            result,
            Err(MapError::CanvasTooLarge {
                width: 268_435_456,
                height: 0
            })
        ));
    }

    #[test]
    fn test_oversized_area_is_rejected() {
        let primary = bundle("p", &[[0; 8]]);
        let result = Compositor::new().render(&Grid::new(), 4096, 4096, &primary, &primary);
        assert!(matches!(result, Err(MapError::CanvasTooLarge { .. })));
    }

    #[test]
    fn test_canvas_size_limits() {
        assert_eq!(canvas_size(3, 2).unwrap(), (48, 32));
        assert_eq!(canvas_size(512, 512).unwrap(), (8192, 8192));
        assert!(canvas_size(u32::MAX, 1).is_err());
        assert!(canvas_size(1, 1 << 28).is_err());
        assert!(canvas_size(513, 512).is_err());
    }

    #[test]
    fn test_empty_layout() {
        let primary = bundle("p", &[[0; 8]]);
        let output = Compositor::new().render(&Grid::new(), 0, 0, &primary, &primary).unwrap();
        assert_eq!(output.image.dimensions(), (0, 0));
        assert_eq!(output.report, RenderReport::default());
    }
}
