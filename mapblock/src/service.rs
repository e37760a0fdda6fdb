//! Map operations over a project.
//!
//! [`MapService`] is the entry point for front ends: it resolves a map name
//! to its layout, reads the blockdata, loads tilesets through the configured
//! [`TilesetResolver`] and runs the compositor or editor.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::cell::{Cell, SECONDARY_BANK_THRESHOLD};
use crate::editor;
use crate::error::{MapError, MapResult};
use crate::project::Project;
use crate::render::{Compositor, RenderOutput, RenderReport};
use crate::tileset::{self, TilesetResolver};

/// Outcome of a single-cell edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEdit {
    pub x: u32,
    pub y: u32,
    pub before: Cell,
    pub after: Cell,
}

/// How often a tile reference occurs in a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUsage {
    pub tile_reference: u16,
    pub count: usize,
}

/// Render, edit and inspect maps of one project.
pub struct MapService {
    project: Project,
    resolver: Box<dyn TilesetResolver>,
    compositor: Compositor,
}

impl MapService {
    /// Create a service with the default compositor.
    ///
    /// # Arguments
    ///
    /// * `project` - Opened project whose maps and layouts are served
    /// * `resolver` - Maps the layout's tileset ids to asset files
    pub fn new(project: Project, resolver: Box<dyn TilesetResolver>) -> Self {
        Self {
            project,
            resolver,
            compositor: Compositor::default(),
        }
    }

    /// Replace the compositor, e.g. to change the background colour.
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Render a map to an in-memory raster.
    ///
    /// # Errors
    ///
    /// Fails if the map, its layout, its blockdata or its primary tileset
    /// cannot be loaded, or if the layout is too large to render. A missing
    /// secondary tileset is not an error; the report's `secondary_fallback`
    /// flag is set instead.
    pub fn render(&self, map_name: &str) -> MapResult<RenderOutput> {
        let layout = self.project.map_layout(map_name)?;
        let grid = self.project.read_grid(&layout)?;
        let bundles = tileset::load_bundle_pair(
            self.resolver.as_ref(),
            &layout.primary_tileset,
            &layout.secondary_tileset,
        )?;

        let mut output = self.compositor.render(
            &grid,
            layout.width,
            layout.height,
            &bundles.primary,
            &bundles.secondary,
        )?;
        output.report.secondary_fallback = bundles.secondary_fallback;
        Ok(output)
    }

    /// Render a map and save it to `output`; the format follows the file
    /// extension.
    pub fn render_map(&self, map_name: &str, output: &Path) -> MapResult<RenderReport> {
        let rendered = self.render(map_name)?;
        rendered
            .image
            .save(output)
            .map_err(|source| MapError::Image {
                path: output.to_path_buf(),
                source,
            })?;

        let report = rendered.report;
        if !report.is_complete() {
            warn!(
                map = map_name,
                undefined_metatiles = report.undefined_metatiles(),
                atlas_faults = report.atlas_faults(),
                grid_faults = report.grid_faults(),
                "Render left cells or slots unpainted"
            );
        }
        info!(
            map = map_name,
            output = %output.display(),
            cells = report.cells_painted,
            "Rendered map"
        );
        Ok(report)
    }

    /// Replace the tile reference at `(x, y)` and rewrite the blockdata file.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::OutOfBounds`] for coordinates outside the layout;
    /// the file is left untouched in that case.
    pub fn edit_cell(&self, map_name: &str, x: i64, y: i64, new_ref: u16) -> MapResult<CellEdit> {
        let layout = self.project.map_layout(map_name)?;
        let grid = self.project.read_grid(&layout)?;
        let edited = editor::set_tile_reference(&grid, layout.width, layout.height, x, y, new_ref)?;

        // set_tile_reference validated the coordinates and the index.
        let (x, y) = (x as u32, y as u32);
        let index = y as usize * layout.width as usize + x as usize;
        let edit = CellEdit {
            x,
            y,
            before: grid.get(index).unwrap_or_default(),
            after: edited.get(index).unwrap_or_default(),
        };

        self.project.write_grid(&layout, &edited)?;
        info!(
            map = map_name,
            x,
            y,
            before = %edit.before,
            after = %edit.after,
            "Updated cell"
        );
        Ok(edit)
    }

    /// Secondary-bank tile references in a map, most frequent first.
    pub fn secondary_block_usage(&self, map_name: &str) -> MapResult<Vec<BlockUsage>> {
        let layout = self.project.map_layout(map_name)?;
        let grid = self.project.read_grid(&layout)?;

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for cell in grid.iter() {
            let reference = cell.tile_reference();
            if reference >= SECONDARY_BANK_THRESHOLD {
                *counts.entry(reference).or_default() += 1;
            }
        }

        let mut usage: Vec<BlockUsage> = counts
            .into_iter()
            .map(|(tile_reference, count)| BlockUsage {
                tile_reference,
                count,
            })
            .collect();
        usage.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.tile_reference.cmp(&b.tile_reference))
        });
        Ok(usage)
    }

    /// Cells of the `width` x `height` window at `(x, y)`, clipped to the
    /// layout. Positions past the end of the stored grid are `None`.
    pub fn region(
        &self,
        map_name: &str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> MapResult<Vec<Vec<Option<Cell>>>> {
        let layout = self.project.map_layout(map_name)?;
        let grid = self.project.read_grid(&layout)?;

        let x_end = x.saturating_add(width).min(layout.width);
        let y_end = y.saturating_add(height).min(layout.height);

        Ok((y..y_end)
            .map(|row| {
                (x..x_end)
                    .map(|col| grid.cell_at(col, row, layout.width))
                    .collect()
            })
            .collect())
    }
}
