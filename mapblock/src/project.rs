//! Project handle: map and layout descriptors plus blockdata storage.
//!
//! A project is a directory tree:
//!
//! ```text
//! <root>/
//! ├── data/maps/map_groups.json        group_order + map names per group
//! ├── data/maps/<MapName>/map.json     names the map's layout
//! ├── data/layouts/layouts.json        dimensions, blockdata path, tilesets
//! └── data/tilesets/...                tileset folders
//! ```
//!
//! The handle is passed explicitly to every operation; nothing here reads
//! the process working directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{self, Grid};
use crate::error::{MapError, MapResult};

/// Map header fields this library uses from `map.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Layout id, e.g. `LAYOUT_PETALBURG_CITY`.
    pub layout: String,
}

/// Layout fields this library uses from `layouts.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapLayout {
    #[serde(default)]
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Blockdata path relative to the project root.
    pub blockdata_filepath: PathBuf,
    pub primary_tileset: String,
    pub secondary_tileset: String,
}

impl MapLayout {
    /// Number of cells the layout dimensions call for.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Layout entries by id. An entry that failed to deserialize keeps the
/// reason so the error surfaces only when that layout is requested.
type LayoutTable = HashMap<String, Result<MapLayout, String>>;

/// Loaded project descriptors.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    map_names: Vec<String>,
    layouts: LayoutTable,
}

impl Project {
    /// Open the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Descriptor`] if `map_groups.json` or
    /// `layouts.json` is missing or is not valid JSON of the expected shape.
    /// A single malformed layout entry does not fail the open; it is logged
    /// and reported by [`Project::layout`] when requested.
    pub fn open(root: impl AsRef<Path>) -> MapResult<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|e| MapError::io(root, e))?;

        let groups_path = root.join("data").join("maps").join("map_groups.json");
        let layouts_path = root.join("data").join("layouts").join("layouts.json");

        let map_names = parse_map_groups(&groups_path, &read_json(&groups_path)?)?;
        let layouts = parse_layouts(&layouts_path, read_json(&layouts_path)?)?;
        for (id, entry) in &layouts {
            if let Err(reason) = entry {
                warn!(layout = %id, reason = %reason, "Skipping malformed layout entry");
            }
        }

        debug!(
            root = %root.display(),
            maps = map_names.len(),
            layouts = layouts.len(),
            "Opened project"
        );

        Ok(Self {
            root,
            map_names,
            layouts,
        })
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default tilesets folder, `<root>/data/tilesets`.
    pub fn tilesets_dir(&self) -> PathBuf {
        self.root.join("data").join("tilesets")
    }

    /// Map names in `group_order` order.
    pub fn map_names(&self) -> &[String] {
        &self.map_names
    }

    /// `data/maps/<map_name>/map.json` under the root.
    pub fn map_path(&self, map_name: &str) -> PathBuf {
        self.root
            .join("data")
            .join("maps")
            .join(map_name)
            .join("map.json")
    }

    /// Read a map's `map.json`.
    pub fn load_map(&self, map_name: &str) -> MapResult<MapHeader> {
        let path = self.map_path(map_name);
        if !path.is_file() {
            return Err(MapError::UnknownMap(map_name.to_string()));
        }
        let value = read_json(&path)?;
        serde_json::from_value(value).map_err(|e| MapError::Descriptor {
            path,
            reason: e.to_string(),
        })
    }

    /// Look up a layout by id.
    ///
    /// # Errors
    ///
    /// [`MapError::UnknownLayout`] if no entry has this id, or
    /// [`MapError::Descriptor`] if the entry exists but is malformed.
    pub fn layout(&self, layout_id: &str) -> MapResult<&MapLayout> {
        match self.layouts.get(layout_id) {
            Some(Ok(layout)) => Ok(layout),
            Some(Err(reason)) => Err(MapError::Descriptor {
                path: self.layouts_path(),
                reason: format!("layout {}: {}", layout_id, reason),
            }),
            None => Err(MapError::UnknownLayout(layout_id.to_string())),
        }
    }

    fn layouts_path(&self) -> PathBuf {
        self.root.join("data").join("layouts").join("layouts.json")
    }

    /// Layout used by a map.
    pub fn map_layout(&self, map_name: &str) -> MapResult<MapLayout> {
        let header = self.load_map(map_name)?;
        self.layout(&header.layout).cloned()
    }

    /// Absolute path of a layout's blockdata file.
    pub fn blockdata_path(&self, layout: &MapLayout) -> PathBuf {
        self.root.join(&layout.blockdata_filepath)
    }

    /// Read and decode a layout's blockdata.
    pub fn read_grid(&self, layout: &MapLayout) -> MapResult<Grid> {
        let path = self.blockdata_path(layout);
        let bytes = fs::read(&path).map_err(|e| MapError::io(&path, e))?;
        let grid = codec::decode(&bytes).map_err(|e| match e {
            MapError::Format(reason) => {
                MapError::Format(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;

        if grid.len() != layout.cell_count() {
            debug!(
                layout = %layout.id,
                cells = grid.len(),
                expected = layout.cell_count(),
                "Blockdata length differs from layout dimensions"
            );
        }
        Ok(grid)
    }

    /// Encode `grid` and overwrite the layout's blockdata file.
    pub fn write_grid(&self, layout: &MapLayout, grid: &Grid) -> MapResult<()> {
        let path = self.blockdata_path(layout);
        fs::write(&path, codec::encode(grid)).map_err(|e| MapError::io(&path, e))
    }
}

fn read_json(path: &Path) -> MapResult<Value> {
    let text = fs::read_to_string(path).map_err(|e| MapError::Descriptor {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| MapError::Descriptor {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_map_groups(path: &Path, groups: &Value) -> MapResult<Vec<String>> {
    let order = groups
        .get("group_order")
        .and_then(Value::as_array)
        .ok_or_else(|| MapError::Descriptor {
            path: path.to_path_buf(),
            reason: "missing 'group_order' array".to_string(),
        })?;

    let names = order
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|group| groups.get(group).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Ok(names)
}

/// Accepts either `{ "layouts": [ ... ] }` or an object keyed by layout id.
fn parse_layouts(path: &Path, value: Value) -> MapResult<LayoutTable> {
    let mut layouts = HashMap::new();
    match value {
        Value::Object(mut object) => {
            if let Some(Value::Array(entries)) = object.remove("layouts") {
                for entry in entries {
                    // Placeholder entries without an id are skipped.
                    let Some(id) = entry.get("id").and_then(Value::as_str) else {
                        continue;
                    };
                    let id = id.to_string();
                    let layout =
                        serde_json::from_value::<MapLayout>(entry).map_err(|e| e.to_string());
                    layouts.insert(id, layout);
                }
            } else {
                for (id, entry) in object {
                    let layout = serde_json::from_value::<MapLayout>(entry)
                        .map(|mut layout| {
                            if layout.id.is_empty() {
                                layout.id = id.clone();
                            }
                            layout
                        })
                        .map_err(|e| e.to_string());
                    layouts.insert(id, layout);
                }
            }
        }
        _ => {
            return Err(MapError::Descriptor {
                path: path.to_path_buf(),
                reason: "expected a JSON object".to_string(),
            })
        }
    }
    Ok(layouts)
}
