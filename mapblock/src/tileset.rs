//! Tileset bundles and their resolution.
//!
//! A [`TilesetBundle`] pairs a tile atlas image with the binary metatile
//! definitions that index into it. Maps name their tilesets by identifier;
//! turning an identifier into files on disk is the job of a
//! [`TilesetResolver`], which keeps the renderer independent of any
//! particular project layout.
//!
//! # Resolvers
//!
//! - [`MappedTilesetResolver`] - exact identifier to path lookup
//! - [`DirectoryTilesetResolver`] - heuristic search of a tilesets folder

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{imageops, RgbaImage};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{AssetRole, MapError, MapResult};
use crate::metatile::{self, MetatileDefinition, DEFINITION_BYTES};

/// Edge length of an atlas tile in pixels.
pub const TILE_SIZE: u32 = 8;

/// Atlas tiles per row, used for index to coordinate conversion.
pub const ATLAS_TILES_PER_ROW: u32 = 16;

/// Atlas image file name inside a tileset folder.
pub const ATLAS_FILE_NAME: &str = "tiles.png";

/// Definitions file name inside a tileset folder.
pub const DEFINITIONS_FILE_NAME: &str = "metatiles.bin";

/// RGBA image divided into 8x8 tiles, 16 per row.
#[derive(Debug, Clone)]
pub struct TileAtlas {
    image: RgbaImage,
}

impl TileAtlas {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Pixel origin of atlas tile `index`.
    pub fn tile_origin(index: u16) -> (u32, u32) {
        let index = index as u32;
        (
            (index % ATLAS_TILES_PER_ROW) * TILE_SIZE,
            (index / ATLAS_TILES_PER_ROW) * TILE_SIZE,
        )
    }

    /// Copy out tile `index`, or `None` if it would read past the image.
    pub fn tile(&self, index: u16) -> Option<RgbaImage> {
        let (x, y) = Self::tile_origin(index);
        if y + TILE_SIZE > self.height() || x + TILE_SIZE > self.width() {
            return None;
        }
        Some(imageops::crop_imm(&self.image, x, y, TILE_SIZE, TILE_SIZE).to_image())
    }
}

/// Atlas plus metatile definitions for one tileset.
#[derive(Debug, Clone)]
pub struct TilesetBundle {
    name: String,
    atlas: TileAtlas,
    definitions: Vec<u8>,
}

impl TilesetBundle {
    pub fn new(name: impl Into<String>, atlas: TileAtlas, definitions: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            atlas,
            definitions,
        }
    }

    /// Load a bundle from its atlas and definitions files.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MissingAsset`] if either file is absent or cannot
    /// be decoded.
    pub fn load(name: &str, role: AssetRole, paths: &TilesetPaths) -> MapResult<Self> {
        for path in [&paths.atlas, &paths.definitions] {
            if !path.is_file() {
                return Err(MapError::missing_asset(
                    role,
                    name,
                    format!("{} not found", path.display()),
                ));
            }
        }

        let image = image::open(&paths.atlas).map_err(|e| {
            MapError::missing_asset(
                role,
                name,
                format!("cannot decode {}: {}", paths.atlas.display(), e),
            )
        })?;
        let definitions = fs::read(&paths.definitions).map_err(|e| {
            MapError::missing_asset(
                role,
                name,
                format!("cannot read {}: {}", paths.definitions.display(), e),
            )
        })?;

        if definitions.len() % DEFINITION_BYTES != 0 {
            warn!(
                tileset = name,
                bytes = definitions.len(),
                "Definitions blob ends in a partial record; trailing bytes are ignored"
            );
        }

        let bundle = Self::new(name, TileAtlas::new(image.to_rgba8()), definitions);
        debug!(
            tileset = name,
            %role,
            metatiles = bundle.metatile_count(),
            atlas_width = bundle.atlas.width(),
            atlas_height = bundle.atlas.height(),
            "Loaded tileset bundle"
        );
        Ok(bundle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atlas(&self) -> &TileAtlas {
        &self.atlas
    }

    /// Raw metatile definitions blob, 16 bytes per metatile.
    pub fn definitions(&self) -> &[u8] {
        &self.definitions
    }

    /// Number of complete metatile definitions.
    pub fn metatile_count(&self) -> usize {
        metatile::definition_count(&self.definitions)
    }

    /// Definition for a bank-local metatile id, if present.
    pub fn definition(&self, local_id: u16) -> Option<MetatileDefinition> {
        metatile::decode_definition(&self.definitions, local_id)
    }
}

/// File locations of one tileset's assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetPaths {
    pub atlas: PathBuf,
    pub definitions: PathBuf,
}

impl TilesetPaths {
    pub fn new(atlas: impl Into<PathBuf>, definitions: impl Into<PathBuf>) -> Self {
        Self {
            atlas: atlas.into(),
            definitions: definitions.into(),
        }
    }

    /// Standard file names inside a tileset folder.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(ATLAS_FILE_NAME), dir.join(DEFINITIONS_FILE_NAME))
    }
}

/// Maps a tileset identifier to the files of its bundle.
pub trait TilesetResolver {
    /// Locate the assets for `tileset_id`, or `None` if no match exists.
    fn locate(&self, tileset_id: &str) -> Option<TilesetPaths>;
}

/// Resolver backed by an explicit identifier table.
#[derive(Debug, Clone, Default)]
pub struct MappedTilesetResolver {
    entries: HashMap<String, TilesetPaths>,
}

impl MappedTilesetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tileset.
    pub fn with_tileset(mut self, tileset_id: impl Into<String>, paths: TilesetPaths) -> Self {
        self.entries.insert(tileset_id.into(), paths);
        self
    }

    /// Register a tileset in place.
    pub fn insert(&mut self, tileset_id: impl Into<String>, paths: TilesetPaths) {
        self.entries.insert(tileset_id.into(), paths);
    }
}

impl TilesetResolver for MappedTilesetResolver {
    fn locate(&self, tileset_id: &str) -> Option<TilesetPaths> {
        self.entries.get(tileset_id).cloned()
    }
}

/// Resolver that searches a tilesets folder by name.
///
/// `gTileset_SecretBaseRedCave` becomes `secret_base_red_cave`, which is
/// tried as `primary/<name>` and `secondary/<name>` first. Failing that the
/// tree is walked: a folder named exactly `<name>` wins, otherwise the
/// longest folder name that `<name>` ends with (`red_cave`).
#[derive(Debug, Clone)]
pub struct DirectoryTilesetResolver {
    tilesets_dir: PathBuf,
}

/// Prefix carried by tileset identifiers in layout descriptors.
pub const TILESET_ID_PREFIX: &str = "gTileset_";

/// Top-level folders tried before walking the tree.
const CATEGORY_DIRS: [&str; 2] = ["primary", "secondary"];

/// Capital letter starting a lowercase word: `BaseRed` -> `Base_Red`.
fn word_boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(.)([A-Z][a-z]+)").unwrap())
}

/// Lowercase or digit followed by a capital: `Building2F` -> `Building2_F`.
fn case_boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap())
}

impl DirectoryTilesetResolver {
    /// Search under `tilesets_dir`, normally `<root>/data/tilesets`.
    pub fn new(tilesets_dir: impl Into<PathBuf>) -> Self {
        Self {
            tilesets_dir: tilesets_dir.into(),
        }
    }

    pub fn tilesets_dir(&self) -> &Path {
        &self.tilesets_dir
    }

    /// Folder name an identifier is expected to live under.
    pub fn folder_name(&self, tileset_id: &str) -> String {
        let name = tileset_id.replace(TILESET_ID_PREFIX, "");
        let spaced = word_boundary_pattern().replace_all(&name, "${1}_${2}");
        case_boundary_pattern()
            .replace_all(&spaced, "${1}_${2}")
            .to_lowercase()
    }

    /// Find the folder holding a tileset's assets.
    pub fn find_dir(&self, tileset_id: &str) -> Option<PathBuf> {
        let name = self.folder_name(tileset_id);

        for category in CATEGORY_DIRS {
            let candidate = self.tilesets_dir.join(category).join(&name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        let mut best: Option<(usize, PathBuf)> = None;
        let mut stack = vec![self.tilesets_dir.clone()];
        while let Some(dir) = stack.pop() {
            let dir_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if dir_name == name {
                return Some(dir);
            }
            let longer = best.as_ref().map_or(true, |(len, _)| dir_name.len() > *len);
            if !dir_name.is_empty() && name.ends_with(&dir_name) && longer {
                best = Some((dir_name.len(), dir.clone()));
            }

            // Push in reverse so children are visited in sorted order.
            let mut children = subdirectories(&dir);
            children.sort();
            stack.extend(children.into_iter().rev());
        }

        best.map(|(_, dir)| dir)
    }
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}

impl TilesetResolver for DirectoryTilesetResolver {
    fn locate(&self, tileset_id: &str) -> Option<TilesetPaths> {
        let dir = self.find_dir(tileset_id)?;
        debug!(tileset = tileset_id, dir = %dir.display(), "Resolved tileset folder");
        Some(TilesetPaths::in_dir(&dir))
    }
}

/// The two bundles a map renders with.
#[derive(Debug, Clone)]
pub struct BundlePair {
    pub primary: TilesetBundle,
    pub secondary: TilesetBundle,
    /// Set when the secondary could not be loaded and the primary stands in.
    pub secondary_fallback: bool,
}

/// Resolve and load both bundles for a map.
///
/// A missing primary is fatal. A missing secondary is logged and replaced
/// by a copy of the primary.
pub fn load_bundle_pair(
    resolver: &dyn TilesetResolver,
    primary_id: &str,
    secondary_id: &str,
) -> MapResult<BundlePair> {
    let primary = load_role(resolver, primary_id, AssetRole::Primary)?;

    match load_role(resolver, secondary_id, AssetRole::Secondary) {
        Ok(secondary) => Ok(BundlePair {
            primary,
            secondary,
            secondary_fallback: false,
        }),
        Err(e) => {
            warn!(
                tileset = secondary_id,
                error = %e,
                "Could not load secondary tileset, substituting primary"
            );
            Ok(BundlePair {
                secondary: primary.clone(),
                primary,
                secondary_fallback: true,
            })
        }
    }
}

fn load_role(
    resolver: &dyn TilesetResolver,
    tileset_id: &str,
    role: AssetRole,
) -> MapResult<TilesetBundle> {
    let paths = resolver.locate(tileset_id).ok_or_else(|| {
        MapError::missing_asset(role, tileset_id, "no matching tileset folder")
    })?;
    TilesetBundle::load(tileset_id, role, &paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn write_tileset(dir: &Path, atlas_rows: u32, metatiles: usize) {
        fs::create_dir_all(dir).unwrap();
        let atlas = RgbaImage::from_pixel(128, atlas_rows * 8, Rgba([10, 20, 30, 255]));
        atlas.save(dir.join(ATLAS_FILE_NAME)).unwrap();
        fs::write(dir.join(DEFINITIONS_FILE_NAME), vec![0u8; metatiles * 16]).unwrap();
    }

    #[test]
    fn test_tile_origin() {
        assert_eq!(TileAtlas::tile_origin(0), (0, 0));
        assert_eq!(TileAtlas::tile_origin(15), (120, 0));
        assert_eq!(TileAtlas::tile_origin(16), (0, 8));
        assert_eq!(TileAtlas::tile_origin(33), (8, 16));
    }

    #[test]
    fn test_tile_bounds() {
        let atlas = TileAtlas::new(RgbaImage::new(128, 16));
        assert!(atlas.tile(0).is_some());
        assert!(atlas.tile(31).is_some());
        assert!(atlas.tile(32).is_none());
    }

    #[test]
    fn test_tile_bounds_narrow_atlas() {
        let atlas = TileAtlas::new(RgbaImage::new(16, 64));
        assert!(atlas.tile(1).is_some());
        assert!(atlas.tile(2).is_none());
    }

    #[test]
    fn test_tile_copies_pixels() {
        let mut image = RgbaImage::new(128, 8);
        image.put_pixel(8, 0, Rgba([1, 2, 3, 4]));
        let tile = TileAtlas::new(image).tile(1).unwrap();
        assert_eq!(tile.dimensions(), (8, 8));
        assert_eq!(*tile.get_pixel(0, 0), Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_bundle_definition_lookup() {
        let bundle = TilesetBundle::new("t", TileAtlas::new(RgbaImage::new(8, 8)), vec![0; 40]);
        assert_eq!(bundle.metatile_count(), 2);
        assert!(bundle.definition(1).is_some());
        assert!(bundle.definition(2).is_none());
    }

    #[test]
    fn test_folder_name_conversion() {
        let resolver = DirectoryTilesetResolver::new("/nonexistent");
        assert_eq!(resolver.folder_name("gTileset_General"), "general");
        assert_eq!(resolver.folder_name("gTileset_Petalburg"), "petalburg");
        assert_eq!(
            resolver.folder_name("gTileset_SecretBaseRedCave"),
            "secret_base_red_cave"
        );
        assert_eq!(resolver.folder_name("gTileset_Building2F"), "building2_f");
    }

    #[test]
    fn test_directory_resolver_category_match() {
        let temp = TempDir::new().unwrap();
        write_tileset(&temp.path().join("primary/general"), 1, 1);

        let resolver = DirectoryTilesetResolver::new(temp.path());
        let paths = resolver.locate("gTileset_General").unwrap();
        assert_eq!(paths, TilesetPaths::in_dir(&temp.path().join("primary/general")));
    }

    #[test]
    fn test_directory_resolver_nested_exact_match() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("secondary/groups/mauville_city")).unwrap();

        let resolver = DirectoryTilesetResolver::new(temp.path());
        assert_eq!(
            resolver.find_dir("gTileset_MauvilleCity"),
            Some(temp.path().join("secondary/groups/mauville_city"))
        );
    }

    #[test]
    fn test_directory_resolver_longest_suffix() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("secondary/secret_base/cave")).unwrap();
        fs::create_dir_all(temp.path().join("secondary/secret_base/red_cave")).unwrap();

        let resolver = DirectoryTilesetResolver::new(temp.path());
        assert_eq!(
            resolver.find_dir("gTileset_SecretBaseRedCave"),
            Some(temp.path().join("secondary/secret_base/red_cave"))
        );
    }

    #[test]
    fn test_directory_resolver_no_match() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("primary/general")).unwrap();

        let resolver = DirectoryTilesetResolver::new(temp.path());
        assert!(resolver.locate("gTileset_Lavaridge").is_none());
    }

    #[test]
    fn test_mapped_resolver() {
        let paths = TilesetPaths::new("/a/tiles.png", "/a/metatiles.bin");
        let resolver = MappedTilesetResolver::new().with_tileset("gTileset_A", paths.clone());
        assert_eq!(resolver.locate("gTileset_A"), Some(paths));
        assert_eq!(resolver.locate("gTileset_B"), None);
    }

    #[test]
    fn test_resolver_as_trait_object() {
        let resolvers: Vec<Box<dyn TilesetResolver>> = vec![
            Box::new(MappedTilesetResolver::new()),
            Box::new(DirectoryTilesetResolver::new("/nonexistent")),
        ];
        for resolver in &resolvers {
            assert!(resolver.locate("gTileset_General").is_none());
        }
    }

    #[test]
    fn test_bundle_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let paths = TilesetPaths::in_dir(temp.path());
        let result = TilesetBundle::load("gTileset_X", AssetRole::Primary, &paths);
        assert!(matches!(
            result,
            Err(MapError::MissingAsset {
                role: AssetRole::Primary,
                ..
            })
        ));
    }

    #[test]
    fn test_bundle_load_undecodable_atlas() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(ATLAS_FILE_NAME), b"not a png").unwrap();
        fs::write(temp.path().join(DEFINITIONS_FILE_NAME), [0u8; 16]).unwrap();
        let paths = TilesetPaths::in_dir(temp.path());
        let result = TilesetBundle::load("gTileset_X", AssetRole::Secondary, &paths);
        assert!(matches!(result, Err(MapError::MissingAsset { .. })));
    }

    #[test]
    fn test_bundle_load_success() {
        let temp = TempDir::new().unwrap();
        write_tileset(temp.path(), 2, 3);
        let bundle =
            TilesetBundle::load("gTileset_X", AssetRole::Primary, &TilesetPaths::in_dir(temp.path()))
                .unwrap();
        assert_eq!(bundle.name(), "gTileset_X");
        assert_eq!(bundle.metatile_count(), 3);
        assert_eq!(bundle.atlas().height(), 16);
    }

    #[test]
    fn test_load_bundle_pair_missing_primary_is_fatal() {
        let resolver = MappedTilesetResolver::new();
        let result = load_bundle_pair(&resolver, "gTileset_P", "gTileset_S");
        assert!(matches!(
            result,
            Err(MapError::MissingAsset {
                role: AssetRole::Primary,
                ..
            })
        ));
    }

    #[test]
    fn test_load_bundle_pair_secondary_fallback() {
        let temp = TempDir::new().unwrap();
        write_tileset(&temp.path().join("p"), 1, 2);
        let resolver = MappedTilesetResolver::new()
            .with_tileset("gTileset_P", TilesetPaths::in_dir(&temp.path().join("p")));

        let pair = load_bundle_pair(&resolver, "gTileset_P", "gTileset_S").unwrap();
        assert!(pair.secondary_fallback);
        assert_eq!(pair.secondary.name(), "gTileset_P");
        assert_eq!(pair.secondary.metatile_count(), 2);
    }

    #[test]
    fn test_load_bundle_pair_both_present() {
        let temp = TempDir::new().unwrap();
        write_tileset(&temp.path().join("p"), 1, 2);
        write_tileset(&temp.path().join("s"), 1, 5);
        let resolver = MappedTilesetResolver::new()
            .with_tileset("gTileset_P", TilesetPaths::in_dir(&temp.path().join("p")))
            .with_tileset("gTileset_S", TilesetPaths::in_dir(&temp.path().join("s")));

        let pair = load_bundle_pair(&resolver, "gTileset_P", "gTileset_S").unwrap();
        assert!(!pair.secondary_fallback);
        assert_eq!(pair.secondary.metatile_count(), 5);
    }
}
