//! Metatile indirection.
//!
//! A cell's tile reference is a global metatile id spanning two banks: ids
//! below [`SECONDARY_BANK_THRESHOLD`] live in the primary tileset, the rest
//! in the secondary tileset at `id - 512`. Each bank carries a definitions
//! blob of 16-byte records, one per metatile, holding eight [`TileSlot`]s.

use std::fmt;

use crate::cell::SECONDARY_BANK_THRESHOLD;
use crate::tileset::TilesetBundle;

/// Number of tile slots in one metatile.
pub const SLOTS_PER_METATILE: usize = 8;

/// Slots per layer; slots 0-3 are layer 0 and 4-7 are layer 1.
pub const SLOTS_PER_LAYER: usize = 4;

/// Size of one definition record in bytes.
pub const DEFINITION_BYTES: usize = SLOTS_PER_METATILE * 2;

const SLOT_TILE_INDEX_MASK: u16 = 0x03FF;
const SLOT_H_FLIP_BIT: u16 = 1 << 10;
const SLOT_V_FLIP_BIT: u16 = 1 << 11;

/// Tileset bank addressed by a tile reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    Primary,
    Secondary,
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bank::Primary => write!(f, "primary"),
            Bank::Secondary => write!(f, "secondary"),
        }
    }
}

/// Split a global tile reference into its bank and bank-local id.
///
/// # Examples
///
/// ```
/// use mapblock::metatile::{resolve, Bank};
///
/// assert_eq!(resolve(511), (Bank::Primary, 511));
/// assert_eq!(resolve(600), (Bank::Secondary, 88));
/// ```
pub fn resolve(tile_reference: u16) -> (Bank, u16) {
    if tile_reference >= SECONDARY_BANK_THRESHOLD {
        (Bank::Secondary, tile_reference - SECONDARY_BANK_THRESHOLD)
    } else {
        (Bank::Primary, tile_reference)
    }
}

/// Pick the bundle owning `tile_reference` and return it with the local id.
pub fn resolve_bundle<'a>(
    tile_reference: u16,
    primary: &'a TilesetBundle,
    secondary: &'a TilesetBundle,
) -> (&'a TilesetBundle, u16) {
    match resolve(tile_reference) {
        (Bank::Primary, local_id) => (primary, local_id),
        (Bank::Secondary, local_id) => (secondary, local_id),
    }
}

/// One sub-tile descriptor: an atlas tile index plus mirror flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileSlot(u16);

impl TileSlot {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The slot word as stored in the definitions blob.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Index of the 8x8 tile in the atlas.
    pub const fn tile_index(self) -> u16 {
        self.0 & SLOT_TILE_INDEX_MASK
    }

    /// Mirror the tile left to right (bit 10).
    pub const fn h_flip(self) -> bool {
        self.0 & SLOT_H_FLIP_BIT != 0
    }

    /// Mirror the tile top to bottom (bit 11), applied after `h_flip`.
    pub const fn v_flip(self) -> bool {
        self.0 & SLOT_V_FLIP_BIT != 0
    }
}

/// The eight slots of one metatile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetatileDefinition {
    slots: [TileSlot; SLOTS_PER_METATILE],
}

impl MetatileDefinition {
    /// Build a definition from slots in storage order: layer 0 first.
    pub fn new(slots: [TileSlot; SLOTS_PER_METATILE]) -> Self {
        Self { slots }
    }

    /// Slots in paint order: layer 0 then layer 1.
    pub fn slots(&self) -> &[TileSlot; SLOTS_PER_METATILE] {
        &self.slots
    }

    /// The four slots of `layer` (0 or 1).
    ///
    /// # Panics
    ///
    /// Panics if `layer > 1`.
    pub fn layer(&self, layer: usize) -> &[TileSlot] {
        let start = layer * SLOTS_PER_LAYER;
        &self.slots[start..start + SLOTS_PER_LAYER]
    }
}

/// Number of complete definitions in a blob.
pub fn definition_count(blob: &[u8]) -> usize {
    blob.len() / DEFINITION_BYTES
}

/// Decode the definition for `local_id`, or `None` when the blob does not
/// hold a complete record at that offset.
pub fn decode_definition(blob: &[u8], local_id: u16) -> Option<MetatileDefinition> {
    let offset = local_id as usize * DEFINITION_BYTES;
    let record = blob.get(offset..offset + DEFINITION_BYTES)?;

    let mut slots = [TileSlot::default(); SLOTS_PER_METATILE];
    for (slot, pair) in slots.iter_mut().zip(record.chunks_exact(2)) {
        *slot = TileSlot::new(u16::from_le_bytes([pair[0], pair[1]]));
    }
    Some(MetatileDefinition { slots })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_of(definitions: &[[u16; SLOTS_PER_METATILE]]) -> Vec<u8> {
        definitions
            .iter()
            .flat_map(|slots| slots.iter().flat_map(|s| s.to_le_bytes()))
            .collect()
    }

    #[test]
    fn test_resolve_threshold_edges() {
        assert_eq!(resolve(0), (Bank::Primary, 0));
        assert_eq!(resolve(511), (Bank::Primary, 511));
        assert_eq!(resolve(512), (Bank::Secondary, 0));
        assert_eq!(resolve(600), (Bank::Secondary, 88));
        assert_eq!(resolve(1023), (Bank::Secondary, 511));
    }

    #[test]
    fn test_tile_slot_bits() {
        let slot = TileSlot::new(0x0C00 | 0x123);
        assert_eq!(slot.tile_index(), 0x123);
        assert!(slot.h_flip());
        assert!(slot.v_flip());

        let slot = TileSlot::new(0x0400 | 7);
        assert!(slot.h_flip());
        assert!(!slot.v_flip());

        let slot = TileSlot::new(0x0800);
        assert_eq!(slot.tile_index(), 0);
        assert!(!slot.h_flip());
        assert!(slot.v_flip());
    }

    #[test]
    fn test_palette_bits_ignored() {
        // Bits 12-15 carry palette data and are not part of the slot layout.
        let slot = TileSlot::new(0xF005);
        assert_eq!(slot.tile_index(), 5);
        assert!(!slot.h_flip());
        assert!(!slot.v_flip());
    }

    #[test]
    fn test_decode_definition_order() {
        let blob = blob_of(&[[0; 8], [1, 2, 3, 4, 5, 6, 7, 0x0C08]]);
        let def = decode_definition(&blob, 1).unwrap();
        let indices: Vec<u16> = def.slots().iter().map(|s| s.tile_index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(def.slots()[7].h_flip());
        assert!(def.slots()[7].v_flip());
        assert_eq!(def.layer(0).len(), 4);
        assert_eq!(def.layer(1)[0].tile_index(), 5);
    }

    #[test]
    fn test_decode_definition_past_end_is_none() {
        let blob = blob_of(&[[0; 8]; 2]);
        assert!(decode_definition(&blob, 1).is_some());
        assert!(decode_definition(&blob, 2).is_none());
        assert!(decode_definition(&[], 0).is_none());
    }

    #[test]
    fn test_decode_definition_truncated_record_is_none() {
        let mut blob = blob_of(&[[0; 8]]);
        blob.extend_from_slice(&[0u8; 10]);
        assert_eq!(definition_count(&blob), 1);
        assert!(decode_definition(&blob, 1).is_none());
    }

    #[test]
    fn test_decode_definition_max_local_id() {
        assert!(decode_definition(&[0u8; 16], u16::MAX).is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_bank_resolution(reference in 0u16..1024) {
                let (bank, local_id) = resolve(reference);
                if reference < 512 {
                    prop_assert_eq!(bank, Bank::Primary);
                    prop_assert_eq!(local_id, reference);
                } else {
                    prop_assert_eq!(bank, Bank::Secondary);
                    prop_assert_eq!(local_id, reference - 512);
                }
            }

            #[test]
            fn test_definition_presence_matches_blob_length(
                len in 0usize..256,
                local_id in 0u16..32
            ) {
                let blob = vec![0u8; len];
                let defined = decode_definition(&blob, local_id).is_some();
                prop_assert_eq!(defined, local_id as usize * 16 + 16 <= len);
            }
        }
    }
}
