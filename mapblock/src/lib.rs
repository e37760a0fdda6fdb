//! mapblock - Blockdata codec and metatile compositor
//!
//! This library decodes the bit-packed blockdata grid used by tile-based map
//! projects, resolves every cell against a primary and a secondary tileset
//! bundle, and composites the result into an RGBA raster. It also supports
//! rewriting the tile reference of a single cell while leaving its collision
//! and elevation bits untouched.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   words   ┌──────────┐
//! │  codec   │──────────►│   cell   │
//! └────┬─────┘           └────┬─────┘
//!      │ Grid                 │ fields
//!      ▼                      ▼
//! ┌──────────┐  resolve  ┌──────────┐
//! │  render  │──────────►│ metatile │
//! └────┬─────┘           └──────────┘
//!      │
//!      ▼
//! ┌──────────┐  bundles  ┌──────────┐
//! │ service  │──────────►│ tileset  │
//! └──────────┘           └──────────┘
//! ```
//!
//! The [`service::MapService`] ties a [`project::Project`] handle, a
//! [`tileset::TilesetResolver`] and a [`render::Compositor`] together and
//! exposes the operations used by the command-line front end.

pub mod cell;
pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod metatile;
pub mod project;
pub mod render;
pub mod service;
pub mod tileset;

pub use cell::{
    Cell, CellField, COLLISION_MASK, ELEVATION_MASK, SECONDARY_BANK_THRESHOLD,
    TILE_REFERENCE_MASK,
};
pub use codec::{decode, encode, Grid};
pub use error::{AssetRole, MapError, MapResult};
