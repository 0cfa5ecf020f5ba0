//! Shared types used across the proxgrid crates.

mod types;

pub use types::{
    MapSize, ObjectHandle, TILE_SHIFT, TILE_UNITS, map_coord, tile_center, world_coord,
};
