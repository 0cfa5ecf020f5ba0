use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Bit shift converting world units to tile coordinates.
pub const TILE_SHIFT: u32 = 7;

/// Size of one map tile in world units.
pub const TILE_UNITS: i32 = 1 << TILE_SHIFT;

/// Convert a world coordinate to the tile coordinate containing it.
#[inline]
pub fn map_coord(world: i32) -> i32 {
    world >> TILE_SHIFT
}

/// Convert a tile coordinate to the world coordinate of its top-left corner.
#[inline]
pub fn world_coord(tile: i32) -> i32 {
    tile << TILE_SHIFT
}

/// Snap a world position to the center of the tile it occupies.
#[inline]
pub fn tile_center(pos: IVec2) -> IVec2 {
    IVec2::new(
        world_coord(map_coord(pos.x)) + TILE_UNITS / 2,
        world_coord(map_coord(pos.y)) + TILE_UNITS / 2,
    )
}

/// Generation-checked reference to a simulation object.
///
/// The index is a slot in the owning world's object table; the generation
/// is bumped every time that slot is reused, so a handle held past its
/// object's destruction no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle {
    pub index: u32,
    pub generation: u32,
}

impl ObjectHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Map dimensions in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl MapSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Map extent in world units.
    pub fn world_extent(&self) -> IVec2 {
        IVec2::new(
            world_coord(self.width as i32),
            world_coord(self.height as i32),
        )
    }

    /// Whether a world position lies on the map.
    pub fn contains(&self, pos: IVec2) -> bool {
        let extent = self.world_extent();
        pos.x >= 0 && pos.y >= 0 && pos.x < extent.x && pos.y < extent.y
    }
}

impl Default for MapSize {
    fn default() -> Self {
        Self::new(64, 64)
    }
}
