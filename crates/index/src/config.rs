use proxgrid_common::TILE_UNITS;
use proxgrid_kernel::SensorKind;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::grid::{MAX_GRID_SIZE_TILES, cell_units_for};

/// Range-of-influence policy: which objects reach how far.
///
/// These values are game balance, not structure, so they live in
/// configuration rather than in the coverage code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangePolicy {
    /// Smallest range any object gets, in world units. Objects without a
    /// sensor still occupy at least the cells around their own tile.
    pub min_range: i32,
    /// Sensor kinds whose range is the whole map.
    pub whole_map_sensors: Vec<SensorKind>,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            min_range: TILE_UNITS * 2,
            whole_map_sensors: vec![SensorKind::SatUplink],
        }
    }
}

/// Proximity index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length in map tiles.
    pub grid_size_tiles: u32,
    /// Chunks reserved up front by the slab heap.
    pub heap_initial_chunks: usize,
    /// Chunks added each time the slab heap runs dry.
    pub heap_extension_chunks: usize,
    /// Hard cap on slab heap growth. `None` grows until the allocator refuses.
    pub heap_max_chunks: Option<usize>,
    pub range: RangePolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size_tiles: 8,
            heap_initial_chunks: 256,
            heap_extension_chunks: 64,
            heap_max_chunks: None,
            range: RangePolicy::default(),
        }
    }
}

impl GridConfig {
    /// Cell edge length in world units, or `None` when `grid_size_tiles` is
    /// too large to express in world units.
    pub fn cell_units(&self) -> Option<i32> {
        cell_units_for(self.grid_size_tiles)
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.grid_size_tiles == 0 {
            return Err(IndexError::InvalidConfig(
                "grid_size_tiles must be positive".into(),
            ));
        }
        if self.grid_size_tiles > MAX_GRID_SIZE_TILES {
            return Err(IndexError::InvalidConfig(format!(
                "grid_size_tiles ({}) exceeds {MAX_GRID_SIZE_TILES}",
                self.grid_size_tiles
            )));
        }
        if self.heap_extension_chunks == 0 {
            return Err(IndexError::InvalidConfig(
                "heap_extension_chunks must be positive".into(),
            ));
        }
        if let Some(max) = self.heap_max_chunks {
            if max < self.heap_initial_chunks {
                return Err(IndexError::InvalidConfig(format!(
                    "heap_max_chunks ({max}) is below heap_initial_chunks ({})",
                    self.heap_initial_chunks
                )));
            }
        }
        if self.range.min_range <= 0 {
            return Err(IndexError::InvalidConfig(
                "range.min_range must be positive".into(),
            ));
        }
        Ok(())
    }
}
