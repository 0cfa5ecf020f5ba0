//! Proximity index: uniform-grid broad phase over every live simulation object.
//!
//! # Invariants
//! - An object is in the bucket of every cell whose rectangle intersects the
//!   circle of its range of influence, centered on the middle of its tile.
//! - Removal nulls slots in place; compaction reclaims them one cell per tick.
//! - Chunk storage comes from a slab heap, never from the allocator directly
//!   on the per-tick path.
//!
//! Lifecycle: [`ProximityIndex::new`] once, [`ProximityIndex::reset`] whenever
//! the map changes, then add/move/remove as objects change and
//! [`ProximityIndex::garbage_collect`] once per tick.

mod bucket;
mod config;
mod coverage;
mod driver;
mod error;
mod grid;
mod index;
mod slab;

pub use bucket::{BucketIter, CHUNK_CAPACITY, CellBucket, Chunk};
pub use config::{GridConfig, RangePolicy};
pub use coverage::{circle_intersects_rect, for_each_overlapping_cell, range_of};
pub use error::{IndexError, SlabError};
pub use grid::{CellCoord, CellGrid, GridDims, MAX_GRID_SIZE_TILES, cell_units_for};
pub use index::{GridIter, IndexStats, ProximityIndex};
pub use slab::{ChunkId, HeapStats, SlabHeap};

pub fn crate_info() -> &'static str {
    "proxgrid-index v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("index"));
    }
}
