use glam::IVec2;
use proxgrid_common::{MapSize, ObjectHandle, map_coord};
use proxgrid_kernel::{ObjectData, World};

use crate::bucket::{BucketIter, CellBucket, Chunk};
use crate::config::GridConfig;
use crate::coverage::{self, for_each_overlapping_cell};
use crate::error::IndexError;
use crate::grid::{CellCoord, CellGrid, GridDims};
use crate::slab::{HeapStats, SlabHeap};

/// Counters for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Add/remove passes that touched the grid.
    pub mutations: u64,
    /// Coverage cells skipped because the slab heap could not supply a chunk.
    pub alloc_failures: u64,
    /// Cells compacted by the garbage collector.
    pub compactions: u64,
    /// Chunks returned to the slab heap by compaction.
    pub chunks_freed: u64,
}

/// Uniform-grid proximity index over every live simulation object.
///
/// Each object sits in the bucket of every cell its range of influence
/// reaches, so a query at a point only has to walk one bucket. The index
/// holds handles, never objects; callers must remove an object before
/// destroying it.
#[derive(Debug)]
pub struct ProximityIndex {
    config: GridConfig,
    map: MapSize,
    cells: CellGrid<CellBucket>,
    heap: SlabHeap<Chunk>,
    /// Flat index of the next cell to compact.
    gc_cursor: usize,
    stats: IndexStats,
}

impl ProximityIndex {
    /// Build an empty index and reserve its chunk heap. The grid has no
    /// cells until the first [`reset`](Self::reset).
    pub fn new(config: GridConfig) -> Result<Self, IndexError> {
        config.validate()?;
        let heap = SlabHeap::new(
            config.heap_initial_chunks,
            config.heap_extension_chunks,
            config.heap_max_chunks,
        )?;
        let map = MapSize::new(0, 0);
        let cells = CellGrid::new(GridDims::for_map(map, config.grid_size_tiles));
        Ok(Self {
            config,
            map,
            cells,
            heap,
            gc_cursor: 0,
            stats: IndexStats::default(),
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn map_size(&self) -> MapSize {
        self.map
    }

    pub fn dims(&self) -> GridDims {
        self.cells.dims()
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Re-derive the whole grid from the world: resize to the current map,
    /// drop every entry and add every live object again.
    pub fn reset(&mut self, world: &World) {
        let _span = tracing::info_span!("grid_reset").entered();
        self.clear();
        self.map = world.map_size();
        self.cells = CellGrid::new(GridDims::for_map(self.map, self.config.grid_size_tiles));
        self.gc_cursor = 0;
        // Objects a shrinking map left behind keep whatever coverage still
        // reaches the grid.
        for (id, data) in world.objects() {
            let range = self.range_of(data);
            self.add_at(id, data.position, range);
        }
        tracing::debug!(
            width = self.cells.dims().width,
            height = self.cells.dims().height,
            objects = world.object_count(),
            chunks = self.heap.stats().in_use,
            "grid reset"
        );
    }

    /// Free every chunk, keeping the grid dimensions.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear(&mut self.heap);
        }
    }

    /// Tear the index down: clear the grid and release the chunk heap.
    pub fn shutdown(&mut self) {
        self.clear();
        self.cells = CellGrid::new(GridDims::for_map(MapSize::new(0, 0), self.config.grid_size_tiles));
        self.heap.destroy();
        tracing::debug!("grid shut down");
    }

    /// Range of influence of an object under this index's policy.
    pub fn range_of(&self, data: &ObjectData) -> i32 {
        coverage::range_of(&data.kind, &self.config.range, self.map)
    }

    /// Cells an object covers at its current position.
    pub fn coverage_of(&self, data: &ObjectData) -> Vec<CellCoord> {
        coverage::coverage(&self.dims(), data.position, self.range_of(data))
    }

    /// Add an object to every cell it covers. Returns the number of cells it
    /// was stored in, which is short of its coverage only if the chunk heap
    /// ran out.
    ///
    /// The object must stand on the grid; coverage near an edge is clipped.
    /// An off-grid position fails a debug assertion and stores nothing in
    /// release builds.
    pub fn add_object(&mut self, id: ObjectHandle, data: &ObjectData) -> usize {
        if !self.on_grid(data.position, "insert") {
            return 0;
        }
        let range = self.range_of(data);
        self.add_at(id, data.position, range)
    }

    /// Update an object that moved from `old`. Movement inside one tile
    /// leaves the grid untouched. Returns whether the grid was updated.
    pub fn move_object(&mut self, id: ObjectHandle, data: &ObjectData, old: IVec2) -> bool {
        let new = data.position;
        if map_coord(new.x) == map_coord(old.x) && map_coord(new.y) == map_coord(old.y) {
            return false;
        }
        let range = self.range_of(data);
        self.remove_at(id, old, range);
        if self.on_grid(new, "move") {
            self.add_at(id, new, range);
        }
        true
    }

    /// Remove an object from every cell it covers at its current position.
    /// Returns the number of entries removed.
    pub fn remove_object(&mut self, id: ObjectHandle, data: &ObjectData) -> usize {
        self.on_grid(data.position, "removal");
        let range = self.range_of(data);
        self.remove_at(id, data.position, range)
    }

    /// Whether `pos` lies in a grid cell. Asserts in debug builds.
    fn on_grid(&self, pos: IVec2, what: &str) -> bool {
        let dims = self.dims();
        let inside = dims.contains(dims.world_to_cell(pos));
        debug_assert!(
            inside,
            "grid {what} at {pos} is outside the {}x{} grid",
            dims.width,
            dims.height
        );
        inside
    }

    fn add_at(&mut self, id: ObjectHandle, position: IVec2, range: i32) -> usize {
        let dims = self.cells.dims();
        let Self {
            cells, heap, stats, ..
        } = &mut *self;
        let mut added = 0;
        for_each_overlapping_cell(&dims, position, range, |cell| {
            let Some(bucket) = cells.get_mut(cell) else {
                return;
            };
            match bucket.add(heap, id) {
                Ok(()) => added += 1,
                Err(err) => {
                    stats.alloc_failures += 1;
                    tracing::warn!(%id, x = cell.x, y = cell.y, error = %err, "grid insert skipped");
                }
            }
        });
        self.stats.mutations += 1;
        added
    }

    fn remove_at(&mut self, id: ObjectHandle, position: IVec2, range: i32) -> usize {
        let dims = self.cells.dims();
        let Self { cells, heap, .. } = &mut *self;
        let mut removed = 0;
        for_each_overlapping_cell(&dims, position, range, |cell| {
            if let Some(bucket) = cells.get_mut(cell) {
                if bucket.remove(heap, id) {
                    removed += 1;
                }
            }
        });
        self.stats.mutations += 1;
        removed
    }

    /// Begin a scan of the bucket holding `pos`: every object whose range
    /// of influence reaches that cell. Stale slots are skipped.
    ///
    /// Each call returns an independent cursor. It borrows the index, so
    /// the grid cannot change while a scan is in flight.
    pub fn start_iterate(&self, pos: IVec2) -> GridIter<'_> {
        let cell = self.dims().world_to_cell(pos);
        match self.cells.get(cell) {
            Some(bucket) => GridIter {
                cell,
                inner: bucket.iter(&self.heap),
            },
            None => {
                debug_assert!(
                    false,
                    "grid query at {pos} is outside the {}x{} grid",
                    self.dims().width,
                    self.dims().height
                );
                GridIter {
                    cell,
                    inner: BucketIter::empty(&self.heap),
                }
            }
        }
    }

    /// Like [`start_iterate`](Self::start_iterate), resolving handles
    /// against the world and dropping any whose object no longer exists.
    pub fn iterate_live<'a>(
        &'a self,
        pos: IVec2,
        world: &'a World,
    ) -> impl Iterator<Item = (ObjectHandle, &'a ObjectData)> + 'a {
        self.start_iterate(pos).filter_map(move |id| match world.get(id) {
            Some(data) => Some((id, data)),
            None => {
                tracing::trace!(%id, "skipping stale grid entry");
                None
            }
        })
    }

    /// Compact one cell and advance the rotating cursor, wrapping at the
    /// end of the grid. Call once per tick. Returns the chunks freed.
    pub fn garbage_collect(&mut self) -> usize {
        let count = self.cells.len();
        if count == 0 {
            return 0;
        }
        let index = self.gc_cursor % count;
        let freed = match self.cells.get_index_mut(index) {
            Some(bucket) => bucket.compact(&mut self.heap),
            None => 0,
        };
        self.gc_cursor = (index + 1) % count;
        self.stats.compactions += 1;
        self.stats.chunks_freed += freed as u64;
        if freed > 0 {
            let cell = self.dims().coord_of(index);
            tracing::trace!(x = cell.x, y = cell.y, freed, "compacted grid cell");
        }
        freed
    }

    /// Cell the next [`garbage_collect`](Self::garbage_collect) compacts.
    pub fn gc_cursor(&self) -> CellCoord {
        self.dims().coord_of(self.gc_cursor)
    }

    /// Compact one specific cell. Returns the chunks freed.
    pub fn compact_cell(&mut self, cell: CellCoord) -> usize {
        match self.cells.get_mut(cell) {
            Some(bucket) => bucket.compact(&mut self.heap),
            None => 0,
        }
    }

    /// Occupied slots in a cell, or `None` outside the grid.
    pub fn bucket_len(&self, cell: CellCoord) -> Option<usize> {
        self.cells.get(cell).map(|bucket| bucket.occupied(&self.heap))
    }

    /// Chunks allocated to a cell, or `None` outside the grid.
    pub fn chunk_count(&self, cell: CellCoord) -> Option<usize> {
        self.cells.get(cell).map(|bucket| bucket.chunk_count(&self.heap))
    }

    /// Every cell with a cursor over its bucket, row by row.
    pub fn buckets(&self) -> impl Iterator<Item = (CellCoord, BucketIter<'_>)> + '_ {
        self.cells
            .iter()
            .map(|(cell, bucket)| (cell, bucket.iter(&self.heap)))
    }

    /// Cells whose bucket holds `id`. A full scan, for tooling and tests.
    pub fn cells_containing(&self, id: ObjectHandle) -> Vec<CellCoord> {
        self.cells
            .iter()
            .filter(|(_, bucket)| bucket.contains(&self.heap, id))
            .map(|(cell, _)| cell)
            .collect()
    }
}

/// Cursor over one cell's bucket.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    cell: CellCoord,
    inner: BucketIter<'a>,
}

impl GridIter<'_> {
    /// The cell being scanned.
    pub fn cell(&self) -> CellCoord {
        self.cell
    }
}

impl Iterator for GridIter<'_> {
    type Item = ObjectHandle;

    fn next(&mut self) -> Option<ObjectHandle> {
        self.inner.next()
    }
}
