use std::collections::{BTreeMap, BTreeSet, HashSet};

use proxgrid_common::ObjectHandle;
use proxgrid_index::{CellCoord, HeapStats, IndexStats, ProximityIndex};
use proxgrid_kernel::{ObjectData, World};

/// Grid inspector for developer tooling.
///
/// Read-only queries against the proximity index for debugging and
/// profiling. The integrity sweep walks every cell and every object, so it
/// belongs in debug builds and tests, not in the tick loop.
pub struct GridInspector;

impl GridInspector {
    /// Produce a summary of the index state.
    pub fn summary(index: &ProximityIndex) -> GridSummary {
        let mut occupied_cells = 0;
        let mut entries = 0;
        for (_, iter) in index.buckets() {
            let count = iter.count();
            if count > 0 {
                occupied_cells += 1;
                entries += count;
            }
        }
        let dims = index.dims();
        GridSummary {
            width: dims.width,
            height: dims.height,
            cell_units: dims.cell_units,
            occupied_cells,
            entries,
            heap: index.heap_stats(),
            stats: index.stats(),
        }
    }

    /// Compare the index against the world it should reflect.
    ///
    /// Every live object must be in exactly the cells its coverage names,
    /// once per cell, and no bucket may hold a handle that no longer
    /// resolves. Cells skipped because the chunk heap ran dry show up as
    /// missing.
    pub fn verify(index: &ProximityIndex, world: &World) -> IntegrityReport {
        let _span = tracing::debug_span!("grid_verify").entered();
        let mut report = IntegrityReport::default();
        let mut actual: BTreeMap<ObjectHandle, BTreeSet<CellCoord>> = BTreeMap::new();

        for (cell, iter) in index.buckets() {
            let mut seen = HashSet::new();
            for id in iter {
                if !seen.insert(id) {
                    report.duplicates.push((id, cell));
                }
                if world.contains(id) {
                    actual.entry(id).or_default().insert(cell);
                } else {
                    report.stale.push((id, cell));
                }
            }
        }

        for (id, data) in world.objects() {
            let expected: BTreeSet<CellCoord> = index.coverage_of(data).into_iter().collect();
            let held = actual.remove(&id).unwrap_or_default();
            report
                .missing
                .extend(expected.difference(&held).map(|cell| (id, *cell)));
            report
                .extra
                .extend(held.difference(&expected).map(|cell| (id, *cell)));
        }

        if !report.is_clean() {
            tracing::warn!(
                missing = report.missing.len(),
                extra = report.extra.len(),
                stale = report.stale.len(),
                duplicates = report.duplicates.len(),
                "grid integrity check failed"
            );
        }
        report
    }

    /// ASCII map of the cells an object covers: `@` for the cell holding
    /// the object, `#` for other covered cells, `.` elsewhere.
    pub fn coverage_map(index: &ProximityIndex, data: &ObjectData) -> String {
        let dims = index.dims();
        let covered: HashSet<CellCoord> = index.coverage_of(data).into_iter().collect();
        let home = dims.world_to_cell(data.position);
        let mut out = String::with_capacity((dims.width as usize + 1) * dims.height as usize);
        for y in 0..dims.height as i32 {
            for x in 0..dims.width as i32 {
                let cell = CellCoord::new(x, y);
                out.push(if cell == home {
                    '@'
                } else if covered.contains(&cell) {
                    '#'
                } else {
                    '.'
                });
            }
            out.push('\n');
        }
        out
    }
}

/// Summary of index state for the inspector.
#[derive(Debug, Clone)]
pub struct GridSummary {
    pub width: u32,
    pub height: u32,
    pub cell_units: i32,
    pub occupied_cells: usize,
    pub entries: usize,
    pub heap: HeapStats,
    pub stats: IndexStats,
}

impl std::fmt::Display for GridSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Grid: {}x{} cells of {} units, occupied={} entries={} chunks={}/{} \
             mutations={} alloc_failures={} compactions={} chunks_freed={}",
            self.width,
            self.height,
            self.cell_units,
            self.occupied_cells,
            self.entries,
            self.heap.in_use,
            self.heap.capacity,
            self.stats.mutations,
            self.stats.alloc_failures,
            self.stats.compactions,
            self.stats.chunks_freed,
        )
    }
}

/// Discrepancies found by [`GridInspector::verify`], as `(object, cell)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Covered cells whose bucket lacks the object.
    pub missing: Vec<(ObjectHandle, CellCoord)>,
    /// Buckets holding a live object outside its coverage.
    pub extra: Vec<(ObjectHandle, CellCoord)>,
    /// Buckets holding a handle that no longer resolves.
    pub stale: Vec<(ObjectHandle, CellCoord)>,
    /// Buckets holding the same handle more than once.
    pub duplicates: Vec<(ObjectHandle, CellCoord)>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.extra.is_empty()
            && self.stale.is_empty()
            && self.duplicates.is_empty()
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "integrity: ok");
        }
        write!(
            f,
            "integrity: missing={} extra={} stale={} duplicates={}",
            self.missing.len(),
            self.extra.len(),
            self.stale.len(),
            self.duplicates.len()
        )?;
        let first = self
            .stale
            .first()
            .or(self.missing.first())
            .or(self.extra.first())
            .or(self.duplicates.first());
        if let Some((id, cell)) = first {
            write!(f, " (first: {id} at {},{})", cell.x, cell.y)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use proxgrid_common::MapSize;
    use proxgrid_index::GridConfig;
    use proxgrid_kernel::splitmix64;

    fn setup() -> (ProximityIndex, World) {
        let world = World::new(MapSize::new(32, 32));
        let config = GridConfig {
            grid_size_tiles: 8,
            ..GridConfig::default()
        };
        let mut index = ProximityIndex::new(config).unwrap();
        index.reset(&world);
        (index, world)
    }

    #[test]
    fn summary_empty_index() {
        let (index, _) = setup();
        let summary = GridInspector::summary(&index);
        assert_eq!(summary.width, 4);
        assert_eq!(summary.occupied_cells, 0);
        assert_eq!(summary.entries, 0);
        assert!(format!("{summary}").contains("4x4 cells"));
    }

    #[test]
    fn summary_counts_entries() {
        let (mut index, mut world) = setup();
        world.spawn(ObjectData::droid(IVec2::new(100, 100), 100));
        world.spawn(ObjectData::droid(IVec2::new(2000, 2000), 2000));
        index.tick(&mut world);

        let summary = GridInspector::summary(&index);
        assert_eq!(summary.occupied_cells, 16);
        assert_eq!(summary.entries, 17);
        assert_eq!(summary.stats.compactions, 1);
    }

    #[test]
    fn churn_keeps_index_consistent() {
        let (mut index, mut world) = setup();
        let extent = world.map_size().world_extent();
        let mut seed = 11;
        let mut ids = Vec::new();

        for tick in 0..200 {
            seed = splitmix64(seed);
            let pos = IVec2::new(
                (seed % extent.x as u64) as i32,
                ((seed >> 24) % extent.y as u64) as i32,
            );
            match seed % 4 {
                0 | 1 => ids.push(world.spawn(ObjectData::droid(pos, ((seed >> 48) % 1500) as i32))),
                2 if !ids.is_empty() => {
                    let id = ids[(seed >> 8) as usize % ids.len()];
                    world.set_position(id, pos);
                }
                3 if !ids.is_empty() => {
                    let id = ids.swap_remove((seed >> 8) as usize % ids.len());
                    world.despawn(id);
                }
                _ => {}
            }
            world.step();
            index.tick(&mut world);

            if tick % 50 == 0 {
                let report = GridInspector::verify(&index, &world);
                assert!(report.is_clean(), "tick {tick}: {report}");
            }
        }
        let report = GridInspector::verify(&index, &world);
        assert!(report.is_clean(), "{report}");
    }

    #[test]
    fn verify_flags_destroyed_but_indexed_object() {
        let (mut index, mut world) = setup();
        let data = ObjectData::feature(IVec2::new(100, 100));
        let id = world.spawn(data);
        index.add_object(id, &data);
        world.drain_events();

        // Destroyed without removing it from the index first.
        world.despawn(id);
        let report = GridInspector::verify(&index, &world);
        assert!(!report.is_clean());
        assert_eq!(report.stale, vec![(id, CellCoord::new(0, 0))]);
        assert!(format!("{report}").contains("stale=1"));
    }

    #[test]
    fn verify_flags_missing_and_duplicate_entries() {
        let (mut index, mut world) = setup();
        let data = ObjectData::droid(IVec2::new(1000, 1000), 1200);
        let id = world.spawn(data);
        index.add_object(id, &data);
        index.add_object(id, &data);
        let report = GridInspector::verify(&index, &world);
        assert_eq!(report.duplicates.len(), index.coverage_of(&data).len());

        index.remove_object(id, &data);
        index.remove_object(id, &data);
        let report = GridInspector::verify(&index, &world);
        assert_eq!(report.missing.len(), index.coverage_of(&data).len());
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn coverage_map_marks_home_and_covered_cells() {
        let (index, _) = setup();
        // Center snaps to (64, 64); 1100 units reach the next cell over
        // in each axis but not the diagonal one.
        let map = GridInspector::coverage_map(&index, &ObjectData::droid(IVec2::ZERO, 1100));
        assert_eq!(map, "@#..\n#...\n....\n....\n");
    }
}
