//! Per-tick glue between the world's lifecycle events and the index.

use proxgrid_kernel::{World, WorldEvent};

use crate::index::ProximityIndex;

impl ProximityIndex {
    /// Apply one lifecycle event.
    ///
    /// `MapResized` rebuilds the grid from the world as it is now, so events
    /// must be applied as they happen for that case to be exact. Batches go
    /// through [`tick`](Self::tick), which handles it.
    pub fn apply_event(&mut self, world: &World, event: &WorldEvent) {
        match event {
            WorldEvent::Spawned { id, data } => {
                self.add_object(*id, data);
            }
            WorldEvent::Despawned { id, data } => {
                self.remove_object(*id, data);
            }
            WorldEvent::Moved { id, old, data } => {
                self.move_object(*id, data, *old);
            }
            WorldEvent::MapResized { .. } => self.reset(world),
            WorldEvent::Stepped { .. } => {}
        }
    }

    /// Bring the index up to date with everything the world logged since
    /// the last tick, then compact one cell. Returns the number of events
    /// consumed.
    pub fn tick(&mut self, world: &mut World) -> usize {
        let events = world.drain_events();
        if events
            .iter()
            .any(|event| matches!(event, WorldEvent::MapResized { .. }))
        {
            // A rebuild already reflects every other event in the batch.
            self.reset(world);
        } else {
            for event in &events {
                self.apply_event(world, event);
            }
        }
        self.garbage_collect();
        events.len()
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec2;
    use proxgrid_common::{MapSize, ObjectHandle};
    use proxgrid_kernel::ObjectData;

    use crate::config::GridConfig;
    use crate::grid::CellCoord;

    use super::*;

    fn setup() -> (ProximityIndex, World) {
        let world = World::new(MapSize::new(16, 16));
        let config = GridConfig {
            grid_size_tiles: 4,
            ..GridConfig::default()
        };
        let mut index = ProximityIndex::new(config).unwrap();
        index.reset(&world);
        (index, world)
    }

    fn sorted(mut cells: Vec<CellCoord>) -> Vec<CellCoord> {
        cells.sort();
        cells
    }

    fn assert_consistent(index: &ProximityIndex, world: &World) {
        for (id, data) in world.objects() {
            assert_eq!(
                sorted(index.cells_containing(id)),
                sorted(index.coverage_of(data)),
                "{id}"
            );
        }
    }

    #[test]
    fn tick_applies_spawns_moves_and_despawns() {
        let (mut index, mut world) = setup();
        let a = world.spawn(ObjectData::droid(IVec2::new(100, 100), 300));
        let b = world.spawn(ObjectData::feature(IVec2::new(1500, 1500)));
        world.step();
        assert_eq!(index.tick(&mut world), 3);
        assert_consistent(&index, &world);

        world.set_position(a, IVec2::new(1900, 300));
        world.despawn(b);
        index.tick(&mut world);
        assert_consistent(&index, &world);
        assert!(index.cells_containing(b).is_empty());
        assert!(world.events().is_empty());
    }

    #[test]
    fn move_then_despawn_in_one_tick_leaves_no_entries() {
        let (mut index, mut world) = setup();
        let a = world.spawn(ObjectData::droid(IVec2::new(100, 100), 300));
        world.set_position(a, IVec2::new(1000, 1000));
        world.set_position(a, IVec2::new(1900, 1900));
        world.despawn(a);
        index.tick(&mut world);

        let everywhere: Vec<ObjectHandle> = index.buckets().flat_map(|(_, iter)| iter).collect();
        assert!(everywhere.is_empty());
    }

    #[test]
    fn map_resize_in_batch_rebuilds_once() {
        let (mut index, mut world) = setup();
        world.spawn(ObjectData::feature(IVec2::new(100, 100)));
        world.resize_map(MapSize::new(32, 32));
        let late = world.spawn(ObjectData::feature(IVec2::new(3000, 3000)));
        index.tick(&mut world);

        assert_eq!(index.dims().width, 8);
        assert!(!index.cells_containing(late).is_empty());
        assert_consistent(&index, &world);
    }

    #[test]
    fn apply_event_ignores_steps() {
        let (mut index, world) = setup();
        let before = index.stats();
        index.apply_event(&world, &WorldEvent::Stepped { tick: 1, seed: 2 });
        assert_eq!(index.stats(), before);
    }
}
