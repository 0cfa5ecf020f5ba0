use glam::IVec2;
use proxgrid_common::{MapSize, ObjectHandle};
use serde::{Deserialize, Serialize};

use crate::object::ObjectData;

/// An event record produced by every object lifecycle mutation.
///
/// The tick driver feeds these to the proximity index. Each event carries
/// enough data to update the index without looking the object up again,
/// which matters for `Despawned`: by then the slot is already gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Object was spawned with the given data.
    Spawned { id: ObjectHandle, data: ObjectData },
    /// Object was despawned. Carries its last data.
    Despawned { id: ObjectHandle, data: ObjectData },
    /// Object position changed. Carries the data after the move.
    Moved {
        id: ObjectHandle,
        old: IVec2,
        data: ObjectData,
    },
    /// Map dimensions changed; every derived spatial structure is invalid.
    MapResized { size: MapSize },
    /// Simulation advanced one tick with the given seed.
    Stepped { tick: u64, seed: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    data: Option<ObjectData>,
}

/// The authoritative object state.
///
/// Objects live in a slot table addressed by [`ObjectHandle`]. Despawned
/// slots are recycled with a bumped generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    map: MapSize,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    live: usize,
    tick: u64,
    /// Seed for deterministic RNG. Advanced each step.
    seed: u64,
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world over the given map at tick 0 with seed 0.
    pub fn new(map: MapSize) -> Self {
        Self {
            map,
            ..Default::default()
        }
    }

    /// Create a world with a specific seed.
    pub fn with_seed(map: MapSize, seed: u64) -> Self {
        Self {
            map,
            seed,
            ..Default::default()
        }
    }

    pub fn map_size(&self) -> MapSize {
        self.map
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.live
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Iterate all live objects in slot order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &ObjectData)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.data
                .as_ref()
                .map(|data| (ObjectHandle::new(index as u32, slot.generation), data))
        })
    }

    /// Spawn a new object. Returns its handle.
    pub fn spawn(&mut self, data: ObjectData) -> ObjectHandle {
        let id = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                ObjectHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                ObjectHandle::new(index, 0)
            }
        };
        self.live += 1;
        self.event_log.push(WorldEvent::Spawned { id, data });
        id
    }

    /// Remove an object. Returns its data if the handle was live.
    pub fn despawn(&mut self, id: ObjectHandle) -> Option<ObjectData> {
        let slot = self.live_slot_mut(id)?;
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        self.live -= 1;
        self.event_log.push(WorldEvent::Despawned { id, data });
        Some(data)
    }

    /// Resolve a handle. Stale handles resolve to `None`.
    pub fn get(&self, id: ObjectHandle) -> Option<&ObjectData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    /// Whether the handle refers to a live object.
    pub fn contains(&self, id: ObjectHandle) -> bool {
        self.get(id).is_some()
    }

    /// Move an object and log the change. Returns the old position.
    pub fn set_position(&mut self, id: ObjectHandle, new: IVec2) -> Option<IVec2> {
        let data = self.live_slot_mut(id)?.data.as_mut()?;
        let old = data.position;
        data.position = new;
        let data = *data;
        self.event_log.push(WorldEvent::Moved { id, old, data });
        Some(old)
    }

    /// Change the map dimensions.
    pub fn resize_map(&mut self, size: MapSize) {
        tracing::debug!(width = size.width, height = size.height, "map resized");
        self.map = size;
        self.event_log.push(WorldEvent::MapResized { size });
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        self.seed = splitmix64(self.seed);
        self.event_log.push(WorldEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
    }

    fn live_slot_mut(&mut self, id: ObjectHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.data.is_some())
    }
}

/// Splitmix64 step function. Used to advance the world seed each tick and to
/// drive seeded workloads reproducibly.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(MapSize::new(32, 32))
    }

    #[test]
    fn world_starts_empty() {
        let w = world();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.object_count(), 0);
        assert_eq!(w.map_size(), MapSize::new(32, 32));
    }

    #[test]
    fn spawn_and_despawn() {
        let mut w = world();
        let id = w.spawn(ObjectData::feature(IVec2::new(10, 10)));
        assert_eq!(w.object_count(), 1);
        assert!(w.get(id).is_some());

        let data = w.despawn(id);
        assert!(data.is_some());
        assert_eq!(w.object_count(), 0);
        assert!(w.get(id).is_none());
        assert!(w.despawn(id).is_none());
    }

    #[test]
    fn recycled_slot_invalidates_old_handle() {
        let mut w = world();
        let old = w.spawn(ObjectData::feature(IVec2::ZERO));
        w.despawn(old);
        let new = w.spawn(ObjectData::feature(IVec2::new(500, 500)));

        assert_eq!(old.index, new.index);
        assert_ne!(old.generation, new.generation);
        assert!(w.get(old).is_none());
        assert_eq!(w.get(new).unwrap().position, IVec2::new(500, 500));
        assert!(w.set_position(old, IVec2::ZERO).is_none());
    }

    #[test]
    fn set_position_logs_event() {
        let mut w = world();
        let id = w.spawn(ObjectData::droid(IVec2::ZERO, 256));
        let old = w.set_position(id, IVec2::new(1, 2));
        assert_eq!(old, Some(IVec2::ZERO));
        assert_eq!(w.get(id).unwrap().position, IVec2::new(1, 2));
        assert_eq!(
            w.events().last(),
            Some(&WorldEvent::Moved {
                id,
                old: IVec2::ZERO,
                data: ObjectData::droid(IVec2::new(1, 2), 256)
            })
        );
    }

    #[test]
    fn despawn_event_carries_last_data() {
        let mut w = world();
        let data = ObjectData::structure(IVec2::new(300, 300), None);
        let id = w.spawn(data);
        w.drain_events();
        w.despawn(id);
        assert_eq!(w.drain_events(), vec![WorldEvent::Despawned { id, data }]);
    }

    #[test]
    fn objects_skips_free_slots() {
        let mut w = world();
        let a = w.spawn(ObjectData::feature(IVec2::ZERO));
        let b = w.spawn(ObjectData::feature(IVec2::ZERO));
        let c = w.spawn(ObjectData::feature(IVec2::ZERO));
        w.despawn(b);

        let ids: Vec<ObjectHandle> = w.objects().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn step_advances_tick_and_seed_deterministically() {
        let mut w1 = World::with_seed(MapSize::default(), 42);
        let mut w2 = World::with_seed(MapSize::default(), 42);
        for _ in 0..100 {
            w1.step();
            w2.step();
        }
        assert_eq!(w1.tick(), 100);
        assert_eq!(w1.seed(), w2.seed());

        let mut w3 = World::with_seed(MapSize::default(), 43);
        w3.step();
        let mut w4 = World::with_seed(MapSize::default(), 42);
        w4.step();
        assert_ne!(w3.seed(), w4.seed());
    }

    #[test]
    fn resize_map_logs_event() {
        let mut w = world();
        w.resize_map(MapSize::new(8, 4));
        assert_eq!(w.map_size(), MapSize::new(8, 4));
        assert_eq!(
            w.drain_events(),
            vec![WorldEvent::MapResized {
                size: MapSize::new(8, 4)
            }]
        );
        assert!(w.events().is_empty());
    }
}
