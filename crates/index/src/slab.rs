//! Fixed-record slab heap.
//!
//! Records live in one growable arena and are addressed by [`ChunkId`]
//! rather than by pointer. Freed records go on a free list and are handed
//! out again before the arena grows, so steady-state churn never touches
//! the allocator. The arena never shrinks until [`SlabHeap::destroy`].

use crate::error::SlabError;

/// Index of a record in a [`SlabHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(u32);

impl ChunkId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Occupancy figures for a slab heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub capacity: usize,
    pub in_use: usize,
    pub extensions: usize,
}

#[derive(Debug)]
pub struct SlabHeap<T> {
    records: Vec<T>,
    free: Vec<ChunkId>,
    extension: usize,
    max_records: Option<usize>,
    in_use: usize,
    extensions: usize,
}

impl<T: Default> SlabHeap<T> {
    /// Create a heap with `initial` records reserved up front. When the heap
    /// runs dry it grows by `extension` records, never past `max_records`.
    pub fn new(
        initial: usize,
        extension: usize,
        max_records: Option<usize>,
    ) -> Result<Self, SlabError> {
        let mut heap = Self {
            records: Vec::new(),
            free: Vec::new(),
            extension: extension.max(1),
            max_records,
            in_use: 0,
            extensions: 0,
        };
        heap.grow(initial)?;
        Ok(heap)
    }

    /// Hand out a cleared record, growing the arena if the free list is empty.
    pub fn alloc(&mut self) -> Result<ChunkId, SlabError> {
        if self.free.is_empty() {
            let mut additional = self.extension;
            if let Some(max) = self.max_records {
                additional = additional.min(max.saturating_sub(self.records.len()));
                if additional == 0 {
                    return Err(SlabError::Exhausted {
                        capacity: self.records.len(),
                    });
                }
            }
            self.grow(additional)?;
            self.extensions += 1;
            tracing::debug!(
                capacity = self.records.len(),
                additional,
                "slab heap extended"
            );
        }
        let Some(id) = self.free.pop() else {
            return Err(SlabError::Exhausted {
                capacity: self.records.len(),
            });
        };
        self.records[id.index()] = T::default();
        self.in_use += 1;
        Ok(id)
    }

    /// Return a record to the free list.
    pub fn free(&mut self, id: ChunkId) {
        debug_assert!(id.index() < self.records.len(), "free of unknown record");
        debug_assert!(!self.free.contains(&id), "double free of {id:?}");
        self.free.push(id);
        self.in_use -= 1;
    }

    /// Release every record and the arena itself.
    pub fn destroy(&mut self) {
        self.records = Vec::new();
        self.free = Vec::new();
        self.in_use = 0;
    }

    fn grow(&mut self, additional: usize) -> Result<(), SlabError> {
        let reserve_err = |_| SlabError::Reserve {
            requested: additional,
        };
        self.records
            .try_reserve_exact(additional)
            .map_err(reserve_err)?;
        self.free.try_reserve(additional).map_err(reserve_err)?;

        let start = self.records.len();
        self.records.resize_with(start + additional, T::default);
        // Reverse order so the lowest ids are handed out first.
        self.free
            .extend((start..start + additional).rev().map(|i| ChunkId(i as u32)));
        Ok(())
    }
}

impl<T> SlabHeap<T> {
    /// Borrow a record. Ids come only from this heap, so a bad id is a bug.
    #[inline]
    pub fn get(&self, id: ChunkId) -> &T {
        &self.records[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ChunkId) -> &mut T {
        &mut self.records[id.index()]
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            capacity: self.records.len(),
            in_use: self.in_use,
            extensions: self.extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preallocates_initial_records() {
        let heap: SlabHeap<u64> = SlabHeap::new(4, 2, None).unwrap();
        assert_eq!(
            heap.stats(),
            HeapStats {
                capacity: 4,
                in_use: 0,
                extensions: 0
            }
        );
    }

    #[test]
    fn alloc_reuses_freed_records() {
        let mut heap: SlabHeap<u64> = SlabHeap::new(2, 2, None).unwrap();
        let a = heap.alloc().unwrap();
        *heap.get_mut(a) = 99;
        heap.free(a);

        let b = heap.alloc().unwrap();
        assert_eq!(a, b);
        assert_eq!(*heap.get(b), 0, "reused record is cleared");
        assert_eq!(heap.stats().capacity, 2);
    }

    #[test]
    fn grows_by_extension_when_dry() {
        let mut heap: SlabHeap<u64> = SlabHeap::new(1, 3, None).unwrap();
        let ids: Vec<ChunkId> = (0..4).map(|_| heap.alloc().unwrap()).collect();
        assert_eq!(ids.len(), 4);
        let stats = heap.stats();
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.in_use, 4);
        assert_eq!(stats.extensions, 1);
    }

    #[test]
    fn bounded_growth_reports_exhaustion() {
        let mut heap: SlabHeap<u64> = SlabHeap::new(1, 4, Some(3)).unwrap();
        for _ in 0..3 {
            heap.alloc().unwrap();
        }
        assert_eq!(heap.stats().capacity, 3);
        assert_eq!(heap.alloc(), Err(SlabError::Exhausted { capacity: 3 }));

        // Exhaustion is recoverable once something is freed.
        heap.free(ChunkId(1));
        assert!(heap.alloc().is_ok());
    }

    #[test]
    fn destroy_releases_everything() {
        let mut heap: SlabHeap<u64> = SlabHeap::new(8, 8, None).unwrap();
        heap.alloc().unwrap();
        heap.destroy();
        assert_eq!(heap.stats().capacity, 0);
        assert_eq!(heap.stats().in_use, 0);
    }
}
