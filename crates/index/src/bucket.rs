//! Per-cell buckets: singly linked lists of fixed-capacity chunks.

use proxgrid_common::ObjectHandle;

use crate::error::SlabError;
use crate::slab::{ChunkId, SlabHeap};

/// Object slots per chunk.
pub const CHUNK_CAPACITY: usize = 8;

/// Fixed-capacity run of object slots plus the link to the next chunk.
///
/// A `None` slot is empty. Occupied slots are not packed between a removal
/// and the next compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub slots: [Option<ObjectHandle>; CHUNK_CAPACITY],
    pub next: Option<ChunkId>,
}

/// Head of the chunk list for one grid cell.
///
/// The bucket does not own its chunks' memory: every operation takes the
/// slab heap the chunks were allocated from.
#[derive(Debug, Default)]
pub struct CellBucket {
    head: Option<ChunkId>,
}

impl CellBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle in the first empty slot, appending a chunk at the tail
    /// only when every existing chunk is full.
    pub fn add(
        &mut self,
        heap: &mut SlabHeap<Chunk>,
        handle: ObjectHandle,
    ) -> Result<(), SlabError> {
        let mut tail = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let chunk = heap.get_mut(id);
            if let Some(slot) = chunk.slots.iter_mut().find(|slot| slot.is_none()) {
                *slot = Some(handle);
                return Ok(());
            }
            tail = Some(id);
            cursor = chunk.next;
        }

        let id = heap.alloc()?;
        heap.get_mut(id).slots[0] = Some(handle);
        match tail {
            Some(tail) => heap.get_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        Ok(())
    }

    /// Null the first slot holding `handle`. The list never shrinks here.
    pub fn remove(&mut self, heap: &mut SlabHeap<Chunk>, handle: ObjectHandle) -> bool {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let chunk = heap.get_mut(id);
            if let Some(slot) = chunk.slots.iter_mut().find(|slot| **slot == Some(handle)) {
                *slot = None;
                return true;
            }
            cursor = chunk.next;
        }
        false
    }

    /// Pack every handle into the front of the list and free the chunks left
    /// empty behind it. Returns the number of chunks freed.
    ///
    /// Handles are moved forward in list order, so the multiset of handles
    /// is unchanged and the chunk count never grows.
    pub fn compact(&mut self, heap: &mut SlabHeap<Chunk>) -> usize {
        let Some(head) = self.head else {
            return 0;
        };

        // The write cursor never passes the read cursor, so every slot it
        // lands on has already been read.
        let (mut write_chunk, mut write_slot) = (head, 0);
        let mut kept = 0;
        let mut read = Some(head);
        'scan: while let Some(read_chunk) = read {
            for slot in 0..CHUNK_CAPACITY {
                let Some(handle) = heap.get(read_chunk).slots[slot] else {
                    continue;
                };
                if write_slot == CHUNK_CAPACITY {
                    match heap.get(write_chunk).next {
                        Some(next) => (write_chunk, write_slot) = (next, 0),
                        None => {
                            debug_assert!(false, "compaction write cursor overran the list");
                            break 'scan;
                        }
                    }
                }
                heap.get_mut(write_chunk).slots[write_slot] = Some(handle);
                write_slot += 1;
                kept += 1;
            }
            read = heap.get(read_chunk).next;
        }

        if kept == 0 {
            return self.clear(heap);
        }

        let tail = heap.get_mut(write_chunk);
        tail.slots[write_slot..].fill(None);
        let rest = tail.next.take();
        free_list(heap, rest)
    }

    /// Free every chunk, leaving the bucket empty. Returns the number freed.
    pub fn clear(&mut self, heap: &mut SlabHeap<Chunk>) -> usize {
        free_list(heap, self.head.take())
    }

    /// Walk the occupied slots.
    pub fn iter<'a>(&self, heap: &'a SlabHeap<Chunk>) -> BucketIter<'a> {
        BucketIter {
            heap,
            chunk: self.head,
            slot: 0,
        }
    }

    pub fn contains(&self, heap: &SlabHeap<Chunk>, handle: ObjectHandle) -> bool {
        self.iter(heap).any(|h| h == handle)
    }

    /// Number of occupied slots.
    pub fn occupied(&self, heap: &SlabHeap<Chunk>) -> usize {
        self.iter(heap).count()
    }

    /// Number of chunks in the list.
    pub fn chunk_count(&self, heap: &SlabHeap<Chunk>) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            count += 1;
            cursor = heap.get(id).next;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

fn free_list(heap: &mut SlabHeap<Chunk>, mut cursor: Option<ChunkId>) -> usize {
    let mut freed = 0;
    while let Some(id) = cursor {
        cursor = heap.get_mut(id).next.take();
        heap.free(id);
        freed += 1;
    }
    freed
}

/// Iterator over the occupied slots of one bucket. Empty slots and chunk
/// boundaries are skipped.
#[derive(Debug, Clone)]
pub struct BucketIter<'a> {
    heap: &'a SlabHeap<Chunk>,
    chunk: Option<ChunkId>,
    slot: usize,
}

impl<'a> BucketIter<'a> {
    /// An iterator that yields nothing.
    pub fn empty(heap: &'a SlabHeap<Chunk>) -> Self {
        Self {
            heap,
            chunk: None,
            slot: 0,
        }
    }
}

impl Iterator for BucketIter<'_> {
    type Item = ObjectHandle;

    fn next(&mut self) -> Option<ObjectHandle> {
        while let Some(id) = self.chunk {
            let chunk = self.heap.get(id);
            while self.slot < CHUNK_CAPACITY {
                let entry = chunk.slots[self.slot];
                self.slot += 1;
                if entry.is_some() {
                    return entry;
                }
            }
            self.chunk = chunk.next;
            self.slot = 0;
        }
        None
    }
}
