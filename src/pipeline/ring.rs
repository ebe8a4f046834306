//! Ring storage for the delivery pipeline.
//!
//! Slots are addressed by monotonic u64 cursors; the physical slot of cursor
//! `c` is `c & (capacity - 1)`. Producers reserve a cursor with a CAS on
//! `write_cursor`, then copy the record into its slot under that slot's shard
//! mutex. The single consumer drains `[read_cursor, write_cursor)` in order
//! and publishes progress with one Release store of `read_cursor` per batch.
//!
//! Geometry (capacity, mask, slot storage) is guarded by an RwLock: admission
//! and drain hold the read side, resize holds the write side. Lock order is
//! geometry lock first, then a shard mutex, never the reverse.

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hard ceiling on ring capacity, in slots.
pub(crate) const MAX_CAPACITY: u64 = 1 << 20;

const MIN_SHARDS: usize = 4;
const MAX_SHARDS: usize = 32;

/// Round a requested capacity to the next power of two, clamped to
/// [`MAX_CAPACITY`]. Zero becomes one.
pub(crate) fn round_up_capacity(requested: u64) -> u64 {
    requested.min(MAX_CAPACITY).next_power_of_two()
}

/// Shard count for this host: available parallelism clamped to `[4, 32]`.
pub(crate) fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(MIN_SHARDS)
        .clamp(MIN_SHARDS, MAX_SHARDS)
}

/// Outcome of one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    /// Stored; carries the utilization percentage after this admission.
    Stored {
        /// Percentage of slots in flight, 0-100.
        utilization: u64,
    },
    /// No free slot under the current geometry.
    Full,
}

struct Shard {
    slots: Mutex<Box<[Option<Bytes>]>>,
}

impl Shard {
    fn with_len(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; len].into_boxed_slice()),
        }
    }
}

struct Geometry {
    shards: Vec<Shard>,
    capacity: u64,
    mask: u64,
}

impl Geometry {
    fn new(capacity: u64, shard_count: usize) -> Self {
        let per_shard = slots_per_shard(capacity, shard_count);
        let shards = (0..shard_count).map(|_| Shard::with_len(per_shard)).collect();
        Self {
            shards,
            capacity,
            mask: capacity - 1,
        }
    }

    /// Map a cursor to (shard index, offset within the shard). Distinct
    /// physical slots always land on distinct cells, for any shard count.
    fn cell(&self, cursor: u64) -> (usize, usize) {
        let slot = (cursor & self.mask) as usize;
        let shard_count = self.shards.len();
        (slot % shard_count, slot / shard_count)
    }
}

fn slots_per_shard(capacity: u64, shard_count: usize) -> usize {
    (capacity as usize).div_ceil(shard_count)
}

/// Concurrent MPSC ring of rendered records.
pub(crate) struct Ring {
    geometry: RwLock<Geometry>,
    write_cursor: AtomicU64,
    read_cursor: AtomicU64,
    utilization: AtomicU64,
}

impl Ring {
    pub(crate) fn new(requested_capacity: u64, shard_count: usize) -> Self {
        let capacity = round_up_capacity(requested_capacity);
        let shard_count = shard_count.clamp(MIN_SHARDS, MAX_SHARDS);
        Self {
            geometry: RwLock::new(Geometry::new(capacity, shard_count)),
            write_cursor: AtomicU64::new(0),
            read_cursor: AtomicU64::new(0),
            utilization: AtomicU64::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.geometry.read().capacity
    }

    /// Records admitted but not yet drained.
    pub(crate) fn pending(&self) -> u64 {
        // read before write so a concurrent drain cannot make this underflow
        let read = self.read_cursor.load(Ordering::Acquire);
        let write = self.write_cursor.load(Ordering::Acquire);
        write - read
    }

    /// Utilization percentage recorded by the most recent admission. Stale
    /// after drains until the next admission refreshes it.
    pub(crate) fn utilization(&self) -> u64 {
        self.utilization.load(Ordering::Relaxed)
    }

    /// Try to admit one record without blocking.
    pub(crate) fn try_push(&self, record: &[u8]) -> PushOutcome {
        let geometry = self.geometry.read();
        loop {
            let write = self.write_cursor.load(Ordering::Acquire);
            let read = self.read_cursor.load(Ordering::Acquire);
            let next = write + 1;
            // write is loaded first (the CAS needs it), so a drain racing
            // these loads can move read past next; saturate rather than
            // wrap, and let the CAS fail on the moved write cursor
            let in_flight = next.saturating_sub(read);
            if in_flight > geometry.capacity {
                return PushOutcome::Full;
            }
            if self
                .write_cursor
                .compare_exchange_weak(write, next, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }

            let (shard, offset) = geometry.cell(write);
            {
                let mut slots = geometry.shards[shard].slots.lock();
                slots[offset] = Some(Bytes::copy_from_slice(record));
            }

            let utilization = in_flight * 100 / geometry.capacity;
            self.utilization.store(utilization, Ordering::Relaxed);
            return PushOutcome::Stored { utilization };
        }
    }

    /// Drain up to `limit` records (all pending when `None`) in cursor order.
    ///
    /// `deliver` returns `false` to end the batch early; the current record
    /// stays in its slot and is redelivered next time. A reserved slot whose
    /// producer has not finished copying also ends the batch. The read cursor
    /// advances once, past the delivered prefix only. Returns the number of
    /// records delivered.
    pub(crate) fn drain<F>(&self, limit: Option<u64>, mut deliver: F) -> u64
    where
        F: FnMut(&Bytes) -> bool,
    {
        let geometry = self.geometry.read();
        let read = self.read_cursor.load(Ordering::Acquire);
        let write = self.write_cursor.load(Ordering::Acquire);
        if read == write {
            return 0;
        }
        let end = match limit {
            Some(limit) => write.min(read + limit),
            None => write,
        };

        let mut cursor = read;
        while cursor < end {
            let (shard, offset) = geometry.cell(cursor);
            let mut slots = geometry.shards[shard].slots.lock();
            let delivered = match slots[offset].as_ref() {
                Some(record) => deliver(record),
                // reserved but not yet copied; the producer is mid-flight
                None => false,
            };
            if !delivered {
                break;
            }
            slots[offset] = None;
            cursor += 1;
        }

        if cursor > read {
            self.read_cursor.store(cursor, Ordering::Release);
        }
        cursor - read
    }

    /// Double the capacity if utilization still exceeds `threshold` percent
    /// under the exclusive geometry lock. In-flight records keep their
    /// cursors; only their physical cells move. Returns the new capacity when
    /// a resize happened.
    pub(crate) fn maybe_resize(&self, threshold: u64) -> Option<u64> {
        // cheap pre-check before contending on the exclusive lock
        if self.utilization.load(Ordering::Relaxed) <= threshold {
            return None;
        }

        let mut geometry = self.geometry.write();
        let write = self.write_cursor.load(Ordering::Acquire);
        let read = self.read_cursor.load(Ordering::Acquire);
        let in_flight = write - read;
        if in_flight * 100 / geometry.capacity <= threshold {
            return None;
        }
        let new_capacity = geometry.capacity * 2;
        if new_capacity > MAX_CAPACITY {
            return None;
        }

        let shard_count = geometry.shards.len();
        let per_shard = slots_per_shard(new_capacity, shard_count);
        let new_mask = new_capacity - 1;
        let mut rebuilt: Vec<Vec<Option<Bytes>>> = vec![vec![None; per_shard]; shard_count];
        for cursor in read..write {
            let (shard, offset) = geometry.cell(cursor);
            // the exclusive geometry lock means no shard mutex is contended
            let record = geometry.shards[shard].slots.get_mut()[offset].take();
            let slot = (cursor & new_mask) as usize;
            rebuilt[slot % shard_count][slot / shard_count] = record;
        }

        geometry.shards = rebuilt
            .into_iter()
            .map(|slots| Shard {
                slots: Mutex::new(slots.into_boxed_slice()),
            })
            .collect();
        geometry.capacity = new_capacity;
        geometry.mask = new_mask;
        Some(new_capacity)
    }
}
