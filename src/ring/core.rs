//! The bounded lock-free MPMC ring buffer.
//!
//! One atomic "cycle" value per slot tracks which lap of the buffer last
//! touched that slot, and producers/consumers compare their own cursor
//! against it to decide whether a slot is writable, readable, or still
//! owned by the other side.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::PUBLICATION_WAIT_SPIN_LOG_THRESHOLD;
use crate::error::{Result, RingError};
use crate::ring::padding::PaddedCursor;

/// A bounded, lock-free, multi-producer/multi-consumer ring buffer.
///
/// `T` must be `Copy + Default`: the payload array is plain memory, written
/// and read through raw volatile pointer access with no atomicity of its
/// own. Exclusive access to a slot's payload is guaranteed entirely by the
/// cycle protocol (see module docs), never by the type system — an
/// unsafe-but-verified invariant rather than one the borrow checker enforces.
pub struct RingBuffer<T: Copy + Default> {
    payload: Box<[T]>,
    cycle: Box<[AtomicU64]>,
    mask: u64,
    capacity: u64,
    head: PaddedCursor,
    tail: PaddedCursor,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Construct a new ring buffer. `capacity` must be a nonzero power of two.
    pub fn new(capacity: u64) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingError::invalid_capacity(capacity));
        }

        let payload = (0..capacity)
            .map(|_| T::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let cycle = (0..capacity)
            .map(AtomicU64::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(capacity, "constructed ring buffer");

        Ok(Self {
            payload,
            cycle,
            mask: capacity - 1,
            capacity,
            head: PaddedCursor::new(0),
            tail: PaddedCursor::new(0),
        })
    }

    /// Ring buffer capacity (fixed at construction).
    #[inline(always)]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Approximate number of records currently in the buffer.
    ///
    /// Racy under concurrent access (like any such count on a lock-free
    /// structure) — intended for observability, not for correctness
    /// decisions.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        let h = self.head.value.load(Ordering::Relaxed);
        let t = self.tail.value.load(Ordering::Relaxed);
        h.saturating_sub(t)
    }

    /// Whether the buffer was empty at the moment of the check.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    fn offset(&self, cursor: u64) -> usize {
        (cursor & self.mask) as usize
    }

    /// Write a slot's payload.
    ///
    /// # Safety
    /// Caller must hold exclusive ownership of `off` under the cycle
    /// protocol (i.e. have just won the head CAS claiming this slot).
    #[inline(always)]
    unsafe fn write_slot(&self, off: usize, value: T) {
        let slot_ptr = self.payload.as_ptr().add(off) as *mut T;
        std::ptr::write_volatile(slot_ptr, value);
    }

    /// Read a slot's payload.
    ///
    /// # Safety
    /// Caller must hold exclusive ownership of `off` under the cycle
    /// protocol (i.e. have just won the tail CAS claiming this slot, and the
    /// producer has published it).
    #[inline(always)]
    unsafe fn read_slot(&self, off: usize) -> T {
        let slot_ptr = self.payload.as_ptr().add(off);
        std::ptr::read_volatile(slot_ptr)
    }

    /// Enqueue a single record. Returns `false` iff the buffer is full.
    pub fn enqueue(&self, record: T) -> bool {
        let h = loop {
            let h = self.head.value.load(Ordering::Relaxed);
            let off = self.offset(h);
            let s = self.cycle[off].load(Ordering::Acquire);
            match signed_diff(s, h).cmp(&0) {
                CmpOrdering::Equal => {
                    if self
                        .head
                        .value
                        .compare_exchange_weak(h, h + 1, Ordering::AcqRel, Ordering::Relaxed)
                        .is_ok()
                    {
                        break h;
                    }
                }
                CmpOrdering::Less => {
                    tracing::trace!(cursor = h, "enqueue: ring buffer full");
                    return false;
                }
                CmpOrdering::Greater => std::hint::spin_loop(),
            }
        };

        let off = self.offset(h);
        unsafe {
            self.write_slot(off, record);
        }
        self.cycle[off].store(h + 1, Ordering::Release);
        true
    }

    /// Dequeue a single record. Returns `None` iff the buffer is empty.
    pub fn dequeue(&self) -> Option<T> {
        let t = loop {
            let t = self.tail.value.load(Ordering::Relaxed);
            let off = self.offset(t);
            let s = self.cycle[off].load(Ordering::Acquire);
            match signed_diff(s, t + 1).cmp(&0) {
                CmpOrdering::Equal => {
                    if self
                        .tail
                        .value
                        .compare_exchange_weak(t, t + 1, Ordering::AcqRel, Ordering::Relaxed)
                        .is_ok()
                    {
                        break t;
                    }
                }
                CmpOrdering::Less => {
                    tracing::trace!(cursor = t, "dequeue: ring buffer empty");
                    return None;
                }
                CmpOrdering::Greater => std::hint::spin_loop(),
            }
        };

        let off = self.offset(t);
        let record = unsafe { self.read_slot(off) };
        self.cycle[off].store(t + self.capacity, Ordering::Release);
        Some(record)
    }

    /// Enqueue a batch of records. Either all of `records` are written or
    /// none are — there is no partial-batch visibility.
    ///
    /// Returns `Ok(0)` if the buffer currently lacks room for the whole
    /// batch (the caller should retry/back off), `Ok(records.len())` on
    /// success, or `Err(RingError::BatchTooLarge)` if the batch exceeds the
    /// buffer's capacity.
    pub fn enqueue_batch(&self, records: &[T]) -> Result<u64> {
        let n = records.len();
        if n == 0 {
            return Ok(0);
        }
        if n as u64 > self.capacity {
            return Err(RingError::batch_too_large(n, self.capacity));
        }

        let h = loop {
            let h = self.head.value.load(Ordering::Relaxed);
            let off = self.offset(h);
            let s = self.cycle[off].load(Ordering::Acquire);
            match signed_diff(s, h).cmp(&0) {
                CmpOrdering::Less => {
                    tracing::trace!(cursor = h, batch = n, "enqueue_batch: ring buffer full");
                    return Ok(0);
                }
                CmpOrdering::Greater => {
                    std::hint::spin_loop();
                    continue;
                }
                CmpOrdering::Equal => {}
            }

            // Pre-check the tail slot of the intended range: cycle monotonicity
            // makes checking every interior slot redundant for n <= capacity.
            let tail_seq = h + n as u64 - 1;
            let tail_off = self.offset(tail_seq);
            let tail_s = self.cycle[tail_off].load(Ordering::Acquire);
            if signed_diff(tail_s, tail_seq) < 0 {
                tracing::trace!(cursor = h, batch = n, "enqueue_batch: range not free");
                return Ok(0);
            }

            if self
                .head
                .value
                .compare_exchange_weak(h, h + n as u64, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break h;
            }
        };

        for (i, record) in records.iter().enumerate() {
            let seq = h + i as u64;
            let off = self.offset(seq);
            unsafe {
                self.write_slot(off, *record);
            }
            self.cycle[off].store(seq + 1, Ordering::Release);
        }
        Ok(n as u64)
    }

    /// Dequeue a batch of records into `out`. Either `out.len()` records are
    /// delivered or none are.
    ///
    /// Returns `Ok(0)` if the buffer currently lacks `out.len()` published
    /// records, `Ok(out.len())` on success, or `Err(RingError::BatchTooLarge)`
    /// if `out.len()` exceeds the buffer's capacity.
    pub fn dequeue_batch(&self, out: &mut [T]) -> Result<u64> {
        let n = out.len();
        if n == 0 {
            return Ok(0);
        }
        if n as u64 > self.capacity {
            return Err(RingError::batch_too_large(n, self.capacity));
        }

        let t = loop {
            let t = self.tail.value.load(Ordering::Relaxed);
            let off = self.offset(t);
            let s = self.cycle[off].load(Ordering::Acquire);
            match signed_diff(s, t + 1).cmp(&0) {
                CmpOrdering::Less => {
                    tracing::trace!(cursor = t, batch = n, "dequeue_batch: ring buffer empty");
                    return Ok(0);
                }
                CmpOrdering::Greater => {
                    std::hint::spin_loop();
                    continue;
                }
                CmpOrdering::Equal => {}
            }

            let tail_seq = t + n as u64 - 1;
            let tail_off = self.offset(tail_seq);
            let tail_s = self.cycle[tail_off].load(Ordering::Acquire);
            if signed_diff(tail_s, tail_seq + 1) < 0 {
                tracing::trace!(cursor = t, batch = n, "dequeue_batch: range not published");
                return Ok(0);
            }

            if self
                .tail
                .value
                .compare_exchange_weak(t, t + n as u64, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break t;
            }
        };

        for (i, slot) in out.iter_mut().enumerate() {
            let seq = t + i as u64;
            let off = self.offset(seq);

            // Reservation of the tail range only means producers have
            // *claimed* these slots; an individual producer's publish may
            // still be in flight. Bounded wait for that one producer.
            let mut spins: u32 = 0;
            while self.cycle[off].load(Ordering::Acquire) != seq + 1 {
                std::hint::spin_loop();
                spins = spins.wrapping_add(1);
                if spins == PUBLICATION_WAIT_SPIN_LOG_THRESHOLD {
                    tracing::trace!(seq, "dequeue_batch: long wait on producer publication");
                }
            }

            *slot = unsafe { self.read_slot(off) };
            self.cycle[off].store(seq + self.capacity, Ordering::Release);
        }
        Ok(n as u64)
    }
}

/// Signed lap comparison: `cycle[off] - expected`, cast to i64 so wrap
/// distance is meaningful. Never compare the raw `u64` values directly.
#[inline(always)]
fn signed_diff(cycle_value: u64, expected: u64) -> i64 {
    (cycle_value as i64).wrapping_sub(expected as i64)
}

// SAFETY: payload access is partitioned in time by the cycle protocol, so a
// `RingBuffer<T>` can be shared across threads as long as T itself can move
// between threads.
unsafe impl<T: Copy + Default + Send> Send for RingBuffer<T> {}
unsafe impl<T: Copy + Default + Send> Sync for RingBuffer<T> {}
