//! Ring buffer tuning constants.

/// Default ring buffer capacity used by the driver when not overridden.
pub const DEFAULT_RING_CAPACITY: u64 = 1024;

/// Cache line size for alignment (64 bytes on most CPUs).
pub const CACHE_LINE_SIZE: usize = 64;

/// Number of spin iterations before a batch-dequeue publication wait logs a
/// trace event, so pathological stalls are visible without spamming on the
/// (expected) common case of a few spins.
pub const PUBLICATION_WAIT_SPIN_LOG_THRESHOLD: u32 = 10_000;
