//! Error types for the ring buffer.

use thiserror::Error;

/// Result type alias for ring buffer operations.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors raised at the ring buffer's API boundary.
///
/// Steady-state backpressure (`Full`/`Empty`) is deliberately *not* part of
/// this enum — it is encoded as `false`/`0`/`None` return values, since it is
/// normal flow control rather than a failure.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RingError {
    /// Capacity passed to `RingBuffer::new` was zero or not a power of two.
    #[error("invalid ring buffer capacity: {requested} is not a nonzero power of two")]
    InvalidCapacity {
        /// The capacity the caller asked for.
        requested: u64,
    },

    /// A batch operation was asked to move more records than the ring holds.
    #[error("batch of {requested} records exceeds ring buffer capacity {capacity}")]
    BatchTooLarge {
        /// The batch length the caller asked for.
        requested: usize,
        /// The ring buffer's capacity.
        capacity: u64,
    },
}

impl RingError {
    /// Construct an [`RingError::InvalidCapacity`].
    pub fn invalid_capacity(requested: u64) -> Self {
        Self::InvalidCapacity { requested }
    }

    /// Construct a [`RingError::BatchTooLarge`].
    pub fn batch_too_large(requested: usize, capacity: u64) -> Self {
        Self::BatchTooLarge {
            requested,
            capacity,
        }
    }
}
