//! Lock-free ring buffer implementation.

mod core;
mod padding;

pub use core::RingBuffer;
